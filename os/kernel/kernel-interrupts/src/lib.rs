//! # Interrupt and Exception Plumbing
//!
//! Everything the CPU consults when an interrupt arrives, plus the legacy
//! devices that raise them.
//!
//! ## Overview
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`gdt`] | Six-entry GDT (ring-0 code/data, unused ring-3 entries) and `lgdt` |
//! | [`selectors`] | Segment selector encoding |
//! | [`idt`] | 256 sixteen-byte gates, offset split/join, `lidt` |
//! | [`vectors`] | Fixed vector assignments |
//! | [`pic`] | Chained 8259 PICs: remap, masks, EOI |
//! | [`page_fault`] | `#PF` error code decoding |
//! | [`fault`] | Fatal exception reports and the [`Halt`](fault::Halt) seam |
//! | [`stack_walk`] | Frame-pointer chain walk for fault reports |
//! | [`ps2`] | PS/2 mouse packet assembly and controller init |
//!
//! ## Bring-up order
//!
//! ```text
//! GDT (lgdt, reload segments) → IDT (lidt) → PIC (legacy) or PIC off + LAPIC → sti
//! ```
//!
//! Interrupts stay disabled until the very end of bring-up.
//!
//! ## Delivery modes
//!
//! [`InterruptMode`] is chosen once at boot. In legacy mode the PICs are
//! remapped to `0x20..0x30` and everything except the keyboard (and mouse)
//! is masked. In APIC mode the PICs are remapped and fully masked and the
//! Local APIC delivers the timer and spurious vectors.
//!
//! Instructions (`lgdt`, `lidt`, segment reloads, `rbp` reads) are gated behind
//! the `asm` feature; encodings and device protocols are host-testable.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod fault;
pub mod gdt;
pub mod idt;
pub mod page_fault;
pub mod pic;
pub mod ps2;
pub mod selectors;
pub mod stack_walk;
pub mod vectors;

/// How external interrupts reach the CPU.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum InterruptMode {
    /// Chained 8259 PICs at vectors `0x20..0x30`.
    LegacyPic,
    /// Local APIC; the 8259s are masked.
    Apic,
}

/// Operand of `lgdt`/`lidt`.
#[derive(Debug, Copy, Clone)]
#[repr(C, packed)]
pub struct DescriptorTablePointer {
    /// Size of the table in bytes, minus one.
    pub limit: u16,
    /// Linear address of the table.
    pub base: u64,
}

const _: () = assert!(size_of::<DescriptorTablePointer>() == 10);
