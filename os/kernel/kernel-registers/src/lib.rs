//! # Typed `X86_64` Registers
//!
//! Bitfield models of the control registers and MSRs the kernel touches during
//! bring-up, plus the I/O port seam used by the legacy device drivers.
//!
//! | Module | Register |
//! |--------|----------|
//! | [`cr2`] | Page-fault linear address |
//! | [`cr3`] | PML4 base |
//! | [`cr8`] | Task priority |
//! | [`msr`] | `IA32_APIC_BASE` |
//! | [`ports`] | Port-mapped I/O (`in`/`out`) |
//!
//! Anything executing an instruction is gated behind the `asm` feature so the
//! pure encodings stay usable (and testable) on the host.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

#[cfg(feature = "cr2")]
pub mod cr2;

#[cfg(feature = "cr3")]
pub mod cr3;

#[cfg(feature = "cr8")]
pub mod cr8;

#[cfg(feature = "msr")]
pub mod msr;

#[cfg(feature = "ports")]
pub mod ports;

pub trait LoadRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// For example, the register access might be privileged and require kernel mode (Ring 0).
    unsafe fn load_unsafe() -> Self;
}

pub trait StoreRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// For example, the register access might be privileged and require kernel mode (Ring 0).
    unsafe fn store_unsafe(self);
}
