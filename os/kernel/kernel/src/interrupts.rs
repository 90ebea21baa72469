//! # Interrupt and Exception Handlers
//!
//! Every vector gets a naked entry stub that does just enough to call into
//! Rust under the System V ABI.
//!
//! | Vector | Module        | Gate      | Outcome                          |
//! |-------:|---------------|-----------|----------------------------------|
//! | 8      | [`df`]         | trap      | report, halt                     |
//! | 13     | [`gp`]         | trap      | report + backtrace, halt         |
//! | 14     | [`page_fault`] | trap      | report CR2 + error code, halt    |
//! | 32     | [`timer`]      | interrupt | count tick, LAPIC EOI            |
//! | 33     | [`keyboard`]   | interrupt | scancode into ring, PIC EOI      |
//! | 44     | [`mouse`]      | interrupt | feed packet assembler, PIC EOI   |
//! | 0xFF   | [`spurious`]   | interrupt | `iretq`, no EOI                  |
//!
//! Trap gates leave `IF` untouched, so the fault stubs start with `cli`.
//! The fault bodies build a [`Fault`](kernel_interrupts::fault::Fault) and
//! end in [`report_and_halt`](kernel_interrupts::fault::report_and_halt).
//! Fault handlers never return; the IRQ handlers must finish quickly and
//! must not touch the allocator or the page tables.

pub mod df;
pub mod gp;
#[cfg(feature = "ps2-mouse")]
pub mod mouse;
pub mod keyboard;
pub mod page_fault;
pub mod spurious;
pub mod timer;

use kernel_interrupts::fault::Halt;

/// Parks the CPU with interrupts disabled.
pub struct CpuHalt;

impl Halt for CpuHalt {
    fn halt(&self) -> ! {
        crate::halt_forever()
    }
}

/// Naked IRQ entry: saves the caller-saved registers, aligns the stack,
/// calls `$rust` and returns with `iretq`.
///
/// `rbx` is callee-saved, so it survives the call and carries the
/// pre-alignment stack pointer.
macro_rules! irq_entry {
    ($(#[$meta:meta])* $name:ident => $rust:path) => {
        $(#[$meta])*
        #[unsafe(naked)]
        pub extern "C" fn $name() {
            core::arch::naked_asm!(
                "push rax", "push rcx", "push rdx", "push rsi", "push rdi",
                "push r8", "push r9", "push r10", "push r11", "push rbx",
                "mov rbx, rsp",
                "and rsp, -16",
                "cld",
                "call {rust}",
                "mov rsp, rbx",
                "pop rbx", "pop r11", "pop r10", "pop r9", "pop r8",
                "pop rdi", "pop rsi", "pop rdx", "pop rcx", "pop rax",
                "iretq",
                rust = sym $rust,
            )
        }
    };
}

pub(crate) use irq_entry;
