use crate::interrupts::irq_entry;
use kernel_interrupts::pic::ChainedPics;
use kernel_interrupts::ps2::DATA_PORT;
use kernel_registers::ports::{CpuPorts, PortIo};
use kernel_sync::{Drained, IsrRing};

/// Scancodes buffered between two main-loop iterations.
pub const SCANCODE_RING_SIZE: usize = 64;

static SCANCODES: IsrRing<SCANCODE_RING_SIZE> = IsrRing::new();

irq_entry!(
    /// IRQ1 entry.
    keyboard_handler => keyboard_rust
);

extern "C" fn keyboard_rust() {
    // SAFETY: CPL0; only this handler reads the keyboard data port.
    let mut ports = unsafe { CpuPorts::new() };
    let scancode = ports.inb(DATA_PORT);
    // A full ring drops the scancode and flags the overflow.
    let _ = SCANCODES.push(scancode);
    ChainedPics::new(ports).end_of_interrupt_master();
}

/// Moves buffered scancodes into `out`.
pub fn drain(out: &mut [u8]) -> Drained {
    SCANCODES.drain_into(out)
}
