use crate::interrupts::irq_entry;
use kernel_interrupts::pic::ChainedPics;
use kernel_interrupts::ps2::{DATA_PORT, MousePacket, MousePacketAssembler, Ps2Controller};
use kernel_registers::ports::{CpuPorts, PortIo};
use kernel_sync::SpinLock;
use log::info;

static PACKETS: SpinLock<MousePacketAssembler> = SpinLock::new(MousePacketAssembler::new());

irq_entry!(
    /// IRQ12 entry.
    mouse_handler => mouse_rust
);

extern "C" fn mouse_rust() {
    // SAFETY: CPL0; the controller is only driven from here after init.
    let mut ports = unsafe { CpuPorts::new() };
    let byte = ports.inb(DATA_PORT);

    // The main loop holds the lock with interrupts masked, so this only
    // fails if we interrupted ourselves; the byte is then lost.
    if let Some(mut assembler) = PACKETS.try_lock() {
        assembler.feed(byte);
    }

    let mut pics = ChainedPics::new(ports);
    pics.end_of_interrupt_slave();
}

/// The last completed packet, if one is waiting.
pub fn take_packet() -> Option<MousePacket> {
    PACKETS.lock_irq().take()
}

/// Enables the PS/2 auxiliary device and packet streaming.
pub fn init() {
    // SAFETY: CPL0, interrupts still disabled.
    let mut controller = Ps2Controller::new(unsafe { CpuPorts::new() });
    controller.init_mouse();
    info!("PS/2 mouse initialized");
}
