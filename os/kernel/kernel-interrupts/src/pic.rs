//! # Chained 8259 PICs
//!
//! Two 8259A controllers, the slave cascaded on the master's IRQ 2:
//!
//! ```text
//!            ┌────────────┐ INT
//!  IRQ 0-7 ─►│ PIC1 0x20  │──────► CPU
//!            └────────────┘
//!                 ▲ IRQ 2
//!            ┌────────────┐
//! IRQ 8-15 ─►│ PIC2 0xA0  │
//!            └────────────┘
//! ```
//!
//! After reset the master delivers on vectors 8..16, which collide with CPU
//! exceptions, so both are remapped to [`PIC1_OFFSET`]/[`PIC2_OFFSET`] before
//! any line is unmasked.

use crate::vectors::{PIC1_OFFSET, PIC2_OFFSET};
use kernel_registers::ports::PortIo;
use log::debug;

pub const PIC1_COMMAND: u16 = 0x20;
pub const PIC1_DATA: u16 = 0x21;
pub const PIC2_COMMAND: u16 = 0xA0;
pub const PIC2_DATA: u16 = 0xA1;

/// ICW1: initialization, ICW4 follows.
pub const ICW1_INIT: u8 = 0x11;
/// ICW4: 8086 mode.
pub const ICW4_8086: u8 = 0x01;
pub const EOI: u8 = 0x20;

/// Master: everything except IRQ 1 (keyboard) and IRQ 2 (cascade).
pub const LEGACY_MASTER_MASK: u8 = 0b1111_1001;
/// Slave: everything.
pub const LEGACY_SLAVE_MASK: u8 = 0xFF;
/// Slave: everything except IRQ 12 (PS/2 mouse).
pub const LEGACY_SLAVE_MASK_WITH_MOUSE: u8 = 0b1110_1111;

/// Masks of both controllers, a set bit disables the line.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PicMasks {
    pub master: u8,
    pub slave: u8,
}

impl PicMasks {
    pub const ALL: Self = Self {
        master: 0xFF,
        slave: 0xFF,
    };

    /// Legacy-mode masks: keyboard, plus the mouse if requested.
    #[must_use]
    pub const fn legacy(mouse: bool) -> Self {
        Self {
            master: LEGACY_MASTER_MASK,
            slave: if mouse {
                LEGACY_SLAVE_MASK_WITH_MOUSE
            } else {
                LEGACY_SLAVE_MASK
            },
        }
    }
}

/// Both controllers behind one port accessor.
pub struct ChainedPics<P: PortIo> {
    ports: P,
}

impl<P: PortIo> ChainedPics<P> {
    pub const fn new(ports: P) -> Self {
        Self { ports }
    }

    /// Reprograms both controllers to deliver on `0x20..0x30`.
    ///
    /// The masks in effect before the call are restored afterwards.
    pub fn remap(&mut self) {
        let saved = self.read_masks();

        self.ports.outb(PIC1_COMMAND, ICW1_INIT);
        self.ports.io_wait();
        self.ports.outb(PIC2_COMMAND, ICW1_INIT);
        self.ports.io_wait();

        self.ports.outb(PIC1_DATA, PIC1_OFFSET);
        self.ports.io_wait();
        self.ports.outb(PIC2_DATA, PIC2_OFFSET);
        self.ports.io_wait();

        // Slave on IRQ 2 (bit mask), slave cascade identity 2.
        self.ports.outb(PIC1_DATA, 4);
        self.ports.io_wait();
        self.ports.outb(PIC2_DATA, 2);
        self.ports.io_wait();

        self.ports.outb(PIC1_DATA, ICW4_8086);
        self.ports.io_wait();
        self.ports.outb(PIC2_DATA, ICW4_8086);
        self.ports.io_wait();

        self.write_masks(saved);
        debug!("PIC remapped to {PIC1_OFFSET:#04x}/{PIC2_OFFSET:#04x}");
    }

    pub fn read_masks(&mut self) -> PicMasks {
        PicMasks {
            master: self.ports.inb(PIC1_DATA),
            slave: self.ports.inb(PIC2_DATA),
        }
    }

    pub fn write_masks(&mut self, masks: PicMasks) {
        self.ports.outb(PIC1_DATA, masks.master);
        self.ports.outb(PIC2_DATA, masks.slave);
    }

    /// Acknowledges an IRQ on the master only.
    pub fn end_of_interrupt_master(&mut self) {
        self.ports.outb(PIC1_COMMAND, EOI);
    }

    /// Acknowledges an IRQ raised through the slave: slave first, then master.
    pub fn end_of_interrupt_slave(&mut self) {
        self.ports.outb(PIC2_COMMAND, EOI);
        self.ports.outb(PIC1_COMMAND, EOI);
    }

    /// Acknowledges `irq`, picking the right controller(s).
    pub fn end_of_interrupt(&mut self, irq: u8) {
        if irq >= 8 {
            self.end_of_interrupt_slave();
        } else {
            self.end_of_interrupt_master();
        }
    }

    /// Remaps and installs the legacy-mode masks.
    pub fn configure_legacy(&mut self, mouse: bool) {
        self.remap();
        self.write_masks(PicMasks::legacy(mouse));
        debug!("PIC legacy mode, mouse line {}", if mouse { "open" } else { "masked" });
    }

    /// Remaps, then masks every line. Used before switching to the LAPIC.
    pub fn disable(&mut self) {
        self.remap();
        self.write_masks(PicMasks::ALL);
        debug!("PIC disabled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{PortOp, RecordingPorts};

    #[test]
    fn remap_sends_icws_and_restores_masks() {
        let mut ports = RecordingPorts::default();
        ports.script(PIC1_DATA, &[0xAB]);
        ports.script(PIC2_DATA, &[0xCD]);

        let mut pics = ChainedPics::new(&mut ports);
        pics.remap();

        assert_eq!(
            ports.writes(),
            vec![
                (PIC1_COMMAND, 0x11),
                (PIC2_COMMAND, 0x11),
                (PIC1_DATA, 0x20),
                (PIC2_DATA, 0x28),
                (PIC1_DATA, 4),
                (PIC2_DATA, 2),
                (PIC1_DATA, 0x01),
                (PIC2_DATA, 0x01),
                (PIC1_DATA, 0xAB),
                (PIC2_DATA, 0xCD),
            ]
        );
        // Every initialization step is followed by an I/O delay.
        let delays = ports
            .ops
            .iter()
            .filter(|op| **op == PortOp::Out(0x80, 0))
            .count();
        assert_eq!(delays, 8);
    }

    #[test]
    fn legacy_masks() {
        let mut ports = RecordingPorts::default();
        ChainedPics::new(&mut ports).configure_legacy(false);
        assert_eq!(ports.writes()[10..], [(PIC1_DATA, 0xF9), (PIC2_DATA, 0xFF)]);

        let mut ports = RecordingPorts::default();
        ChainedPics::new(&mut ports).configure_legacy(true);
        assert_eq!(ports.writes()[10..], [(PIC1_DATA, 0xF9), (PIC2_DATA, 0xEF)]);
    }

    #[test]
    fn disable_masks_everything() {
        let mut ports = RecordingPorts::default();
        ChainedPics::new(&mut ports).disable();
        assert_eq!(ports.writes()[10..], [(PIC1_DATA, 0xFF), (PIC2_DATA, 0xFF)]);
    }

    #[test]
    fn eoi_order() {
        let mut ports = RecordingPorts::default();
        let mut pics = ChainedPics::new(&mut ports);
        pics.end_of_interrupt(1);
        pics.end_of_interrupt(12);
        assert_eq!(
            ports.writes(),
            vec![(PIC1_COMMAND, EOI), (PIC2_COMMAND, EOI), (PIC1_COMMAND, EOI)]
        );
    }
}
