//! # PS/2 mouse
//!
//! The 8042 controller multiplexes keyboard and auxiliary (mouse) bytes over
//! one data port. The mouse sends 3-byte packets:
//!
//! ```text
//! byte 0   Yo Xo Ys Xs 1 M R L     overflow, sign, always-one, buttons
//! byte 1   X movement (low 8 bits of a 9-bit two's complement value)
//! byte 2   Y movement (same, positive = up)
//! ```
//!
//! [`MousePacketAssembler`] runs in the IRQ 12 handler and turns the byte
//! stream into [`MousePacket`]s; the main loop takes completed packets.

use bitfield_struct::bitfield;
use kernel_registers::ports::PortIo;
use log::{debug, warn};

pub const DATA_PORT: u16 = 0x60;
/// Read: status. Write: controller command.
pub const STATUS_PORT: u16 = 0x64;

/// Upper bound on status polls before a controller wait gives up.
pub const WAIT_POLLS: u32 = 100_000;

const STATUS_OUTPUT_FULL: u8 = 1 << 0;
const STATUS_INPUT_FULL: u8 = 1 << 1;

const CMD_ENABLE_AUX: u8 = 0xA8;
const CMD_READ_CONFIG: u8 = 0x20;
const CMD_WRITE_CONFIG: u8 = 0x60;
const CMD_WRITE_AUX: u8 = 0xD4;
const CONFIG_AUX_IRQ: u8 = 1 << 1;

const MOUSE_SET_DEFAULTS: u8 = 0xF6;
const MOUSE_ENABLE_STREAMING: u8 = 0xF4;

/// First byte of a mouse packet.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct MousePacketFlags {
    pub left: bool,
    pub right: bool,
    pub middle: bool,
    /// Set in every well-formed first byte; used to resynchronize.
    pub always_one: bool,
    pub x_negative: bool,
    pub y_negative: bool,
    pub x_overflow: bool,
    pub y_overflow: bool,
}

/// One complete packet.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MousePacket {
    pub flags: MousePacketFlags,
    pub x: u8,
    pub y: u8,
}

impl MousePacket {
    /// Movement in screen coordinates (`y` grows downwards).
    #[must_use]
    pub fn delta(&self) -> (i32, i32) {
        let dx = Self::axis(self.x, self.flags.x_negative(), self.flags.x_overflow());
        let dy = Self::axis(self.y, self.flags.y_negative(), self.flags.y_overflow());
        (dx, -dy)
    }

    fn axis(raw: u8, negative: bool, overflow: bool) -> i32 {
        let extra = if overflow { 255 } else { 0 };
        if negative {
            -(256 - i32::from(raw)) - extra
        } else {
            i32::from(raw) + extra
        }
    }
}

/// Byte-at-a-time packet state machine.
///
/// Bytes arriving while a completed packet is still held are dropped.
#[derive(Debug, Default)]
pub struct MousePacketAssembler {
    cycle: u8,
    bytes: [u8; 3],
    ready: bool,
}

impl MousePacketAssembler {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cycle: 0,
            bytes: [0; 3],
            ready: false,
        }
    }

    pub const fn feed(&mut self, byte: u8) {
        if self.ready {
            return;
        }
        match self.cycle {
            0 => {
                if byte & 0b0000_1000 != 0 {
                    self.bytes[0] = byte;
                    self.cycle = 1;
                }
            }
            1 => {
                self.bytes[1] = byte;
                self.cycle = 2;
            }
            _ => {
                self.bytes[2] = byte;
                self.cycle = 0;
                self.ready = true;
            }
        }
    }

    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    /// Hands out the completed packet, if any, and starts the next one.
    pub const fn take(&mut self) -> Option<MousePacket> {
        if !self.ready {
            return None;
        }
        self.ready = false;
        Some(MousePacket {
            flags: MousePacketFlags::from_bits(self.bytes[0]),
            x: self.bytes[1],
            y: self.bytes[2],
        })
    }
}

/// The 8042 controller, as far as the mouse needs it.
pub struct Ps2Controller<P: PortIo> {
    ports: P,
}

impl<P: PortIo> Ps2Controller<P> {
    pub const fn new(ports: P) -> Self {
        Self { ports }
    }

    /// Polls until the controller accepts a byte. `false` on timeout.
    pub fn wait_writable(&mut self) -> bool {
        (0..WAIT_POLLS).any(|_| self.ports.inb(STATUS_PORT) & STATUS_INPUT_FULL == 0)
    }

    /// Polls until a byte is available. `false` on timeout.
    pub fn wait_readable(&mut self) -> bool {
        (0..WAIT_POLLS).any(|_| self.ports.inb(STATUS_PORT) & STATUS_OUTPUT_FULL != 0)
    }

    pub fn read_data(&mut self) -> u8 {
        self.ports.inb(DATA_PORT)
    }

    fn command(&mut self, cmd: u8) {
        self.writable_or_warn();
        self.ports.outb(STATUS_PORT, cmd);
    }

    fn write_data(&mut self, value: u8) {
        self.writable_or_warn();
        self.ports.outb(DATA_PORT, value);
    }

    /// Sends `value` to the auxiliary device.
    pub fn write_mouse(&mut self, value: u8) {
        self.command(CMD_WRITE_AUX);
        self.write_data(value);
    }

    fn read_ack(&mut self) -> u8 {
        if !self.wait_readable() {
            warn!("PS/2: no response from controller");
        }
        self.read_data()
    }

    fn writable_or_warn(&mut self) {
        if !self.wait_writable() {
            warn!("PS/2: controller input buffer stuck full");
        }
    }

    /// Enables the auxiliary port and its IRQ and starts packet streaming.
    pub fn init_mouse(&mut self) {
        self.ports.outb(STATUS_PORT, CMD_ENABLE_AUX);

        self.command(CMD_READ_CONFIG);
        let config = self.read_ack() | CONFIG_AUX_IRQ;

        self.command(CMD_WRITE_CONFIG);
        self.write_data(config);

        self.write_mouse(MOUSE_SET_DEFAULTS);
        let ack_defaults = self.read_ack();
        self.write_mouse(MOUSE_ENABLE_STREAMING);
        let ack_stream = self.read_ack();

        debug!(
            "PS/2 mouse enabled (config {config:#04x}, acks {ack_defaults:#04x} {ack_stream:#04x})"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingPorts;

    #[test]
    fn resynchronizes_on_bit_three() {
        let mut asm = MousePacketAssembler::new();
        asm.feed(0x00); // dropped, bit 3 clear
        assert!(!asm.is_ready());
        asm.feed(0x09);
        asm.feed(5);
        assert!(!asm.is_ready());
        asm.feed(7);
        let p = asm.take().expect("packet");
        assert!(p.flags.left());
        assert_eq!((p.x, p.y), (5, 7));
        assert_eq!(p.delta(), (5, -7));
        assert!(asm.take().is_none());
    }

    #[test]
    fn held_packet_blocks_new_bytes() {
        let mut asm = MousePacketAssembler::new();
        for b in [0x08, 1, 2, 0x08, 9, 9] {
            asm.feed(b);
        }
        let p = asm.take().expect("packet");
        assert_eq!((p.x, p.y), (1, 2));
        assert!(!asm.is_ready());
    }

    #[test]
    fn negative_and_overflowing_deltas() {
        // x negative (-10), y negative (-1) => screen dy +1
        let p = MousePacket {
            flags: MousePacketFlags::from_bits(0b0011_1000),
            x: 246,
            y: 255,
        };
        assert_eq!(p.delta(), (-10, 1));

        let p = MousePacket {
            flags: MousePacketFlags::from_bits(0b0100_1000),
            x: 1,
            y: 0,
        };
        assert_eq!(p.delta(), (256, 0));
    }

    #[test]
    fn init_sequence() {
        let mut ports = RecordingPorts::default();
        ports.default_read(STATUS_PORT, STATUS_OUTPUT_FULL);
        ports.script(DATA_PORT, &[0x45, 0xFA, 0xFA]);

        Ps2Controller::new(&mut ports).init_mouse();

        assert_eq!(
            ports.writes(),
            vec![
                (STATUS_PORT, 0xA8),
                (STATUS_PORT, 0x20),
                (STATUS_PORT, 0x60),
                (DATA_PORT, 0x47),
                (STATUS_PORT, 0xD4),
                (DATA_PORT, 0xF6),
                (STATUS_PORT, 0xD4),
                (DATA_PORT, 0xF4),
            ]
        );
    }

    #[test]
    fn waits_are_bounded() {
        let mut ports = RecordingPorts::default();
        ports.default_read(STATUS_PORT, STATUS_INPUT_FULL);
        {
            let mut ctl = Ps2Controller::new(&mut ports);
            assert!(!ctl.wait_writable());
            assert!(!ctl.wait_readable());
        }
        assert_eq!(ports.ops.len(), 2 * WAIT_POLLS as usize);
    }
}
