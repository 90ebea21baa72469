//! # x86 I/O Port Access
//!
//! The legacy devices the kernel drives (8259 PIC, 8254 PIT, 8042 PS/2
//! controller) live in the 16-bit I/O port space. Drivers are written against
//! the [`PortIo`] trait so their register protocols can be exercised on the
//! host with a recording fake; [`CpuPorts`] is the real thing.
//!
//! ```text
//! 0x0020-0x0021   PIC #1 (command, data)
//! 0x0040-0x0043   PIT channels 0-2, mode/command
//! 0x0060, 0x0064  PS/2 controller data, status/command
//! 0x0061          System control port B (PIT gate, speaker)
//! 0x0080          POST code port (used for I/O delays)
//! 0x00A0-0x00A1   PIC #2 (command, data)
//! 0x0402          QEMU debug console
//! ```

/// Port used for the short I/O delay after PIC programming steps.
pub const IO_WAIT_PORT: u16 = 0x80;

/// Byte-wide port I/O.
pub trait PortIo {
    /// Read one byte from `port`.
    fn inb(&mut self, port: u16) -> u8;

    /// Write one byte to `port`.
    fn outb(&mut self, port: u16, value: u8);

    /// Give slow legacy devices a moment between consecutive writes.
    ///
    /// Writes a dummy byte to the unused POST port `0x80`.
    fn io_wait(&mut self) {
        self.outb(IO_WAIT_PORT, 0);
    }
}

impl<T: PortIo + ?Sized> PortIo for &mut T {
    fn inb(&mut self, port: u16) -> u8 {
        (**self).inb(port)
    }

    fn outb(&mut self, port: u16, value: u8) {
        (**self).outb(port, value);
    }

    fn io_wait(&mut self) {
        (**self).io_wait();
    }
}

/// Direct `in`/`out` instructions.
#[cfg(feature = "asm")]
#[derive(Debug)]
pub struct CpuPorts {
    _private: (),
}

#[cfg(feature = "asm")]
impl CpuPorts {
    /// # Safety
    /// The caller must run at CPL0 (or hold I/O permission for every port it
    /// touches) and must coordinate device access with interrupt handlers
    /// that drive the same device.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

#[cfg(feature = "asm")]
impl PortIo for CpuPorts {
    #[inline]
    fn inb(&mut self, port: u16) -> u8 {
        let v: u8;
        unsafe {
            core::arch::asm!("in al, dx", in("dx") port, out("al") v, options(nomem, nostack, preserves_flags));
        }
        v
    }

    #[inline]
    fn outb(&mut self, port: u16, value: u8) {
        unsafe {
            core::arch::asm!("out dx, al", in("dx") port, in("al") value, options(nomem, nostack, preserves_flags));
        }
    }
}
