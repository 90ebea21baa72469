//! # QEMU Debug Console
//!
//! Early diagnostic output for a kernel running under QEMU. Bytes written to
//! I/O port `0x402` show up on the host when QEMU runs with
//! `-debugcon stdio` (or `-debugcon file:debug.log`).
//!
//! ## Components
//!
//! * [`QemuLogger`], a `log::Log` backend. Installed once at kernel entry;
//!   afterwards the whole kernel logs through the `log` macros.
//! * [`qemu_trace!`], direct formatted output that bypasses the logger. Used by
//!   code that may run before the logger is installed or after the kernel has
//!   given up (entry stub, panic handler).
//!
//! ```text
//! info!(..) ──> QemuLogger ──┐
//!                            ├──> QemuSink (fmt::Write) ──> out 0x402
//! qemu_trace!(..) ───────────┘
//! ```
//!
//! ## Feature `enabled` (default)
//!
//! Without it every write compiles to nothing, so release images can drop the
//! port traffic entirely while keeping the logging calls in place.
//!
//! ```rust,no_run
//! use kernel_qemu::QemuLogger;
//! use log::{LevelFilter, info};
//!
//! QemuLogger::install(LevelFilter::Debug).expect("logger installed twice");
//! info!("paging enabled");
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod logger;

pub use logger::{QemuLogger, write_record};

#[cfg(feature = "enabled")]
#[doc(hidden)]
pub mod qemu_fmt {
    use core::fmt::{self, Write};

    /// QEMU's `-debugcon` port.
    pub const QEMU_DEBUG_PORT: u16 = 0x402;

    #[allow(clippy::inline_always)]
    #[inline(always)]
    pub fn dbg_putc(c: u8) {
        unsafe {
            core::arch::asm!(
            "out dx, al",
            in("dx") QEMU_DEBUG_PORT,
            in("al") c,
            options(nomem, nostack, preserves_flags)
            );
        }
    }

    /// `fmt::Write` adapter over the debug port.
    pub struct QemuSink;

    impl Write for QemuSink {
        #[inline]
        fn write_str(&mut self, s: &str) -> fmt::Result {
            s.bytes().for_each(dbg_putc);
            Ok(())
        }
    }

    #[inline]
    pub fn qemu_write(args: fmt::Arguments) {
        // Best effort; the sink itself cannot fail.
        let _ = fmt::write(&mut QemuSink, args);
    }
}

#[cfg(not(feature = "enabled"))]
#[doc(hidden)]
pub mod qemu_fmt {
    use core::fmt;

    pub struct QemuSink;

    impl fmt::Write for QemuSink {
        #[inline]
        fn write_str(&mut self, _: &str) -> fmt::Result {
            Ok(())
        }
    }

    #[inline(always)]
    #[allow(clippy::inline_always)]
    pub fn qemu_write(_: fmt::Arguments) {}
}

/// Formatted write to the QEMU debug console, no logger involved.
#[macro_export]
macro_rules! qemu_trace {
    ($($arg:tt)*) => {{
        $crate::qemu_fmt::qemu_write(core::format_args!($($arg)*));
    }};
}
