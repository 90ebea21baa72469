//! # Fatal exception reports
//!
//! Double faults, general-protection faults and page faults are not
//! recovered from. The entry stubs collect what the CPU pushed, wrap it in a
//! [`Fault`] and hand it to [`report_and_halt`], which logs the report plus
//! an optional backtrace and then parks the CPU through a [`Halt`].
//!
//! ```text
//! stub (cli, read error code / RIP / CR2) ─► Fault ─► error!(..) ─► Halt::halt
//! ```

use crate::page_fault::PageFaultError;
use crate::stack_walk::StackFrame;
use crate::vectors::{DOUBLE_FAULT, GENERAL_PROTECTION, PAGE_FAULT};
use core::fmt;
use log::error;

/// Where a fatal handler ends up.
pub trait Halt {
    /// Stops the CPU for good.
    fn halt(&self) -> !;
}

/// What a fatal handler knows about the exception.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Fault {
    /// `#DF`; the error code is always zero.
    DoubleFault { error_code: u64 },
    /// `#GP`; the error code is a segment selector index or zero.
    GeneralProtection { error_code: u64, rip: u64 },
    /// `#PF`; `address` is the value of CR2.
    PageFault {
        error: PageFaultError,
        address: u64,
        rip: u64,
    },
}

impl Fault {
    /// Decodes a raw `#PF` error code.
    #[must_use]
    pub const fn page_fault(error_code: u64, address: u64, rip: u64) -> Self {
        Self::PageFault {
            error: PageFaultError::from_bits(error_code),
            address,
            rip,
        }
    }

    #[must_use]
    pub const fn vector(&self) -> u8 {
        match self {
            Self::DoubleFault { .. } => DOUBLE_FAULT,
            Self::GeneralProtection { .. } => GENERAL_PROTECTION,
            Self::PageFault { .. } => PAGE_FAULT,
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::DoubleFault { error_code } => {
                write!(f, "double fault (error code {error_code:#x})")
            }
            Self::GeneralProtection { error_code, rip } => write!(
                f,
                "general protection fault (vector {GENERAL_PROTECTION}, error code {error_code:#x}) at rip={rip:#018x}"
            ),
            Self::PageFault {
                error,
                address,
                rip,
            } => write!(f, "page fault at {address:#018x} (rip={rip:#018x}): {error}"),
        }
    }
}

/// Logs `fault` and every frame of `backtrace`, then halts.
pub fn report_and_halt<H, B>(fault: &Fault, backtrace: B, halt: &H) -> !
where
    H: Halt + ?Sized,
    B: IntoIterator<Item = StackFrame>,
{
    error!("EXCEPTION: {fault}");
    for (depth, frame) in backtrace.into_iter().enumerate() {
        error!("  #{depth:<2} rip={:#018x} rbp={:#018x}", frame.rip, frame.rbp);
    }
    halt.halt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, LevelFilter, Log, Metadata, Record};
    use std::cell::{Cell, RefCell};
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::Once;

    thread_local! {
        static LINES: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
    }

    /// Collects records per test thread, so parallel tests don't mix.
    struct Capture;

    impl Log for Capture {
        fn enabled(&self, _: &Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &Record<'_>) {
            LINES.with(|l| {
                l.borrow_mut()
                    .push((record.level(), record.args().to_string()));
            });
        }

        fn flush(&self) {}
    }

    static CAPTURE: Capture = Capture;
    static INSTALL: Once = Once::new();

    fn captured() -> Vec<(Level, String)> {
        INSTALL.call_once(|| {
            log::set_logger(&CAPTURE).expect("no other logger in this test binary");
            log::set_max_level(LevelFilter::Trace);
        });
        LINES.with(|l| l.borrow_mut().drain(..).collect())
    }

    /// Stands in for `cli; hlt` by unwinding out of the handler.
    #[derive(Default)]
    struct RecordingHalt {
        calls: Cell<u32>,
    }

    impl Halt for RecordingHalt {
        fn halt(&self) -> ! {
            self.calls.set(self.calls.get() + 1);
            panic!("cpu halted");
        }
    }

    fn run(fault: &Fault, backtrace: Vec<StackFrame>) -> (u32, Vec<(Level, String)>) {
        captured();
        let halt = RecordingHalt::default();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            report_and_halt(fault, backtrace, &halt);
        }));
        let payload = outcome.expect_err("report_and_halt returned");
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"cpu halted"));
        (halt.calls.get(), captured())
    }

    #[test]
    fn page_fault_is_reported_then_halts() {
        // write to a non-present page from ring 0
        let fault = Fault::page_fault(0b10, 0xDEAD_B000, 0xFFFF_8000_0010_2030);
        let (halts, lines) = run(&fault, Vec::new());

        assert_eq!(halts, 1);
        assert_eq!(lines.len(), 1);
        let (level, text) = &lines[0];
        assert_eq!(*level, Level::Error);
        assert!(text.starts_with("EXCEPTION: page fault at 0x00000000deadb000"));
        assert!(text.contains("rip=0xffff800000102030"));
        assert!(text.contains("Non-present page"));
        assert_eq!(fault.vector(), 14);
    }

    #[test]
    fn page_fault_error_code_is_decoded() {
        let Fault::PageFault { error, .. } = Fault::page_fault(0b1_0101, 0, 0) else {
            unreachable!()
        };
        assert!(error.present() && error.user() && error.instruction_fetch());
        assert!(!error.write());
    }

    #[test]
    fn general_protection_logs_backtrace_in_order() {
        let fault = Fault::GeneralProtection {
            error_code: 0x18,
            rip: 0x1000,
        };
        let frames = vec![
            StackFrame { rbp: 0x7000, rip: 0x2000 },
            StackFrame { rbp: 0x7040, rip: 0x3000 },
        ];
        let (halts, lines) = run(&fault, frames);

        assert_eq!(halts, 1);
        let texts: Vec<&str> = lines.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts.len(), 3);
        assert!(texts[0].contains("general protection fault (vector 13, error code 0x18)"));
        assert_eq!(texts[1], "  #0  rip=0x0000000000002000 rbp=0x0000000000007000");
        assert_eq!(texts[2], "  #1  rip=0x0000000000003000 rbp=0x0000000000007040");
    }

    #[test]
    fn double_fault_reports_error_code() {
        let (halts, lines) = run(&Fault::DoubleFault { error_code: 0 }, Vec::new());
        assert_eq!(halts, 1);
        assert_eq!(lines, [(Level::Error, "EXCEPTION: double fault (error code 0x0)".to_string())]);
    }
}
