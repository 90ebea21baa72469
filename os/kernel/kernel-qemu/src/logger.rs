use crate::qemu_fmt::QemuSink;
use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

/// `log` backend writing one line per record to the QEMU debug console.
pub struct QemuLogger {
    /// `LevelFilter as usize`.
    max_level: AtomicUsize,
}

static LOGGER: QemuLogger = QemuLogger {
    max_level: AtomicUsize::new(LevelFilter::Off as usize),
};

impl QemuLogger {
    /// Installs the logger as the global `log` backend.
    ///
    /// # Errors
    /// Fails if any logger (including this one) is already installed.
    pub fn install(max_level: LevelFilter) -> Result<(), SetLoggerError> {
        LOGGER.max_level.store(max_level as usize, Ordering::Relaxed);
        log::set_logger(&LOGGER)?;
        log::set_max_level(max_level);
        Ok(())
    }

    fn max_level(&self) -> usize {
        self.max_level.load(Ordering::Relaxed)
    }
}

impl Log for QemuLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() as usize <= self.max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let _ = write_record(&mut QemuSink, record);
        }
    }

    fn flush(&self) {}
}

/// Formats `record` as `[LEVEL target] message\n`.
///
/// # Errors
/// Propagates errors of the underlying writer.
pub fn write_record(w: &mut impl fmt::Write, record: &Record) -> fmt::Result {
    let level = match record.level() {
        Level::Error => "ERROR",
        Level::Warn => "WARN ",
        Level::Info => "INFO ",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    };
    writeln!(w, "[{level} {}] {}", record.target(), record.args())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_line_format() {
        let mut out = String::new();
        write_record(
            &mut out,
            &Record::builder()
                .level(Level::Info)
                .target("kernel::memory")
                .args(format_args!("locked {} pages", 12))
                .build(),
        )
        .unwrap();
        assert_eq!(out, "[INFO  kernel::memory] locked 12 pages\n");
    }

    #[test]
    fn level_filter_applies() {
        let logger = QemuLogger {
            max_level: AtomicUsize::new(LevelFilter::Info as usize),
        };
        let meta = |level| Metadata::builder().level(level).target("t").build();
        assert!(logger.enabled(&meta(Level::Error)));
        assert!(logger.enabled(&meta(Level::Info)));
        assert!(!logger.enabled(&meta(Level::Debug)));
    }
}
