//! # Timer Bring-up
//!
//! Drivers for the three clocks involved in getting a periodic tick out of
//! the Local APIC, and the calibration that ties them together.
//!
//! | Module | Device | Access |
//! |--------|--------|--------|
//! | [`lapic`] | Local APIC (xAPIC) | MMIO, 32-bit registers |
//! | [`hpet`] | High Precision Event Timer | MMIO, 64-bit registers |
//! | [`pit`] | 8254 channel 2 one-shot | I/O ports `0x42`, `0x43`, `0x61` |
//! | [`calibrate`] | LAPIC tick rate against a [`ReferenceClock`] | |
//!
//! ## Calibration
//!
//! The LAPIC timer runs off the bus clock, whose frequency nothing tells us.
//! So we let it count down from `0xFFFF_FFFF` while a clock of known rate
//! (HPET or PIT) measures 10 ms, and divide:
//!
//! ```text
//! initial = 0xFFFF_FFFF ──► sleep 10 ms ──► mask ──► current
//! ticks_per_ms = (0xFFFF_FFFF - current) / 10
//! ```
//!
//! The periodic timer is then armed with `ticks_per_ms` as its initial count,
//! yielding one interrupt per millisecond.
//!
//! Register blocks are reached through the [`Mmio`] seam so the protocols can
//! be exercised against fakes on the host.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod calibrate;
pub mod hpet;
pub mod lapic;
mod mmio;
pub mod pit;
mod ticks;

pub use crate::calibrate::{Calibration, arm_periodic, calibrate};
pub use crate::hpet::Hpet;
pub use crate::lapic::Lapic;
pub use crate::mmio::{Mmio, VolatileMmio};
pub use crate::pit::Pit;
pub use crate::ticks::TickCounter;

/// Errors raised while bringing up the timers.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum TimerError {
    /// `IA32_APIC_BASE.EN` did not stick.
    #[error("local APIC global enable bit is not set")]
    ApicNotEnabled,
    /// `ENABLE_CNF` read back as zero.
    #[error("HPET main counter did not enable")]
    HpetNotEnabled,
    /// The HPET reports a tick period outside `1..=100 ns`.
    #[error("HPET reports an invalid counter period of {0} fs")]
    InvalidHpetPeriod(u32),
    /// A PIT one-shot must last between 1 µs and 54 ms.
    #[error("PIT one-shot of {0} µs is out of range")]
    PitSleepOutOfRange(u32),
    /// The LAPIC timer did not count during calibration.
    #[error("LAPIC timer did not advance during calibration")]
    LapicTimerStalled,
}

/// A clock that can busy-wait for a known wall-clock interval.
pub trait ReferenceClock {
    /// Spins for `ms` milliseconds.
    ///
    /// # Errors
    /// The clock could not be programmed for the interval.
    fn sleep_ms(&mut self, ms: u32) -> Result<(), TimerError>;
}

impl<T: ReferenceClock + ?Sized> ReferenceClock for &mut T {
    fn sleep_ms(&mut self, ms: u32) -> Result<(), TimerError> {
        (**self).sleep_ms(ms)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::Mmio;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    #[derive(Default)]
    pub struct Registers {
        pub values: HashMap<usize, u64>,
        /// Registers that advance by the given step after every read.
        pub counters: HashMap<usize, u64>,
        pub writes: Vec<(usize, u64)>,
    }

    /// A register block backed by a shared map.
    #[derive(Clone, Default)]
    pub struct FakeMmio(pub Rc<RefCell<Registers>>);

    impl FakeMmio {
        pub fn set(&self, offset: usize, value: u64) {
            self.0.borrow_mut().values.insert(offset, value);
        }

        pub fn get(&self, offset: usize) -> u64 {
            self.0.borrow().values.get(&offset).copied().unwrap_or(0)
        }

        pub fn count_up(&self, offset: usize, step: u64) {
            self.0.borrow_mut().counters.insert(offset, step);
        }

        pub fn writes(&self) -> Vec<(usize, u64)> {
            self.0.borrow().writes.clone()
        }

        fn read(&self, offset: usize) -> u64 {
            let mut regs = self.0.borrow_mut();
            let v = regs.values.get(&offset).copied().unwrap_or(0);
            if let Some(step) = regs.counters.get(&offset).copied() {
                regs.values.insert(offset, v + step);
            }
            v
        }

        fn write(&self, offset: usize, value: u64) {
            let mut regs = self.0.borrow_mut();
            regs.values.insert(offset, value);
            regs.writes.push((offset, value));
        }
    }

    impl Mmio for FakeMmio {
        #[allow(clippy::cast_possible_truncation)]
        fn read32(&self, offset: usize) -> u32 {
            self.read(offset) as u32
        }

        fn write32(&mut self, offset: usize, value: u32) {
            self.write(offset, u64::from(value));
        }

        fn read64(&self, offset: usize) -> u64 {
            self.read(offset)
        }

        fn write64(&mut self, offset: usize, value: u64) {
            self.write(offset, value);
        }
    }
}
