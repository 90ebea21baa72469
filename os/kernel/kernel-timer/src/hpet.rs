//! # HPET main counter
//!
//! Only the general registers are used; the comparators stay off. The main
//! counter ticks every `period` femtoseconds once `ENABLE_CNF` is set.
//!
//! ```text
//! 0x000  General capabilities and ID   (period in bits 63:32)
//! 0x010  General configuration          (bit 0 ENABLE_CNF, bit 1 LEG_RT_CNF)
//! 0x0F0  Main counter value
//! ```

use crate::{Mmio, ReferenceClock, TimerError};
use bitfield_struct::bitfield;
use log::debug;

/// Size of the register window.
pub const HPET_MMIO_SIZE: usize = 0x400;

pub mod regs {
    pub const CAPABILITIES: usize = 0x000;
    pub const CONFIGURATION: usize = 0x010;
    pub const MAIN_COUNTER: usize = 0x0F0;
}

/// Femtoseconds per second.
pub const FEMTOS_PER_SECOND: u64 = 1_000_000_000_000_000;

/// Femtoseconds per millisecond.
pub const FEMTOS_PER_MS: u64 = 1_000_000_000_000;

/// Largest period an HPET may report (100 ns).
pub const MAX_PERIOD_FS: u32 = 0x05F5_E100;

#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct HpetCapabilities {
    pub revision: u8,
    /// Number of comparators minus one.
    #[bits(5)]
    pub last_timer: u8,
    pub counter_64bit: bool,
    #[bits(1)]
    _reserved14: u8,
    pub legacy_replacement: bool,
    pub vendor_id: u16,
    /// Main counter tick period in femtoseconds.
    pub period_fs: u32,
}

#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct HpetConfiguration {
    pub enabled: bool,
    pub legacy_replacement: bool,
    #[bits(62)]
    _reserved2: u64,
}

/// The HPET's general register block.
pub struct Hpet<M: Mmio> {
    mmio: M,
    period_fs: u32,
}

impl<M: Mmio> Hpet<M> {
    /// Reads the capabilities and validates the tick period.
    ///
    /// # Errors
    /// [`TimerError::InvalidHpetPeriod`] for a zero period or one above 100 ns.
    pub fn new(mmio: M) -> Result<Self, TimerError> {
        let caps = HpetCapabilities::from_bits(mmio.read64(regs::CAPABILITIES));
        let period_fs = caps.period_fs();
        if period_fs == 0 || period_fs > MAX_PERIOD_FS {
            return Err(TimerError::InvalidHpetPeriod(period_fs));
        }
        debug!(
            "HPET rev {} vendor {:#06x}, {} comparators, {}-bit counter, period {period_fs} fs",
            caps.revision(),
            caps.vendor_id(),
            caps.last_timer() + 1,
            if caps.counter_64bit() { 64 } else { 32 },
        );
        Ok(Self { mmio, period_fs })
    }

    #[must_use]
    pub fn capabilities(&self) -> HpetCapabilities {
        HpetCapabilities::from_bits(self.mmio.read64(regs::CAPABILITIES))
    }

    #[must_use]
    pub const fn period_fs(&self) -> u32 {
        self.period_fs
    }

    #[must_use]
    pub const fn frequency_hz(&self) -> u64 {
        FEMTOS_PER_SECOND / self.period_fs as u64
    }

    /// Starts the main counter and checks that it took.
    ///
    /// # Errors
    /// [`TimerError::HpetNotEnabled`] if `ENABLE_CNF` reads back clear.
    pub fn enable(&mut self) -> Result<(), TimerError> {
        let cfg = HpetConfiguration::from_bits(self.mmio.read64(regs::CONFIGURATION))
            .with_enabled(true);
        self.mmio.write64(regs::CONFIGURATION, cfg.into_bits());

        let readback = HpetConfiguration::from_bits(self.mmio.read64(regs::CONFIGURATION));
        if !readback.enabled() {
            return Err(TimerError::HpetNotEnabled);
        }
        debug!("HPET enabled, {} Hz", self.frequency_hz());
        Ok(())
    }

    #[must_use]
    pub fn counter(&self) -> u64 {
        self.mmio.read64(regs::MAIN_COUNTER)
    }

    /// Counter ticks in `ms` milliseconds.
    #[must_use]
    pub const fn ticks_for_ms(&self, ms: u32) -> u64 {
        (ms as u64 * FEMTOS_PER_MS) / self.period_fs as u64
    }

    /// Spins until the main counter has advanced by `ms` milliseconds.
    pub fn poll_sleep(&self, ms: u32) {
        let target = self.counter() + self.ticks_for_ms(ms);
        while self.counter() < target {
            core::hint::spin_loop();
        }
    }
}

impl<M: Mmio> ReferenceClock for Hpet<M> {
    fn sleep_ms(&mut self, ms: u32) -> Result<(), TimerError> {
        self.poll_sleep(ms);
        Ok(())
    }
}
