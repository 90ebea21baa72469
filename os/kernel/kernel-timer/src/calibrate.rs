//! LAPIC timer calibration and periodic arming.

use crate::lapic::{DIVIDE_BY_16, Lapic, LvtTimer, TimerMode};
use crate::{Mmio, ReferenceClock, TimerError};
use log::info;

/// Length of the measurement window.
pub const CALIBRATION_MS: u32 = 10;

/// Starting value of the countdown.
pub const CALIBRATION_START: u32 = 0xFFFF_FFFF;

/// Result of one calibration run.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Calibration {
    /// LAPIC timer ticks (at divide-by-16) per millisecond.
    pub ticks_per_ms: u32,
    /// Raw current-count value read after the window.
    pub remaining: u32,
}

/// Measures the LAPIC timer against `clock`.
///
/// Leaves the timer masked.
///
/// # Errors
/// Whatever `clock` reports, or [`TimerError::LapicTimerStalled`] if the
/// counter did not move.
pub fn calibrate<M: Mmio, C: ReferenceClock>(
    lapic: &mut Lapic<M>,
    clock: &mut C,
) -> Result<Calibration, TimerError> {
    lapic.set_divide(DIVIDE_BY_16);
    lapic.set_initial_count(CALIBRATION_START);
    clock.sleep_ms(CALIBRATION_MS)?;
    lapic.mask_timer();

    let remaining = lapic.current_count();
    let ticks_per_ms = (CALIBRATION_START - remaining) / CALIBRATION_MS;
    if ticks_per_ms == 0 {
        return Err(TimerError::LapicTimerStalled);
    }

    info!("LAPIC timer: {ticks_per_ms} ticks/ms (remaining {remaining:#x})");
    Ok(Calibration {
        ticks_per_ms,
        remaining,
    })
}

/// Starts the periodic timer on `vector`, firing once per `ticks` timer ticks.
pub fn arm_periodic<M: Mmio>(lapic: &mut Lapic<M>, vector: u8, ticks: u32) {
    lapic.set_lvt_timer(
        LvtTimer::new()
            .with_vector(vector)
            .with_mode(TimerMode::Periodic),
    );
    lapic.set_divide(DIVIDE_BY_16);
    lapic.set_initial_count(ticks);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lapic::{LVT_MASKED, regs};
    use crate::test_support::FakeMmio;

    /// Lets a fixed number of LAPIC ticks elapse per millisecond.
    struct FakeClock {
        lapic: FakeMmio,
        ticks_per_ms: u32,
        slept: u32,
    }

    impl ReferenceClock for FakeClock {
        fn sleep_ms(&mut self, ms: u32) -> Result<(), TimerError> {
            self.slept += ms;
            let start = u32::try_from(self.lapic.get(regs::TIMER_INITIAL)).unwrap_or(0);
            self.lapic.set(
                regs::TIMER_CURRENT,
                u64::from(start - ms * self.ticks_per_ms),
            );
            Ok(())
        }
    }

    #[test]
    fn measures_ticks_per_ms() {
        let mmio = FakeMmio::default();
        let mut lapic = Lapic::new(mmio.clone());
        let mut clock = FakeClock {
            lapic: mmio.clone(),
            ticks_per_ms: 62_500,
            slept: 0,
        };

        let cal = calibrate(&mut lapic, &mut clock).expect("calibrated");
        assert_eq!(cal.ticks_per_ms, 62_500);
        assert_eq!(cal.remaining, 0xFFFF_FFFF - 625_000);
        assert_eq!(clock.slept, CALIBRATION_MS);

        assert_eq!(
            mmio.writes(),
            vec![
                (regs::TIMER_DIVIDE, 0x3),
                (regs::TIMER_INITIAL, 0xFFFF_FFFF),
                (regs::LVT_TIMER, u64::from(LVT_MASKED)),
            ]
        );
    }

    #[test]
    fn stalled_timer_is_an_error() {
        let mmio = FakeMmio::default();
        let mut lapic = Lapic::new(mmio.clone());
        let mut clock = FakeClock {
            lapic: mmio,
            ticks_per_ms: 0,
            slept: 0,
        };
        assert_eq!(
            calibrate(&mut lapic, &mut clock),
            Err(TimerError::LapicTimerStalled)
        );
    }

    #[test]
    fn arming_programs_one_interrupt_per_ms() {
        let mmio = FakeMmio::default();
        let mut lapic = Lapic::new(mmio.clone());
        arm_periodic(&mut lapic, 32, 62_500);
        assert_eq!(
            mmio.writes(),
            vec![
                (regs::LVT_TIMER, 32 | (1 << 17)),
                (regs::TIMER_DIVIDE, 0x3),
                (regs::TIMER_INITIAL, 62_500),
            ]
        );
        assert!(!lapic.lvt_timer().masked());
        assert_eq!(lapic.lvt_timer().mode(), TimerMode::Periodic);
    }
}
