use core::sync::atomic::{AtomicU64, Ordering};

/// Monotonic count of timer interrupts.
///
/// Bumped from the timer ISR, read from anywhere.
#[derive(Debug, Default)]
pub struct TickCounter(AtomicU64);

impl TickCounter {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Records one tick and returns the new count.
    #[inline]
    pub fn tick(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    #[inline]
    #[must_use]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts() {
        static TICKS: TickCounter = TickCounter::new();
        assert_eq!(TICKS.get(), 0);
        assert_eq!(TICKS.tick(), 1);
        assert_eq!(TICKS.tick(), 2);
        assert_eq!(TICKS.get(), 2);
    }
}
