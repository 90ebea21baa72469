use crate::apic;
use crate::interrupts::irq_entry;
use kernel_timer::TickCounter;
use kernel_timer::lapic::LAPIC_MMIO_SIZE;
use kernel_timer::{Lapic, VolatileMmio};

/// LAPIC timer interrupts since the timer was armed (1 per ms).
static TICKS: TickCounter = TickCounter::new();

irq_entry!(
    /// LAPIC timer entry.
    lapic_timer_handler => lapic_timer_rust
);

extern "C" fn lapic_timer_rust() {
    TICKS.tick();
    if let Some(base) = apic::LAPIC_BASE.get() {
        // SAFETY: the register page was identity-mapped before the timer
        // was armed and stays mapped.
        let mut lapic = Lapic::new(unsafe { VolatileMmio::new(*base, LAPIC_MMIO_SIZE) });
        lapic.eoi();
    }
}

/// Milliseconds since the LAPIC timer was armed.
pub fn ticks() -> u64 {
    TICKS.get()
}
