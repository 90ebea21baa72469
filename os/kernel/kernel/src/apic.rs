//! # APIC Timer Bring-up
//!
//! ```text
//! mask 8259s ─► IA32_APIC_BASE (xAPIC, EN) ─► map LAPIC + HPET pages
//!   ─► LAPIC setup ─► HPET enable ─► calibrate (HPET or PIT, 10 ms)
//!   ─► LVT timer periodic @ vector 32, 1 ms
//! ```

use crate::context::{ApicState, KernelContext};
use kernel_interrupts::pic::ChainedPics;
use kernel_interrupts::vectors::{LAPIC_TIMER, SPURIOUS};
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use kernel_registers::ports::CpuPorts;
use kernel_sync::BootCell;
use kernel_timer::hpet::HPET_MMIO_SIZE;
use kernel_timer::lapic::{LAPIC_MMIO_SIZE, enable_xapic};
use kernel_timer::{Calibration, Hpet, Lapic, VolatileMmio, arm_periodic, calibrate};
use log::{debug, info};

#[cfg(feature = "pit-calibration")]
use kernel_timer::Pit;

/// LAPIC register page, for the timer handler's EOI.
pub static LAPIC_BASE: BootCell<VirtualAddress> = BootCell::new();

/// Switches interrupt delivery to the local APIC and starts a 1 kHz timer.
///
/// # Panics
/// If the APIC or HPET enable bit does not stick, the HPET reports a bogus
/// period, calibration measures nothing, or mapping a register page fails.
pub fn apic_setup(
    ctx: &mut KernelContext,
    lapic_base: PhysicalAddress,
    hpet_base: PhysicalAddress,
) -> ApicState {
    // SAFETY: CPL0 with interrupts disabled throughout.
    let mut pics = ChainedPics::new(unsafe { CpuPorts::new() });
    pics.disable();
    debug!("8259 PICs remapped and masked");

    let msr = unsafe { enable_xapic() }.unwrap_or_else(|e| panic!("{e}"));
    debug!("IA32_APIC_BASE reports register page at {}", msr.base());

    map_registers(ctx, lapic_base, LAPIC_MMIO_SIZE, "LAPIC");
    map_registers(ctx, hpet_base, HPET_MMIO_SIZE, "HPET");

    // SAFETY: both register blocks were identity-mapped above.
    let mut lapic = Lapic::new(unsafe {
        VolatileMmio::new(VirtualAddress::identity(lapic_base), LAPIC_MMIO_SIZE)
    });
    lapic.setup(SPURIOUS);
    info!("local APIC {} enabled at {lapic_base}", lapic.id());

    let mut hpet = Hpet::new(unsafe {
        VolatileMmio::new(VirtualAddress::identity(hpet_base), HPET_MMIO_SIZE)
    })
    .unwrap_or_else(|e| panic!("{e}"));
    hpet.enable().unwrap_or_else(|e| panic!("{e}"));
    info!("HPET running at {} Hz", hpet.frequency_hz());

    let Calibration { ticks_per_ms, .. } = calibrate_lapic(&mut lapic, &mut hpet);

    arm_periodic(&mut lapic, LAPIC_TIMER, ticks_per_ms);
    let _ = LAPIC_BASE.set(VirtualAddress::identity(lapic_base));
    info!("LAPIC timer armed: vector {LAPIC_TIMER}, 1 interrupt/ms");

    ApicState {
        lapic_base,
        hpet_base,
        ticks_per_ms,
    }
}

#[cfg(not(feature = "pit-calibration"))]
fn calibrate_lapic(lapic: &mut Lapic<VolatileMmio>, hpet: &mut Hpet<VolatileMmio>) -> Calibration {
    debug!("calibrating against the HPET main counter");
    calibrate(lapic, hpet).unwrap_or_else(|e| panic!("{e}"))
}

#[cfg(feature = "pit-calibration")]
fn calibrate_lapic(lapic: &mut Lapic<VolatileMmio>, _hpet: &mut Hpet<VolatileMmio>) -> Calibration {
    debug!("calibrating against PIT channel 2");
    // SAFETY: CPL0; nothing else drives the PIT.
    let mut pit = Pit::new(unsafe { CpuPorts::new() });
    calibrate(lapic, &mut pit).unwrap_or_else(|e| panic!("{e}"))
}

fn map_registers(ctx: &mut KernelContext, base: PhysicalAddress, len: usize, what: &str) {
    ctx.map_identity(base, len as u64)
        .unwrap_or_else(|e| panic!("mapping {what} registers at {base} failed: {e}"));
    debug!("{what} registers identity-mapped at {base}");
}
