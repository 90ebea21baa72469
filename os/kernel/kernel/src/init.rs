//! # Bring-up Sequence
//!
//! Runs once on the boot stack with interrupts disabled and ends with `sti`:
//!
//! 1. logger
//! 2. physical memory + identity-mapped paging ([`memory`](crate::memory))
//! 3. GDT, then IDT in a freshly allocated page
//! 4. ACPI discovery
//! 5. interrupt delivery: legacy 8259s, or LAPIC with a calibrated timer
//! 6. PS/2 mouse (feature `ps2-mouse`)
//! 7. park the [`KernelContext`] in [`KERNEL`], enable interrupts

use crate::context::{KERNEL, KernelContext};
use crate::memory::MemorySetup;
use crate::tracing::{trace_boot_info, trace_memory_map};
use crate::{acpi, apic, gdt, idt, memory};
use kernel_info::boot::KernelBootInfo;
use kernel_interrupts::InterruptMode;
use kernel_interrupts::pic::ChainedPics;
use kernel_memory_addresses::PhysicalAddress;
use kernel_qemu::{QemuLogger, qemu_trace};
use kernel_registers::ports::CpuPorts;
use kernel_sync::SpinLock;
use kernel_sync::irq::sti_enable_interrupts;
use log::{LevelFilter, info};

/// Interrupt delivery chosen at build time.
const INTERRUPT_MODE: InterruptMode = if cfg!(feature = "apic") {
    InterruptMode::Apic
} else {
    InterruptMode::LegacyPic
};

const LOG_LEVEL: LevelFilter = if cfg!(debug_assertions) {
    LevelFilter::Debug
} else {
    LevelFilter::Info
};

/// Brings the machine from firmware hand-off to interrupts enabled.
///
/// # Panics
/// On every fatal bring-up condition; see the individual steps.
pub fn bring_up(bi: &KernelBootInfo) {
    if QemuLogger::install(LOG_LEVEL).is_err() {
        qemu_trace!("logger was already installed\n");
    }
    info!("Kernel reporting to QEMU! Initializing bootstrap processor now.");
    trace_boot_info(bi);
    trace_memory_map(bi);

    info!("Initializing physical memory and paging ...");
    let MemorySetup { allocator, pml4 } = memory::memory_setup(bi);

    info!("Initializing GDT ...");
    gdt::init();

    let mut ctx = KernelContext {
        allocator,
        pml4,
        boot_info: bi.clone(),
        idt: PhysicalAddress::zero(),
        interrupt_mode: INTERRUPT_MODE,
        apic: None,
    };

    info!("Initializing IDT ({INTERRUPT_MODE:?} mode) ...");
    ctx.idt = idt::init(&mut ctx, INTERRUPT_MODE);

    info!("Discovering ACPI tables ...");
    let tables = acpi::discover(bi.rsdp_addr);

    match INTERRUPT_MODE {
        InterruptMode::LegacyPic => {
            // SAFETY: CPL0, interrupts disabled.
            let mut pics = ChainedPics::new(unsafe { CpuPorts::new() });
            pics.configure_legacy(cfg!(feature = "ps2-mouse"));
            let masks = pics.read_masks();
            info!(
                "8259 PICs remapped, masks master={:#04x} slave={:#04x}",
                masks.master, masks.slave
            );
        }
        InterruptMode::Apic => {
            let Some(hpet_base) = tables.hpet_base else {
                panic!("APIC mode needs an HPET but ACPI lists none");
            };
            info!("Bringing up the local APIC timer ...");
            ctx.apic = Some(apic::apic_setup(&mut ctx, tables.local_apic_base(), hpet_base));
        }
    }

    #[cfg(feature = "ps2-mouse")]
    crate::interrupts::mouse::init();

    if KERNEL.set(SpinLock::new(ctx)).is_err() {
        panic!("kernel context initialized twice");
    }

    info!("Enabling interrupts ...");
    sti_enable_interrupts();
}
