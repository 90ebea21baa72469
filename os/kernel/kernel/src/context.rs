//! # Kernel context
//!
//! Everything bring-up produces, owned in one place. [`init::bring_up`]
//! builds it step by step through `&mut KernelContext` and finally parks it
//! in [`KERNEL`], where later subsystems reach it under an interrupt-masking
//! lock. Interrupt handlers never touch it.
//!
//! [`init::bring_up`]: crate::init::bring_up

use kernel_alloc::PageFrameAllocator;
use kernel_info::boot::KernelBootInfo;
use kernel_interrupts::InterruptMode;
use kernel_memory_addresses::PhysicalAddress;
use kernel_sync::{BootCell, SpinLock};
use kernel_vmem::{AddressSpace, IdentityMapper, VmemError};

/// Local APIC and HPET state after timer bring-up.
#[derive(Debug, Copy, Clone)]
pub struct ApicState {
    pub lapic_base: PhysicalAddress,
    pub hpet_base: PhysicalAddress,
    pub ticks_per_ms: u32,
}

pub struct KernelContext {
    pub allocator: PageFrameAllocator<'static>,
    /// PML4 of the kernel's identity map.
    pub pml4: PhysicalAddress,
    pub boot_info: KernelBootInfo,
    /// Frame holding the IDT.
    pub idt: PhysicalAddress,
    pub interrupt_mode: InterruptMode,
    pub apic: Option<ApicState>,
}

impl KernelContext {
    /// The active address space.
    pub fn address_space(&self) -> AddressSpace<'static, IdentityMapper> {
        AddressSpace::from_root(&IdentityMapper, self.pml4)
    }

    /// Identity-maps `[pa, pa + len)`, e.g. for an MMIO window.
    ///
    /// The pages are not locked in the allocator; device memory lies outside
    /// the tracked RAM or in firmware-reserved ranges.
    pub fn map_identity(&mut self, pa: PhysicalAddress, len: u64) -> Result<u64, VmemError> {
        let space = self.address_space();
        space.identity_map_range(&mut self.allocator, pa, pa + len)
    }
}

/// The context, once bring-up has finished.
pub static KERNEL: BootCell<SpinLock<KernelContext>> = BootCell::new();
