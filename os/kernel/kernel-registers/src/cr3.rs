use crate::{LoadRegisterUnsafe, StoreRegisterUnsafe};
use bitfield_struct::bitfield;
use kernel_memory_addresses::PhysicalAddress;

/// CR3: Page-Map Level-4 Base Register (IA-32e, PCID disabled).
///
/// Holds the physical base address of the PML4 table and cache-control flags
/// for PML4 walks.
#[bitfield(u64)]
pub struct Cr3 {
    /// Bits 0–2: Reserved.
    #[bits(3)]
    pub reserved0: u8,

    /// Bit 3: PWT: Page-level Write-Through for PML4.
    pub pwt: bool,

    /// Bit 4: PCD: Page-level Cache Disable for PML4.
    pub pcd: bool,

    /// Bits 5–11: Reserved.
    #[bits(7)]
    pub reserved1: u8,

    /// Bits 12–51: PML4 physical base >> 12.
    #[bits(40)]
    pml4_base_4k: u64,

    /// Bits 52–63: Reserved.
    #[bits(12)]
    pub reserved2: u16,
}

impl Cr3 {
    /// Create a `Cr3` value pointing at a 4 KiB aligned PML4, caching enabled.
    #[must_use]
    pub fn from_pml4_phys(pml4_phys: PhysicalAddress) -> Self {
        debug_assert!(pml4_phys.is_page_aligned(), "PML4 base must be 4K-aligned");
        Self::new().with_pml4_base_4k(pml4_phys.as_u64() >> 12)
    }

    /// Return the full physical address of the PML4 base.
    #[must_use]
    pub fn pml4_phys(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.pml4_base_4k() << 12)
    }
}

#[cfg(feature = "asm")]
impl LoadRegisterUnsafe for Cr3 {
    unsafe fn load_unsafe() -> Self {
        let cr3: u64;
        unsafe {
            core::arch::asm!("mov {}, cr3", out(reg) cr3, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(cr3)
    }
}

#[cfg(feature = "asm")]
impl StoreRegisterUnsafe for Cr3 {
    unsafe fn store_unsafe(self) {
        let cr3 = self.into_bits();
        unsafe {
            core::arch::asm!("mov cr3, {}", in(reg) cr3, options(nostack, preserves_flags));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pml4_round_trip_keeps_flags_clear() {
        let cr3 = Cr3::from_pml4_phys(PhysicalAddress::new(0x0012_3000));
        assert_eq!(cr3.into_bits(), 0x0012_3000);
        assert_eq!(cr3.pml4_phys().as_u64(), 0x0012_3000);
        assert!(!cr3.pwt() && !cr3.pcd());
    }
}
