use crate::msr::Msr;
use crate::{LoadRegisterUnsafe, StoreRegisterUnsafe};
use bitfield_struct::bitfield;
use kernel_memory_addresses::PhysicalAddress;

/// `IA32_APIC_BASE`: Local APIC base and mode (MSR `0x1B`).
///
/// ```text
///  63      52 51                    12 11  10  9  8  7     0
/// +----------+------------------------+---+---+--+---+-------+
/// | reserved |  APIC base (4K frame)  |EN |EXT|  |BSP| rsvd  |
/// +----------+------------------------+---+---+--+---+-------+
/// ```
#[bitfield(u64, order = Lsb)]
#[derive(PartialEq, Eq)]
pub struct Ia32ApicBase {
    #[bits(8)]
    _reserved0: u8,

    /// Bit 8: set on the bootstrap processor.
    #[bits(access = RO)]
    pub bsp: bool,

    #[bits(1)]
    _reserved9: u8,

    /// Bit 10: x2APIC mode enable (EXTD).
    pub x2apic_enable: bool,

    /// Bit 11: APIC global enable (EN).
    pub global_enable: bool,

    /// Bits 12–51: physical base of the xAPIC register page >> 12.
    #[bits(40)]
    base_4k: u64,

    #[bits(12)]
    _reserved52: u16,
}

impl Ia32ApicBase {
    /// MSR index for `IA32_APIC_BASE`.
    pub const IA32_APIC_BASE: u32 = 0x1B;

    /// The MSR.
    pub const MSR: Msr = Msr::new(Self::IA32_APIC_BASE);

    /// Physical address of the xAPIC register page.
    #[must_use]
    pub const fn base(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.base_4k() << 12)
    }

    /// The value to write for plain xAPIC operation: x2APIC off, then enabled.
    ///
    /// The base address and BSP flag are carried over unchanged.
    #[must_use]
    pub const fn xapic_enabled(self) -> Self {
        self.with_x2apic_enable(false).with_global_enable(true)
    }
}

#[cfg(feature = "asm")]
impl LoadRegisterUnsafe for Ia32ApicBase {
    unsafe fn load_unsafe() -> Self {
        Self::from_bits(unsafe { Self::MSR.load_raw() })
    }
}

#[cfg(feature = "asm")]
impl StoreRegisterUnsafe for Ia32ApicBase {
    unsafe fn store_unsafe(self) {
        unsafe { Self::MSR.store_raw(self.into_bits()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typical_bsp_value() {
        let v = Ia32ApicBase::from_bits(0xFEE0_0900);
        assert!(v.bsp());
        assert!(v.global_enable());
        assert!(!v.x2apic_enable());
        assert_eq!(v.base().as_u64(), 0xFEE0_0000);
    }

    #[test]
    fn xapic_enable_clears_extd_and_sets_en() {
        let v = Ia32ApicBase::from_bits(0xFEE0_0000 | (1 << 8) | (1 << 10));
        let w = v.xapic_enabled();
        assert_eq!(w.into_bits(), 0xFEE0_0000 | (1 << 8) | (1 << 11));
    }
}
