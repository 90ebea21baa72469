use bitfield_struct::bitfield;
use kernel_memory_addresses::PhysicalAddress;

/// A single 64-bit x86-64 page-table entry, valid at every paging level.
///
/// | Bits  | Name          | Meaning |
/// |-------|---------------|---------|
/// | 0     | `P`           | Present |
/// | 1     | `RW`          | Writable |
/// | 2     | `US`          | User accessible |
/// | 3     | `PWT`         | Write-through |
/// | 4     | `PCD`         | Cache disable |
/// | 5     | `A`           | Accessed |
/// | 6     | `D`           | Dirty (leaf) |
/// | 7     | `PS`          | Large page (PDPTE/PDE) |
/// | 8     | `G`           | Global (leaf) |
/// | 9–11  | avail         | OS use |
/// | 12–51 | address       | Frame number |
/// | 52–62 | avail         | OS use |
/// | 63    | `NX`          | No execute |
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct PageTableEntry {
    pub present: bool,
    pub writable: bool,
    pub user_access: bool,
    pub write_through: bool,
    pub cache_disabled: bool,
    pub accessed: bool,
    pub dirty: bool,
    pub large_page: bool,
    pub global: bool,

    #[bits(3)]
    pub os_available_low: u8,

    /// Physical frame number (address bits 51:12).
    #[bits(40)]
    frame_number: u64,

    #[bits(11)]
    pub os_available_high: u16,

    pub no_execute: bool,
}

const _: () = assert!(size_of::<PageTableEntry>() == 8);

impl PageTableEntry {
    /// Stores `pa`'s frame number. Every other bit of the entry is kept.
    ///
    /// Address bits above 51 are discarded.
    #[inline]
    pub const fn set_physical_address(&mut self, pa: PhysicalAddress) {
        self.set_frame_number((pa.as_u64() >> 12) & ((1 << 40) - 1));
    }

    #[inline]
    #[must_use]
    pub const fn with_physical_address(mut self, pa: PhysicalAddress) -> Self {
        self.set_physical_address(pa);
        self
    }

    #[inline]
    #[must_use]
    pub const fn physical_address(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.frame_number() << 12)
    }

    /// Marks the entry as a kernel read/write mapping of `pa`, keeping all
    /// other bits.
    #[inline]
    pub const fn make_present_rw(&mut self, pa: PhysicalAddress) {
        self.set_physical_address(pa);
        self.set_present(true);
        self.set_writable(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_update_keeps_flags() {
        let mut e = PageTableEntry::new()
            .with_present(true)
            .with_accessed(true)
            .with_no_execute(true)
            .with_os_available_low(0b101);
        e.set_physical_address(PhysicalAddress::new(0x1234_5000));
        assert!(e.present() && e.accessed() && e.no_execute());
        assert_eq!(e.os_available_low(), 0b101);
        assert_eq!(e.physical_address().as_u64(), 0x1234_5000);
    }

    #[test]
    fn frame_number_masked_to_40_bits() {
        // Bits 12..52 survive, bits 52..64 would land in flag fields.
        let e = PageTableEntry::new().with_physical_address(PhysicalAddress::new(0xFFFF_F000_0000_1000));
        assert_eq!(e.physical_address().as_u64(), 0x000F_F000_0000_1000);
        assert!(!e.no_execute());
        assert_eq!(e.os_available_high(), 0);
    }

    #[test]
    fn low_offset_bits_dropped() {
        let e = PageTableEntry::new().with_physical_address(PhysicalAddress::new(0x5FFF));
        assert_eq!(e.physical_address().as_u64(), 0x5000);
        assert!(!e.present());
    }

    #[test]
    fn present_rw_encoding() {
        let mut e = PageTableEntry::new();
        e.make_present_rw(PhysicalAddress::new(0x30_0000));
        assert_eq!(e.into_bits(), 0x30_0003);
    }
}
