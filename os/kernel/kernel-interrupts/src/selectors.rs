//! # Segment selectors
//!
//! ```text
//!  15            3 2  1  0
//! +----------------+--+----+
//! |   Index[12:0]  |TI| RPL|
//! +----------------+--+----+  (TI=0 → GDT, TI=1 → LDT; RPL=0..3)
//! ```

use bitfield_struct::bitfield;

/// Raw 16-bit selector encoding (index/TI/RPL).
#[bitfield(u16)]
#[derive(Eq, PartialEq)]
pub struct SegmentSelector {
    /// Requested Privilege Level.
    #[bits(2)]
    pub rpl: u8,
    /// Table Indicator: 0 = GDT, 1 = LDT.
    pub ldt: bool,
    /// Descriptor index.
    #[bits(13)]
    pub index: u16,
}

impl SegmentSelector {
    /// A GDT selector.
    #[inline]
    #[must_use]
    pub const fn gdt(index: u16, rpl: u8) -> Self {
        Self::new().with_index(index).with_ldt(false).with_rpl(rpl)
    }
}

/// Kernel code, GDT index 1.
pub const KERNEL_CS: u16 = SegmentSelector::gdt(1, 0).into_bits();

/// Kernel data, GDT index 2.
pub const KERNEL_DS: u16 = SegmentSelector::gdt(2, 0).into_bits();

const _: () = {
    assert!(KERNEL_CS == 0x08);
    assert!(KERNEL_DS == 0x10);
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_matches_formula() {
        for index in [0u16, 1, 5, 0x1FFF] {
            for rpl in 0..4u8 {
                let s = SegmentSelector::gdt(index, rpl);
                assert_eq!(s.into_bits(), (index << 3) | u16::from(rpl));
            }
        }
        assert!(SegmentSelector::from_bits(0x0C).ldt());
    }
}
