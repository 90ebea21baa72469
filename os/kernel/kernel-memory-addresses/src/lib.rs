//! # Physical and Virtual Address Types
//!
//! Strongly typed wrappers for the raw 64-bit addresses that flow between the
//! page-frame allocator, the page-table code and the firmware table parsers.
//!
//! ## Overview
//!
//! The kernel only ever works in 4 KiB granularity, so the vocabulary is small:
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PhysicalAddress`] | A byte address in physical memory or an MMIO window. |
//! | [`VirtualAddress`] | A byte address as seen through the active page tables. |
//! | [`PageFrame`] | The index of a 4 KiB physical page (`address >> 12`). |
//! | [`TableIndices`] | A virtual address decomposed into the four paging-level indices plus offset. |
//!
//! ## Virtual address decomposition
//!
//! ```text
//!  63        48 47      39 38      30 29      21 20      12 11         0
//! +------------+----------+----------+----------+----------+------------+
//! | sign ext.  |  PML4    |  PDPT    |   PD     |   PT     |   offset   |
//! +------------+----------+----------+----------+----------+------------+
//! ```
//!
//! Each index is 9 bits wide (0..=511); the offset is 12 bits.
//!
//! ## Typical Usage
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let va = VirtualAddress::new(0x0000_0000_0040_3123);
//! let idx = va.indices();
//! assert_eq!((idx.pml4, idx.pdpt, idx.pd, idx.pt), (0, 0, 2, 3));
//! assert_eq!(idx.offset, 0x123);
//!
//! let pa = PhysicalAddress::new(0x20_1000);
//! assert_eq!(pa.frame().index(), 0x201);
//! assert_eq!(pa.frame().base(), pa);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod page_frame;
mod physical_address;
mod table_indices;
mod virtual_address;

pub use page_frame::PageFrame;
pub use physical_address::PhysicalAddress;
pub use table_indices::TableIndices;
pub use virtual_address::VirtualAddress;

/// Size of a base page in bytes.
pub const PAGE_SIZE: u64 = 4096;

/// `log2(PAGE_SIZE)`.
pub const PAGE_SHIFT: u32 = 12;

/// Number of entries in one page table at any paging level.
pub const ENTRIES_PER_TABLE: usize = 512;

/// Round `value` down to a multiple of `align` (power of two).
#[inline]
#[must_use]
pub const fn align_down(value: u64, align: u64) -> u64 {
    debug_assert!(align.is_power_of_two());
    value & !(align - 1)
}

/// Round `value` up to a multiple of `align` (power of two).
///
/// Saturates to the highest aligned value instead of wrapping.
#[inline]
#[must_use]
pub const fn align_up(value: u64, align: u64) -> u64 {
    debug_assert!(align.is_power_of_two());
    match value.checked_add(align - 1) {
        Some(v) => v & !(align - 1),
        None => align_down(u64::MAX, align),
    }
}

/// Number of 4 KiB pages needed to cover `bytes` bytes.
#[inline]
#[must_use]
pub const fn pages_for(bytes: u64) -> u64 {
    bytes.div_ceil(PAGE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_helpers() {
        assert_eq!(align_down(0x1FFF, PAGE_SIZE), 0x1000);
        assert_eq!(align_up(0x1001, PAGE_SIZE), 0x2000);
        assert_eq!(align_up(0x2000, PAGE_SIZE), 0x2000);
        assert_eq!(align_up(u64::MAX, PAGE_SIZE), 0xFFFF_FFFF_FFFF_F000);
    }

    #[test]
    fn pages_for_rounds_up() {
        assert_eq!(pages_for(0), 0);
        assert_eq!(pages_for(1), 1);
        assert_eq!(pages_for(4096), 1);
        assert_eq!(pages_for(4097), 2);
    }
}
