//! # Virtual Memory Support
//!
//! Four-level x86-64 paging with 4 KiB pages only, as used by the kernel's
//! identity map.
//!
//! ## What you get
//! - A [`PageTableEntry`] bitfield and a 4 KiB-aligned [`PageTable`].
//! - An [`AddressSpace`] rooted at a PML4 that can [`map`](AddressSpace::map)
//!   single pages, identity-map ranges, [`translate`](AddressSpace::translate)
//!   addresses and load itself into CR3.
//! - The two seams the walk needs: [`FrameAlloc`] hands out zero-able
//!   physical frames for new tables, [`PhysMapper`] turns a table's physical
//!   address into a reference.
//!
//! ## x86-64 Virtual Address → Physical Address Walk
//!
//! ```text
//! | 47‒39 | 38‒30 | 29‒21 | 20‒12 | 11‒0   |
//! |  PML4 |  PDPT |   PD  |   PT  | Offset |
//! ```
//!
//! ```text
//!  CR3 ─► PML4[i4] ─► PDPT[i3] ─► PD[i2] ─► PT[i1] ─► 4 KiB frame + offset
//! ```
//!
//! Every table holds 512 eight-byte entries. Missing intermediate tables are
//! allocated on demand, zeroed, and linked with `present | writable`. Leaves
//! get `present | writable` as well; the kernel does not use user, global,
//! no-execute or large-page mappings.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod address_space;
mod entry;
mod table;

pub use crate::address_space::{AddressSpace, Walk};
pub use crate::entry::PageTableEntry;
pub use crate::table::{PageTable, TableLevel};

use kernel_memory_addresses::PhysicalAddress;

/// Errors raised while editing page tables.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum VmemError {
    /// No frame was available for a missing table.
    #[error("out of physical memory while allocating a {0} table")]
    OutOfMemory(TableLevel),
}

/// Source of **physical** 4 KiB frames for page tables.
///
/// Returned frames must be 4 KiB aligned. Returns `None` when memory is
/// exhausted.
pub trait FrameAlloc {
    fn alloc_4k(&mut self) -> Option<PhysicalAddress>;
}

/// Converts physical addresses to references in the current address space.
pub trait PhysMapper {
    /// # Safety
    /// - `pa` must be mapped writable in the current page tables.
    /// - The bytes at `pa` must be a valid `T` and must not be aliased
    ///   mutably elsewhere for `'a`.
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T;
}

/// Physical addresses are usable as pointers unchanged.
///
/// Valid under the firmware's identity map and under the kernel's own one.
#[derive(Debug, Default, Copy, Clone)]
pub struct IdentityMapper;

impl PhysMapper for IdentityMapper {
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        unsafe { &mut *pa.as_mut_ptr::<T>() }
    }
}
