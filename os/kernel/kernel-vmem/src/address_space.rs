//! # Address Space (x86-64, PML4-rooted)
//!
//! Builds and inspects one four-level translation tree.
//!
//! - [`AddressSpace::map`] installs one 4 KiB translation, creating missing
//!   intermediate tables.
//! - [`AddressSpace::identity_map_range`] maps every page of a physical range
//!   onto the same virtual address.
//! - [`AddressSpace::translate`] / [`AddressSpace::walk`] read the tree back.
//! - [`AddressSpace::activate`] loads CR3.
//!
//! ## Safety
//!
//! Changing translations of the *active* space needs TLB maintenance
//! (`invlpg` or a CR3 reload). The kernel only edits the tree before it is
//! activated.

use crate::{FrameAlloc, PageTable, PageTableEntry, PhysMapper, TableLevel, VmemError};
use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress, VirtualAddress, align_down, align_up};

/// Handle to a single address space.
pub struct AddressSpace<'m, M: PhysMapper> {
    root: PhysicalAddress,
    mapper: &'m M,
}

/// Entries visited while translating one address, root first.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Walk {
    entries: [PageTableEntry; 4],
    depth: usize,
}

impl Walk {
    /// Entries read so far; the last one is the first non-present entry
    /// unless the walk reached the leaf.
    #[must_use]
    pub fn entries(&self) -> &[PageTableEntry] {
        &self.entries[..self.depth]
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.depth == 4 && self.entries[3].present()
    }

    /// Level at which translation stopped, if it did.
    #[must_use]
    pub fn missing_level(&self) -> Option<TableLevel> {
        if self.is_complete() {
            None
        } else {
            Some(TableLevel::WALK[self.depth.saturating_sub(1)])
        }
    }
}

impl<'m, M: PhysMapper> AddressSpace<'m, M> {
    /// Wrap an existing PML4 frame.
    #[inline]
    pub const fn from_root(mapper: &'m M, root: PhysicalAddress) -> Self {
        Self { root, mapper }
    }

    /// Allocate and zero a fresh PML4.
    ///
    /// # Errors
    /// [`VmemError::OutOfMemory`] if `alloc` has no frame left.
    pub fn create<A: FrameAlloc>(mapper: &'m M, alloc: &mut A) -> Result<Self, VmemError> {
        let root = alloc
            .alloc_4k()
            .ok_or(VmemError::OutOfMemory(TableLevel::Pml4))?;
        let space = Self::from_root(mapper, root);
        space.table(root).zero();
        Ok(space)
    }

    /// Physical address of the PML4.
    #[inline]
    pub const fn root(&self) -> PhysicalAddress {
        self.root
    }

    #[inline]
    #[allow(clippy::mut_from_ref)]
    fn table(&self, pa: PhysicalAddress) -> &mut PageTable {
        // SAFETY: only frames handed out for tables (or the root) reach here.
        unsafe { self.mapper.phys_to_mut::<PageTable>(pa) }
    }

    /// Follow `table[index]`, allocating and zeroing the next table if the
    /// entry is not present.
    fn descend<A: FrameAlloc>(
        &self,
        alloc: &mut A,
        table: PhysicalAddress,
        index: usize,
        next_level: TableLevel,
    ) -> Result<PhysicalAddress, VmemError> {
        let entry = self.table(table).entry_mut(index);
        if entry.present() {
            return Ok(entry.physical_address());
        }

        let frame = alloc
            .alloc_4k()
            .ok_or(VmemError::OutOfMemory(next_level))?;
        self.table(frame).zero();

        let entry = self.table(table).entry_mut(index);
        entry.make_present_rw(frame);
        Ok(frame)
    }

    /// Map the 4 KiB page at `va` onto the frame at `pa`.
    ///
    /// Offsets below 4 KiB in either address are ignored. Intermediate tables
    /// that already exist are reused; their entries are not modified. The
    /// leaf gets `pa`'s frame plus `present | writable`, keeping its other
    /// bits.
    ///
    /// # Errors
    /// [`VmemError::OutOfMemory`] if a table was needed but `alloc` had no
    /// frame. Tables created before the failure stay linked.
    pub fn map<A: FrameAlloc>(
        &self,
        alloc: &mut A,
        va: VirtualAddress,
        pa: PhysicalAddress,
    ) -> Result<(), VmemError> {
        let idx = va.indices();
        let pdpt = self.descend(alloc, self.root, idx.pml4, TableLevel::Pdpt)?;
        let pd = self.descend(alloc, pdpt, idx.pdpt, TableLevel::Pd)?;
        let pt = self.descend(alloc, pd, idx.pd, TableLevel::Pt)?;
        self.table(pt).entry_mut(idx.pt).make_present_rw(pa.align_down());
        Ok(())
    }

    /// Identity-map every page overlapping `[start, end)`.
    ///
    /// # Errors
    /// See [`map`](Self::map).
    pub fn identity_map_range<A: FrameAlloc>(
        &self,
        alloc: &mut A,
        start: PhysicalAddress,
        end: PhysicalAddress,
    ) -> Result<u64, VmemError> {
        let first = align_down(start.as_u64(), PAGE_SIZE);
        let last = align_up(end.as_u64(), PAGE_SIZE);
        let mut pages = 0;
        for addr in (first..last).step_by(4096) {
            self.map(alloc, VirtualAddress::new(addr), PhysicalAddress::new(addr))?;
            pages += 1;
        }
        Ok(pages)
    }

    /// Read the entries a hardware walk for `va` would visit.
    #[must_use]
    pub fn walk(&self, va: VirtualAddress) -> Walk {
        let mut walk = Walk {
            entries: [PageTableEntry::new(); 4],
            depth: 0,
        };
        let mut table = self.root;
        for index in va.indices().levels() {
            let entry = self.table(table).entry(index);
            walk.entries[walk.depth] = entry;
            walk.depth += 1;
            if !entry.present() {
                break;
            }
            table = entry.physical_address();
        }
        walk
    }

    /// Translate `va` through the tree, including its page offset.
    #[must_use]
    pub fn translate(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        let walk = self.walk(va);
        walk.is_complete()
            .then(|| walk.entries[3].physical_address() + va.page_offset())
    }

    /// Load CR3 with this space's root.
    ///
    /// # Safety
    /// The tree must map the currently executing code, the stack and every
    /// structure the kernel touches next.
    #[cfg(feature = "asm")]
    pub unsafe fn activate(&self) {
        use kernel_registers::StoreRegisterUnsafe;
        use kernel_registers::cr3::Cr3;

        log::debug!("loading CR3 with PML4 at {}", self.root);
        unsafe { Cr3::from_pml4_phys(self.root).store_unsafe() };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{BumpAlloc, TestPhys};

    fn setup(frames: usize) -> (TestPhys, BumpAlloc) {
        let phys = TestPhys::with_frames(frames);
        let alloc = BumpAlloc::new(0, (frames as u64) << 12);
        (phys, alloc)
    }

    #[test]
    fn map_creates_three_tables_and_rw_leaf() {
        let (phys, mut alloc) = setup(16);
        let space = AddressSpace::create(&phys, &mut alloc).unwrap();
        assert_eq!(alloc.handed_out, 1);

        let va = VirtualAddress::new(0x0000_0000_4020_1000);
        let pa = PhysicalAddress::new(0x0000_0000_0030_0000);
        space.map(&mut alloc, va, pa).unwrap();
        assert_eq!(alloc.handed_out, 4);

        let walk = space.walk(va);
        assert!(walk.is_complete());
        for e in walk.entries() {
            assert!(e.present());
            assert!(e.writable());
            assert!(!e.user_access());
            assert!(!e.no_execute());
        }
        assert_eq!(walk.entries()[3].physical_address(), pa);
    }

    #[test]
    fn translate_adds_page_offset() {
        let (phys, mut alloc) = setup(16);
        let space = AddressSpace::create(&phys, &mut alloc).unwrap();
        space
            .map(&mut alloc, VirtualAddress::new(0x7000), PhysicalAddress::new(0x9000))
            .unwrap();
        assert_eq!(
            space.translate(VirtualAddress::new(0x7ABC)),
            Some(PhysicalAddress::new(0x9ABC))
        );
        assert_eq!(space.translate(VirtualAddress::new(0x8000)), None);
    }

    #[test]
    fn neighbours_share_tables() {
        let (phys, mut alloc) = setup(16);
        let space = AddressSpace::create(&phys, &mut alloc).unwrap();
        space
            .map(&mut alloc, VirtualAddress::new(0x20_0000), PhysicalAddress::new(0x20_0000))
            .unwrap();
        let after_first = alloc.handed_out;
        space
            .map(&mut alloc, VirtualAddress::new(0x20_1000), PhysicalAddress::new(0x20_1000))
            .unwrap();
        assert_eq!(alloc.handed_out, after_first);

        // Next 2 MiB region: one new PT only.
        space
            .map(&mut alloc, VirtualAddress::new(0x40_0000), PhysicalAddress::new(0x40_0000))
            .unwrap();
        assert_eq!(alloc.handed_out, after_first + 1);
    }

    #[test]
    fn remap_updates_leaf_address() {
        let (phys, mut alloc) = setup(16);
        let space = AddressSpace::create(&phys, &mut alloc).unwrap();
        let va = VirtualAddress::new(0x1000);
        space.map(&mut alloc, va, PhysicalAddress::new(0x5000)).unwrap();
        space.map(&mut alloc, va, PhysicalAddress::new(0x6000)).unwrap();
        assert_eq!(space.translate(va), Some(PhysicalAddress::new(0x6000)));
    }

    #[test]
    fn identity_range_round_trips() {
        let (phys, mut alloc) = setup(32);
        let space = AddressSpace::create(&phys, &mut alloc).unwrap();
        let pages = space
            .identity_map_range(&mut alloc, PhysicalAddress::new(0x10_0800), PhysicalAddress::new(0x10_4001))
            .unwrap();
        assert_eq!(pages, 5);
        for addr in (0x10_0000..0x10_5000).step_by(0x1000) {
            let va = VirtualAddress::new(addr + 0x10);
            assert_eq!(space.translate(va), Some(PhysicalAddress::new(addr + 0x10)));
        }
        assert_eq!(space.translate(VirtualAddress::new(0x10_5000)), None);
    }

    #[test]
    fn exhaustion_reports_level() {
        // Root + PDPT only; the PD allocation fails.
        let (phys, mut alloc) = setup(2);
        let space = AddressSpace::create(&phys, &mut alloc).unwrap();
        let err = space
            .map(&mut alloc, VirtualAddress::new(0x1000), PhysicalAddress::new(0x1000))
            .unwrap_err();
        assert_eq!(err, VmemError::OutOfMemory(TableLevel::Pd));
        assert_eq!(err.to_string(), "out of physical memory while allocating a PD table");

        let walk = space.walk(VirtualAddress::new(0x1000));
        assert_eq!(walk.missing_level(), Some(TableLevel::Pdpt));
    }

    #[test]
    fn fresh_tables_are_zeroed() {
        let (phys, mut alloc) = setup(8);
        let space = AddressSpace::create(&phys, &mut alloc).unwrap();
        space
            .map(&mut alloc, VirtualAddress::new(0), PhysicalAddress::new(0))
            .unwrap();
        let pml4 = unsafe { phys.phys_to_mut::<PageTable>(space.root()) };
        assert_eq!(pml4.present_count(), 1);
        let pdpt = unsafe { phys.phys_to_mut::<PageTable>(pml4.entry(0).physical_address()) };
        assert_eq!(pdpt.present_count(), 1);
    }
}
