use crate::Bitmap;
use kernel_info::efi::MemoryMap;
use kernel_memory_addresses::{PAGE_SIZE, PageFrame, PhysicalAddress};
use kernel_vmem::FrameAlloc;
use log::{debug, info};

/// Reasons the allocator cannot be set up from a memory map.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum MemoryMapError {
    #[error("memory map has no conventional memory")]
    NoConventionalMemory,

    #[error("bitmap needs {needed} bytes but the largest free region has {available}")]
    BitmapDoesNotFit { needed: u64, available: u64 },
}

/// Bitmap-backed page-frame allocator.
pub struct PageFrameAllocator<'a> {
    bitmap: Bitmap<'a>,
    free_bytes: u64,
    used_bytes: u64,
    reserved_bytes: u64,
    /// Next candidate page index for [`request_page`](Self::request_page).
    cursor: u64,
}

impl<'a> PageFrameAllocator<'a> {
    /// Creates an allocator tracking `total_bytes` of memory, all free.
    ///
    /// `storage` must hold at least
    /// [`Bitmap::storage_bytes(total_bytes / 4096)`](Bitmap::storage_bytes)
    /// bytes; it is zero-filled.
    pub fn new(storage: &'a mut [u8], total_bytes: u64) -> Self {
        Self {
            bitmap: Bitmap::new_zeroed(storage, total_bytes / PAGE_SIZE),
            free_bytes: total_bytes,
            used_bytes: 0,
            reserved_bytes: 0,
            cursor: 0,
        }
    }

    /// Builds the allocator from the firmware memory map.
    ///
    /// `storage_at(base, len)` must return the `len` bytes of RAM at physical
    /// address `base`; under the firmware identity map that is a slice over
    /// the raw pointer.
    ///
    /// 1. total = sum of every descriptor's size, all initially free
    /// 2. bitmap placed at the base of the largest conventional region
    /// 3. every non-conventional descriptor reserved
    /// 4. the bitmap's own pages (`len / 4096 + 1`) locked
    ///
    /// # Errors
    /// See [`MemoryMapError`].
    pub fn from_memory_map(
        map: &MemoryMap<'_>,
        storage_at: impl FnOnce(PhysicalAddress, usize) -> &'a mut [u8],
    ) -> Result<Self, MemoryMapError> {
        let total = map.total_memory_bytes();
        let region = map
            .largest_conventional()
            .ok_or(MemoryMapError::NoConventionalMemory)?;

        let bitmap_len = Bitmap::storage_bytes(total / PAGE_SIZE);
        if bitmap_len as u64 > region.size_bytes() {
            return Err(MemoryMapError::BitmapDoesNotFit {
                needed: bitmap_len as u64,
                available: region.size_bytes(),
            });
        }

        let bitmap_base = PhysicalAddress::new(region.phys_start);
        debug!(
            "page bitmap: {bitmap_len} bytes at {bitmap_base} ({} pages tracked)",
            total / PAGE_SIZE
        );
        let mut alloc = Self::new(storage_at(bitmap_base, bitmap_len), total);

        for desc in map.descriptors().filter(|d| !d.is_conventional()) {
            alloc.reserve_pages(PhysicalAddress::new(desc.phys_start), desc.page_count);
        }
        alloc.lock_pages(bitmap_base, bitmap_len as u64 / PAGE_SIZE + 1);

        info!(
            "physical memory: {} KiB total, {} KiB free, {} KiB used, {} KiB reserved",
            total / 1024,
            alloc.free_bytes / 1024,
            alloc.used_bytes / 1024,
            alloc.reserved_bytes / 1024
        );
        Ok(alloc)
    }

    #[inline]
    #[must_use]
    pub const fn free_bytes(&self) -> u64 {
        self.free_bytes
    }

    #[inline]
    #[must_use]
    pub const fn used_bytes(&self) -> u64 {
        self.used_bytes
    }

    #[inline]
    #[must_use]
    pub const fn reserved_bytes(&self) -> u64 {
        self.reserved_bytes
    }

    /// `free + used + reserved`.
    #[inline]
    #[must_use]
    pub const fn total_bytes(&self) -> u64 {
        self.free_bytes
            .wrapping_add(self.used_bytes)
            .wrapping_add(self.reserved_bytes)
    }

    #[must_use]
    pub const fn bitmap(&self) -> &Bitmap<'a> {
        &self.bitmap
    }

    #[must_use]
    pub fn is_locked(&self, pa: PhysicalAddress) -> bool {
        self.bitmap.get(pa.frame().index())
    }

    /// Marks a page as used. No-op if it is already locked.
    pub fn lock_page(&mut self, pa: PhysicalAddress) {
        let index = pa.frame().index();
        if self.bitmap.get(index) || !self.bitmap.set(index, true) {
            return;
        }
        self.free_bytes = self.free_bytes.wrapping_sub(PAGE_SIZE);
        self.used_bytes = self.used_bytes.wrapping_add(PAGE_SIZE);
    }

    /// Returns a used page to the pool. No-op if it is already free.
    ///
    /// Freeing below the cursor rewinds it so the page is found again.
    pub fn free_page(&mut self, pa: PhysicalAddress) {
        let index = pa.frame().index();
        if !self.bitmap.get(index) || !self.bitmap.set(index, false) {
            return;
        }
        self.free_bytes = self.free_bytes.wrapping_add(PAGE_SIZE);
        self.used_bytes = self.used_bytes.wrapping_sub(PAGE_SIZE);
        self.cursor = self.cursor.min(index);
    }

    /// Marks a page as reserved. No-op if it is already locked.
    pub fn reserve_page(&mut self, pa: PhysicalAddress) {
        let index = pa.frame().index();
        if self.bitmap.get(index) || !self.bitmap.set(index, true) {
            return;
        }
        self.free_bytes = self.free_bytes.wrapping_sub(PAGE_SIZE);
        self.reserved_bytes = self.reserved_bytes.wrapping_add(PAGE_SIZE);
    }

    /// Releases a reserved page. No-op if it is already free.
    pub fn unreserve_page(&mut self, pa: PhysicalAddress) {
        let index = pa.frame().index();
        if !self.bitmap.get(index) || !self.bitmap.set(index, false) {
            return;
        }
        self.free_bytes = self.free_bytes.wrapping_add(PAGE_SIZE);
        self.reserved_bytes = self.reserved_bytes.wrapping_sub(PAGE_SIZE);
        self.cursor = self.cursor.min(index);
    }

    fn for_each_page(&mut self, start: PhysicalAddress, count: u64, f: fn(&mut Self, PhysicalAddress)) {
        let mut frame = start.frame();
        for _ in 0..count {
            f(self, frame.base());
            frame = frame.next();
        }
    }

    pub fn lock_pages(&mut self, start: PhysicalAddress, count: u64) {
        self.for_each_page(start, count, Self::lock_page);
    }

    pub fn free_pages(&mut self, start: PhysicalAddress, count: u64) {
        self.for_each_page(start, count, Self::free_page);
    }

    pub fn reserve_pages(&mut self, start: PhysicalAddress, count: u64) {
        self.for_each_page(start, count, Self::reserve_page);
    }

    pub fn unreserve_pages(&mut self, start: PhysicalAddress, count: u64) {
        self.for_each_page(start, count, Self::unreserve_page);
    }

    /// Locks and returns the first free page at or after the cursor.
    ///
    /// Returns `None` once the scan reaches the end of the bitmap.
    pub fn request_page(&mut self) -> Option<PhysicalAddress> {
        let index = self.bitmap.next_clear(self.cursor)?;
        self.cursor = index;
        let pa = PageFrame::from_index(index).base();
        self.lock_page(pa);
        Some(pa)
    }
}

impl FrameAlloc for PageFrameAllocator<'_> {
    fn alloc_4k(&mut self) -> Option<PhysicalAddress> {
        self.request_page()
    }
}
