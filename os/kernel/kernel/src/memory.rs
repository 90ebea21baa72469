//! # Physical and Virtual Memory Bring-up
//!
//! ```text
//! EFI memory map ─► PageFrameAllocator (bitmap in largest free region)
//!                     ├─ lock kernel image (__kernel_start .. __kernel_end)
//!                     └─ AddressSpace::create
//!                          ├─ identity map 0 .. total RAM
//!                          ├─ identity map framebuffer (+1 page)
//!                          └─ CR3 ◄─ PML4
//! ```
//!
//! Everything here runs exactly once, with interrupts disabled, while the
//! firmware's identity mapping is still active.

use kernel_alloc::PageFrameAllocator;
use kernel_info::boot::KernelBootInfo;
use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress};
use kernel_vmem::{AddressSpace, IdentityMapper};
use log::{debug, info};

unsafe extern "C" {
    /// First byte of the loaded kernel image (see `kernel.ld`).
    static __kernel_start: u8;
    /// One past the last byte of the loaded kernel image.
    static __kernel_end: u8;
}

/// Allocator and page-table root handed back to bring-up.
pub struct MemorySetup {
    pub allocator: PageFrameAllocator<'static>,
    pub pml4: PhysicalAddress,
}

/// Takes over physical memory and switches to the kernel's own page tables.
///
/// # Panics
/// On every failure: there is nothing to fall back to this early.
pub fn memory_setup(bi: &KernelBootInfo) -> MemorySetup {
    // SAFETY: the loader keeps the memory map in loader data, which the
    // allocator reserves and the bitmap never overlaps.
    let map = unsafe { bi.mmap.as_map() };
    debug!(
        "memory map: {} descriptors, stride {} bytes",
        map.len(),
        bi.mmap.descriptor_size
    );

    let mut allocator = PageFrameAllocator::from_memory_map(&map, |base, len| {
        // SAFETY: `base` is the start of the largest conventional region,
        // identity-mapped by firmware and owned by nobody yet.
        unsafe { core::slice::from_raw_parts_mut(base.as_mut_ptr::<u8>(), len) }
    })
    .unwrap_or_else(|e| panic!("cannot initialize page-frame allocator: {e}"));

    lock_kernel_image(&mut allocator);

    let space = AddressSpace::create(&IdentityMapper, &mut allocator)
        .unwrap_or_else(|e| panic!("cannot create kernel address space: {e}"));

    let total = allocator.total_bytes();
    let pages = space
        .identity_map_range(&mut allocator, PhysicalAddress::zero(), PhysicalAddress::new(total))
        .unwrap_or_else(|e| panic!("identity-mapping RAM failed: {e}"));
    info!("identity-mapped {pages} pages of RAM ({} MiB)", total / 1024 / 1024);

    let fb_base = PhysicalAddress::new(bi.framebuffer.base);
    let fb_size = bi.framebuffer.size;
    allocator.lock_pages(fb_base, fb_size / PAGE_SIZE + 1);
    let pages = space
        .identity_map_range(&mut allocator, fb_base, fb_base + fb_size + PAGE_SIZE)
        .unwrap_or_else(|e| panic!("identity-mapping the framebuffer failed: {e}"));
    debug!("framebuffer at {fb_base}: {pages} pages mapped");

    // SAFETY: the new tree identity-maps all RAM, which holds the kernel
    // image, the boot stack, the bitmap and the tables themselves.
    unsafe { space.activate() };

    info!(
        "paging active, PML4 at {}; {} KiB free",
        space.root(),
        allocator.free_bytes() / 1024
    );

    MemorySetup {
        pml4: space.root(),
        allocator,
    }
}

fn lock_kernel_image(allocator: &mut PageFrameAllocator<'_>) {
    // SAFETY: only the symbol addresses are taken.
    let (start, end) = unsafe { (&raw const __kernel_start as u64, &raw const __kernel_end as u64) };
    let (start, end) = (PhysicalAddress::new(start), PhysicalAddress::new(end));
    let pages = (end.align_up() - start.align_down()) / PAGE_SIZE;
    allocator.lock_pages(start.align_down(), pages);
    debug!("kernel image {start} .. {end} locked ({pages} pages)");
}
