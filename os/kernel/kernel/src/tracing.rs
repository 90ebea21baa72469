//! # Kernel Tracing helpers

use kernel_info::boot::{KernelBootInfo, Psf1Header};
use kernel_info::efi::EfiMemoryType;
use log::{debug, info};

pub fn trace_boot_info(boot_info: &KernelBootInfo) {
    info!(
        concat!(
            "Boot Info in Kernel:\n",
            "  BI ptr   = {bi:#018x}\n",
            "  MMAP ptr = {mmap_ptr:#018x}, size = {mmap_size}, desc size = {mmap_desc_size}, rsdp addr = {rsdp_addr:#x}\n",
            "  FB ptr   = {fb_ptr:#018x}, size = {fb_size}, width = {fb_width}, height = {fb_height}, stride = {fb_stride}\n",
            "  Font     = header {font_hdr:#018x}, glyphs {font_glyphs:#018x}"
        ),
        bi = core::ptr::from_ref(boot_info) as usize,
        mmap_ptr = boot_info.mmap.map,
        mmap_size = boot_info.mmap.map_size,
        mmap_desc_size = boot_info.mmap.descriptor_size,
        rsdp_addr = boot_info.rsdp_addr,
        fb_ptr = boot_info.framebuffer.base,
        fb_size = boot_info.framebuffer.size,
        fb_width = boot_info.framebuffer.width,
        fb_height = boot_info.framebuffer.height,
        fb_stride = boot_info.framebuffer.pixels_per_scanline,
        font_hdr = boot_info.font.header,
        font_glyphs = boot_info.font.glyphs,
    );

    if boot_info.font.header != 0 {
        // SAFETY: the loader hands over a valid header pointer or null.
        let header = unsafe { &*(boot_info.font.header as *const Psf1Header) };
        if header.is_valid() {
            debug!(
                "PSF1 font: {} glyphs of {} bytes",
                header.glyph_count(),
                header.char_size
            );
        } else {
            debug!("PSF1 font header has bad magic {:02x?}", header.magic);
        }
    }
}

/// Lists the firmware memory map, one line per descriptor.
pub fn trace_memory_map(boot_info: &KernelBootInfo) {
    // SAFETY: the map is still untouched at this point.
    let map = unsafe { boot_info.mmap.as_map() };
    for d in map.descriptors() {
        let name = d.kind().map_or("Unknown", EfiMemoryType::name);
        debug!(
            "  {:#014x} {:>8} pages  {name} ({})",
            d.phys_start, d.page_count, d.typ
        );
    }
    info!(
        "firmware reports {} KiB of memory in {} descriptors",
        map.total_memory_bytes() / 1024,
        map.len()
    );
}
