//! # Kernel Boot Information

use crate::efi::MemoryMap;

/// Kernel function pointer.
///
/// # ABI
/// The loader calls the kernel with the System V calling convention; the
/// single argument arrives in `rdi`.
pub type KernelEntryFn = extern "sysv64" fn(*const KernelBootInfo) -> !;

/// Information the kernel needs right after `ExitBootServices`.
///
/// Keep this `#[repr(C)]` and use fixed-size integers at the ABI boundary.
#[repr(C)]
#[derive(Clone, Debug)]
pub struct KernelBootInfo {
    /// Linear framebuffer from GOP.
    pub framebuffer: FramebufferInfo,

    /// PSF1 console font loaded from the boot volume.
    pub font: Psf1Font,

    /// Raw UEFI memory map.
    pub mmap: MemoryMapInfo,

    /// Physical address of the ACPI RSDP, or 0 if the firmware has none.
    pub rsdp_addr: u64,
}

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct FramebufferInfo {
    /// Linear framebuffer base address (physical).
    pub base: u64,

    /// Total framebuffer size in bytes.
    pub size: u64,

    /// Visible width in pixels.
    pub width: u32,

    /// Visible height in pixels.
    pub height: u32,

    /// Pixels per scanline. May be >= width due to padding.
    pub pixels_per_scanline: u32,
}

/// PSF1 font header as stored in the font file.
#[repr(C)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Psf1Header {
    pub magic: [u8; 2],
    pub mode: u8,
    pub char_size: u8,
}

impl Psf1Header {
    pub const MAGIC: [u8; 2] = [0x36, 0x04];

    /// Mode bit selecting a 512-glyph font.
    pub const MODE_512: u8 = 0x01;

    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.magic[0] == Self::MAGIC[0] && self.magic[1] == Self::MAGIC[1]
    }

    #[must_use]
    pub const fn glyph_count(&self) -> usize {
        if self.mode & Self::MODE_512 != 0 { 512 } else { 256 }
    }

    /// Size of the glyph table in bytes (`char_size` bytes per glyph).
    #[must_use]
    pub const fn glyph_table_len(&self) -> usize {
        self.glyph_count() * self.char_size as usize
    }
}

const _: () = assert!(size_of::<Psf1Header>() == 4);

/// Console font hand-off: header and glyph table as physical pointers.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct Psf1Font {
    pub header: u64,
    pub glyphs: u64,
}

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct MemoryMapInfo {
    /// Pointer to the raw UEFI memory map buffer.
    pub map: u64,

    /// Length of the memory map buffer in bytes.
    pub map_size: u64,

    /// Distance between consecutive descriptors in bytes.
    pub descriptor_size: u64,
}

impl MemoryMapInfo {
    /// Borrows the raw memory map as a [`MemoryMap`] view.
    ///
    /// # Safety
    /// `map .. map + map_size` must be readable for `'a` (identity-mapped
    /// and not overwritten, e.g. by the page-frame bitmap).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub unsafe fn as_map<'a>(&self) -> MemoryMap<'a> {
        let bytes = if self.map == 0 || self.map_size == 0 {
            &[][..]
        } else {
            unsafe { core::slice::from_raw_parts(self.map as *const u8, self.map_size as usize) }
        };
        MemoryMap::new(bytes, self.descriptor_size as usize)
    }
}
