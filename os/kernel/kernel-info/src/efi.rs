//! # UEFI Memory Map
//!
//! The firmware describes physical memory as an array of
//! `EFI_MEMORY_DESCRIPTOR` records. The array stride is reported separately
//! (`descriptor_size`) and is allowed to exceed the structure size, so the
//! records are decoded from raw bytes instead of being cast in place.

use core::fmt;

use crate::memory::EFI_PAGE_SIZE;

/// UEFI memory types (`EFI_MEMORY_TYPE`).
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EfiMemoryType {
    Reserved = 0,
    LoaderCode = 1,
    LoaderData = 2,
    BootServicesCode = 3,
    BootServicesData = 4,
    RuntimeServicesCode = 5,
    RuntimeServicesData = 6,
    Conventional = 7,
    Unusable = 8,
    AcpiReclaim = 9,
    AcpiNvs = 10,
    MemoryMappedIo = 11,
    MemoryMappedIoPortSpace = 12,
    PalCode = 13,
}

impl EfiMemoryType {
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::Reserved,
            1 => Self::LoaderCode,
            2 => Self::LoaderData,
            3 => Self::BootServicesCode,
            4 => Self::BootServicesData,
            5 => Self::RuntimeServicesCode,
            6 => Self::RuntimeServicesData,
            7 => Self::Conventional,
            8 => Self::Unusable,
            9 => Self::AcpiReclaim,
            10 => Self::AcpiNvs,
            11 => Self::MemoryMappedIo,
            12 => Self::MemoryMappedIoPortSpace,
            13 => Self::PalCode,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Reserved => "EfiReservedMemoryType",
            Self::LoaderCode => "EfiLoaderCode",
            Self::LoaderData => "EfiLoaderData",
            Self::BootServicesCode => "EfiBootServicesCode",
            Self::BootServicesData => "EfiBootServicesData",
            Self::RuntimeServicesCode => "EfiRuntimeServicesCode",
            Self::RuntimeServicesData => "EfiRuntimeServicesData",
            Self::Conventional => "EfiConventionalMemory",
            Self::Unusable => "EfiUnusableMemory",
            Self::AcpiReclaim => "EfiACPIReclaimMemory",
            Self::AcpiNvs => "EfiACPIMemoryNVS",
            Self::MemoryMappedIo => "EfiMemoryMappedIO",
            Self::MemoryMappedIoPortSpace => "EfiMemoryMappedIOPortSpace",
            Self::PalCode => "EfiPalCode",
        }
    }
}

impl fmt::Display for EfiMemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One decoded `EFI_MEMORY_DESCRIPTOR`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct EfiMemoryDescriptor {
    /// Raw type tag; see [`kind`](Self::kind).
    pub typ: u32,
    pub phys_start: u64,
    pub virt_start: u64,
    pub page_count: u64,
    pub attributes: u64,
}

impl EfiMemoryDescriptor {
    /// Size of the structure as defined by UEFI 2.x.
    pub const SIZE: usize = 40;

    #[must_use]
    pub const fn kind(&self) -> Option<EfiMemoryType> {
        EfiMemoryType::from_raw(self.typ)
    }

    #[must_use]
    pub const fn is_conventional(&self) -> bool {
        self.typ == EfiMemoryType::Conventional as u32
    }

    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.page_count * EFI_PAGE_SIZE
    }

    fn decode(raw: &[u8]) -> Self {
        let u32_at = |o: usize| u32::from_le_bytes([raw[o], raw[o + 1], raw[o + 2], raw[o + 3]]);
        let u64_at = |o: usize| {
            let mut b = [0u8; 8];
            b.copy_from_slice(&raw[o..o + 8]);
            u64::from_le_bytes(b)
        };
        Self {
            typ: u32_at(0),
            phys_start: u64_at(8),
            virt_start: u64_at(16),
            page_count: u64_at(24),
            attributes: u64_at(32),
        }
    }

    /// Writes the descriptor in firmware layout into `out`.
    ///
    /// Used by loaders and tests that synthesize a memory map.
    ///
    /// # Panics
    /// If `out` is shorter than [`SIZE`](Self::SIZE).
    pub fn encode(&self, out: &mut [u8]) {
        out[0..4].copy_from_slice(&self.typ.to_le_bytes());
        out[4..8].fill(0);
        out[8..16].copy_from_slice(&self.phys_start.to_le_bytes());
        out[16..24].copy_from_slice(&self.virt_start.to_le_bytes());
        out[24..32].copy_from_slice(&self.page_count.to_le_bytes());
        out[32..40].copy_from_slice(&self.attributes.to_le_bytes());
    }
}

/// Borrowed view over a raw memory map buffer.
#[derive(Copy, Clone)]
pub struct MemoryMap<'a> {
    bytes: &'a [u8],
    stride: usize,
}

impl<'a> MemoryMap<'a> {
    #[must_use]
    pub const fn new(bytes: &'a [u8], descriptor_size: usize) -> Self {
        Self {
            bytes,
            stride: descriptor_size,
        }
    }

    /// Number of descriptors (`map_size / descriptor_size`).
    ///
    /// A stride below the UEFI structure size yields an empty map.
    #[must_use]
    pub const fn len(&self) -> usize {
        if self.stride < EfiMemoryDescriptor::SIZE {
            0
        } else {
            self.bytes.len() / self.stride
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn descriptors(&self) -> impl Iterator<Item = EfiMemoryDescriptor> + 'a {
        let stride = self.stride;
        let bytes = self.bytes;
        (0..self.len()).map(move |i| {
            let at = i * stride;
            EfiMemoryDescriptor::decode(&bytes[at..at + EfiMemoryDescriptor::SIZE])
        })
    }

    /// Sum of `page_count * 4096` over every descriptor, regardless of type.
    #[must_use]
    pub fn total_memory_bytes(&self) -> u64 {
        self.descriptors().map(|d| d.size_bytes()).sum()
    }

    /// The conventional region with the most pages. The first one wins on ties.
    #[must_use]
    pub fn largest_conventional(&self) -> Option<EfiMemoryDescriptor> {
        self.descriptors()
            .filter(EfiMemoryDescriptor::is_conventional)
            .fold(None, |best: Option<EfiMemoryDescriptor>, d| match best {
                Some(b) if b.page_count >= d.page_count => Some(b),
                _ => Some(d),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(typ: EfiMemoryType, phys: u64, pages: u64) -> EfiMemoryDescriptor {
        EfiMemoryDescriptor {
            typ: typ as u32,
            phys_start: phys,
            virt_start: 0,
            page_count: pages,
            attributes: 0xF,
        }
    }

    fn build(descs: &[EfiMemoryDescriptor], stride: usize) -> Vec<u8> {
        let mut buf = vec![0xAAu8; descs.len() * stride];
        for (i, d) in descs.iter().enumerate() {
            d.encode(&mut buf[i * stride..]);
        }
        buf
    }

    #[test]
    fn walks_with_padded_stride() {
        let descs = [
            desc(EfiMemoryType::LoaderCode, 0x10_0000, 16),
            desc(EfiMemoryType::Conventional, 0x20_0000, 256),
            desc(EfiMemoryType::AcpiReclaim, 0x7FF0_0000, 4),
        ];
        let buf = build(&descs, 48);
        let map = MemoryMap::new(&buf, 48);
        assert_eq!(map.len(), 3);
        let decoded: Vec<_> = map.descriptors().collect();
        assert_eq!(decoded, descs);
        assert_eq!(decoded[2].kind(), Some(EfiMemoryType::AcpiReclaim));
    }

    #[test]
    fn total_counts_every_type() {
        let descs = [
            desc(EfiMemoryType::Reserved, 0, 1),
            desc(EfiMemoryType::Conventional, 0x1000, 2),
            desc(EfiMemoryType::MemoryMappedIo, 0xFEC0_0000, 3),
        ];
        let buf = build(&descs, 40);
        assert_eq!(MemoryMap::new(&buf, 40).total_memory_bytes(), 6 * 4096);
    }

    #[test]
    fn largest_conventional_prefers_first_on_tie() {
        let descs = [
            desc(EfiMemoryType::Conventional, 0x1000, 8),
            desc(EfiMemoryType::Conventional, 0x10_0000, 64),
            desc(EfiMemoryType::BootServicesData, 0x50_0000, 1000),
            desc(EfiMemoryType::Conventional, 0x80_0000, 64),
        ];
        let buf = build(&descs, 40);
        let best = MemoryMap::new(&buf, 40).largest_conventional();
        assert_eq!(best.map(|d| d.phys_start), Some(0x10_0000));
    }

    #[test]
    fn undersized_stride_is_empty() {
        let buf = [0u8; 64];
        let map = MemoryMap::new(&buf, 16);
        assert!(map.is_empty());
        assert_eq!(map.largest_conventional(), None);
    }

    #[test]
    fn unknown_type_is_preserved() {
        let mut d = desc(EfiMemoryType::Conventional, 0, 1);
        d.typ = 0x8000_0001;
        assert_eq!(d.kind(), None);
        assert!(!d.is_conventional());
    }

    #[test]
    fn type_names() {
        assert_eq!(EfiMemoryType::Conventional.to_string(), "EfiConventionalMemory");
        assert_eq!(EfiMemoryType::from_raw(13), Some(EfiMemoryType::PalCode));
        assert_eq!(EfiMemoryType::from_raw(14), None);
    }
}
