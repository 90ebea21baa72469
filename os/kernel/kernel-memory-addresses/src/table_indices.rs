use crate::VirtualAddress;

const INDEX_MASK: u64 = 0x1FF;

/// A virtual address split into the four 9-bit paging indices and the
/// 12-bit page offset.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TableIndices {
    /// Bits 47..=39.
    pub pml4: usize,
    /// Bits 38..=30.
    pub pdpt: usize,
    /// Bits 29..=21.
    pub pd: usize,
    /// Bits 20..=12.
    pub pt: usize,
    /// Bits 11..=0.
    pub offset: u64,
}

impl TableIndices {
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn of(va: VirtualAddress) -> Self {
        let v = va.as_u64();
        Self {
            pml4: ((v >> 39) & INDEX_MASK) as usize,
            pdpt: ((v >> 30) & INDEX_MASK) as usize,
            pd: ((v >> 21) & INDEX_MASK) as usize,
            pt: ((v >> 12) & INDEX_MASK) as usize,
            offset: v & 0xFFF,
        }
    }

    /// Indices in walk order: PML4, PDPT, PD, PT.
    #[must_use]
    pub const fn levels(&self) -> [usize; 4] {
        [self.pml4, self.pdpt, self.pd, self.pt]
    }
}
