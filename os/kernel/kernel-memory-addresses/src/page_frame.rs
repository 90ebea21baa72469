use crate::{PAGE_SHIFT, PhysicalAddress};
use core::fmt;

/// Index of a 4 KiB physical page frame.
///
/// Frame `n` covers the physical bytes `n * 4096 .. (n + 1) * 4096`. This is
/// the unit in which the page-frame bitmap is addressed.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PageFrame(u64);

impl PageFrame {
    #[inline]
    #[must_use]
    pub const fn from_index(index: u64) -> Self {
        Self(index)
    }

    #[inline]
    #[must_use]
    pub const fn containing(pa: PhysicalAddress) -> Self {
        Self(pa.as_u64() >> PAGE_SHIFT)
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> u64 {
        self.0
    }

    /// First byte of the frame.
    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress::new(self.0 << PAGE_SHIFT)
    }

    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Debug for PageFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({:#x} @ {})", self.0, self.base())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_of_unaligned_address() {
        let f = PhysicalAddress::new(0x5432).frame();
        assert_eq!(f.index(), 5);
        assert_eq!(f.base().as_u64(), 0x5000);
        assert_eq!(f.next().base().as_u64(), 0x6000);
    }
}
