//! # Global Descriptor Table
//!
//! In long mode segmentation no longer translates addresses, but the CPU still
//! needs a code selector for `CS` and interrupt gates and a data selector for
//! the stack segment.
//!
//! ## Layout
//! Index | Selector | Access | Flags | Meaning
//! ------|----------|--------|-------|--------
//! 0     | 0x00     | 0x00   | 0x00  | Null
//! 1     | 0x08     | 0x9A   | 0xA0  | Kernel code ([`KERNEL_CS`])
//! 2     | 0x10     | 0x92   | 0xA0  | Kernel data ([`KERNEL_DS`])
//! 3     | 0x18     | 0x00   | 0x00  | User null
//! 4     | 0x20     | 0x9A   | 0xA0  | User code (unused)
//! 5     | 0x28     | 0x92   | 0xA0  | User data (unused)
//!
//! The "user" entries carry DPL 0 and nothing ever loads them; the kernel has
//! no ring-3 code.
//!
//! Access `0x9A` = present, DPL 0, code/data, execute/read.
//! Access `0x92` = present, DPL 0, code/data, read/write.
//! Flags `0xA0` = 4 KiB granularity, 64-bit code.

use crate::DescriptorTablePointer;
#[cfg(feature = "asm")]
use crate::selectors::{KERNEL_CS, KERNEL_DS};
use bitfield_struct::bitfield;

/// Access byte of a present ring-0 execute/read code segment.
pub const CODE_ACCESS: u8 = 0x9A;

/// Access byte of a present ring-0 read/write data segment.
pub const DATA_ACCESS: u8 = 0x92;

/// Upper limit nibble 0, flags `G | L`.
pub const LONG_MODE_FLAGS: u8 = 0xA0;

/// One 8-byte code/data segment descriptor.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct SegmentDescriptor {
    pub limit_lo: u16, // [15:0]   (ignored in long mode)
    pub base_lo: u16,  // [31:16]  (ignored in long mode)
    pub base_mid: u8,  // [39:32]
    /// `P | DPL(2) | S | Type(4)`.
    pub access: u8, // [47:40]
    #[bits(4)]
    pub limit_hi: u8, // [51:48]
    /// `G | DB | L | AVL`.
    #[bits(4)]
    pub flags: u8, // [55:52]
    pub base_hi: u8, // [63:56]
}

impl SegmentDescriptor {
    pub const NULL: Self = Self::new();

    /// Builds a descriptor with zero base and limit from the access byte and
    /// the byte holding `limit[19:16]` and the flags.
    #[must_use]
    pub const fn from_access_flags(access: u8, limit_hi_flags: u8) -> Self {
        Self::new()
            .with_access(access)
            .with_limit_hi(limit_hi_flags & 0x0F)
            .with_flags(limit_hi_flags >> 4)
    }

    #[must_use]
    pub const fn present(self) -> bool {
        self.access() & 0x80 != 0
    }

    #[must_use]
    pub const fn dpl(self) -> u8 {
        (self.access() >> 5) & 0b11
    }

    #[must_use]
    pub const fn is_code(self) -> bool {
        self.access() & 0x08 != 0
    }

    /// `L` flag: 64-bit code segment.
    #[must_use]
    pub const fn long_mode(self) -> bool {
        self.flags() & 0b0010 != 0
    }
}

/// The kernel's GDT.
#[derive(Debug)]
#[repr(C, align(4096))]
pub struct Gdt {
    pub kernel_null: SegmentDescriptor,
    pub kernel_code: SegmentDescriptor,
    pub kernel_data: SegmentDescriptor,
    pub user_null: SegmentDescriptor,
    pub user_code: SegmentDescriptor,
    pub user_data: SegmentDescriptor,
}

impl Default for Gdt {
    fn default() -> Self {
        Self::new()
    }
}

impl Gdt {
    /// Number of descriptors.
    pub const ENTRIES: usize = 6;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            kernel_null: SegmentDescriptor::NULL,
            kernel_code: SegmentDescriptor::from_access_flags(CODE_ACCESS, LONG_MODE_FLAGS),
            kernel_data: SegmentDescriptor::from_access_flags(DATA_ACCESS, LONG_MODE_FLAGS),
            user_null: SegmentDescriptor::NULL,
            user_code: SegmentDescriptor::from_access_flags(CODE_ACCESS, LONG_MODE_FLAGS),
            user_data: SegmentDescriptor::from_access_flags(DATA_ACCESS, LONG_MODE_FLAGS),
        }
    }

    /// Raw descriptors in table order.
    #[must_use]
    pub const fn raw(&self) -> [u64; Self::ENTRIES] {
        [
            self.kernel_null.into_bits(),
            self.kernel_code.into_bits(),
            self.kernel_data.into_bits(),
            self.user_null.into_bits(),
            self.user_code.into_bits(),
            self.user_data.into_bits(),
        ]
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn pointer(&self) -> DescriptorTablePointer {
        DescriptorTablePointer {
            limit: (Self::ENTRIES * size_of::<SegmentDescriptor>() - 1) as u16,
            base: core::ptr::from_ref(self) as u64,
        }
    }

    /// Loads the table with `lgdt`, reloads the data segments with
    /// [`KERNEL_DS`] and `CS` with [`KERNEL_CS`] through a far return.
    ///
    /// # Safety
    /// - Must run at CPL0 with interrupts disabled.
    /// - `self` stays mapped for the rest of the kernel's life.
    #[cfg(feature = "asm")]
    pub unsafe fn load(&'static self) {
        let ptr = self.pointer();
        unsafe {
            core::arch::asm!(
                "lgdt [{}]",
                in(reg) &raw const ptr,
                options(readonly, nostack, preserves_flags)
            );

            core::arch::asm!(
                "mov ds, {0:x}",
                "mov es, {0:x}",
                "mov fs, {0:x}",
                "mov gs, {0:x}",
                "mov ss, {0:x}",
                in(reg) KERNEL_DS,
                options(nostack, preserves_flags)
            );

            // Far return to reload CS.
            core::arch::asm!(
                "push {cs}",
                "lea {tmp}, [rip + 2f]",
                "push {tmp}",
                "retfq",
                "2:",
                cs = in(reg) u64::from(KERNEL_CS),
                tmp = lateout(reg) _,
            );
        }
    }
}

const _: () = {
    assert!(size_of::<SegmentDescriptor>() == 8);
    assert!(size_of::<Gdt>() == 4096);
    assert!(align_of::<Gdt>() == 4096);
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_match_the_classic_encoding() {
        let raw = Gdt::new().raw();
        assert_eq!(raw[0], 0);
        assert_eq!(raw[1], 0x00A0_9A00_0000_0000);
        assert_eq!(raw[2], 0x00A0_9200_0000_0000);
        assert_eq!(raw[3], 0);
        assert_eq!(raw[4], raw[1]);
        assert_eq!(raw[5], raw[2]);
    }

    #[test]
    fn kernel_code_is_present_ring0_long_mode() {
        let gdt = Gdt::new();
        let cs = gdt.kernel_code;
        assert!(cs.present());
        assert_eq!(cs.dpl(), 0);
        assert!(cs.is_code());
        assert!(cs.long_mode());

        let ds = gdt.kernel_data;
        assert!(ds.present());
        assert!(!ds.is_code());
    }

    #[test]
    fn pointer_covers_six_entries() {
        let gdt = Box::new(Gdt::new());
        let p = gdt.pointer();
        assert_eq!({ p.limit }, 47);
        assert_eq!({ p.base }, core::ptr::from_ref(&*gdt) as u64);
    }
}
