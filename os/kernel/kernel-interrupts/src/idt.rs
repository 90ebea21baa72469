//! # Interrupt Descriptor Table
//!
//! 256 sixteen-byte gates with a fluent builder:
//!
//! ```ignore
//! idt[vectors::PAGE_FAULT]
//!     .set_handler(page_fault_stub as usize as u64)
//!     .selector(KERNEL_CS)
//!     .present(true)
//!     .gate_type(GateType::Trap);
//!
//! unsafe { idt.load() };
//! ```
//!
//! ## Entry layout
//!
//! ```text
//! byte  0..2   offset[15:0]
//! byte  2..4   selector
//! byte  4      IST (3 bits), rest zero
//! byte  5      P | DPL(2) | 0 | Type(4)
//! byte  6..8   offset[31:16]
//! byte  8..12  offset[63:32]
//! byte 12..16  reserved
//! ```
//!
//! The attribute byte is `0x80 | type` for present ring-0 gates, i.e.
//! `0x8E` for interrupt gates, `0x8F` for trap gates and `0x8C` for call gates.
//! Interrupt gates clear `IF` on entry; trap gates leave it alone.

use crate::DescriptorTablePointer;
use crate::selectors::KERNEL_CS;
use bitfield_struct::bitfield;
use core::ops::{Index, IndexMut};

/// Number of gates.
pub const IDT_ENTRIES: usize = 256;

/// Gate kinds.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum GateType {
    /// Clears `IF` on entry.
    Interrupt = 0xE,
    /// Leaves `IF` unchanged.
    Trap = 0xF,
    /// Legacy call gate type.
    Call = 0xC,
}

/// Attribute byte of an IDT gate.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct GateAttributes {
    #[bits(4)]
    pub typ: u8,
    /// Must be zero for interrupt and trap gates.
    pub storage: bool,
    #[bits(2)]
    pub dpl: u8,
    pub present: bool,
}

impl GateAttributes {
    /// Present ring-0 gate of the given type.
    #[must_use]
    pub const fn kernel(gate: GateType) -> Self {
        Self::new().with_typ(gate as u8).with_present(true)
    }
}

/// One 16-byte gate descriptor.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(C)]
pub struct IdtEntry {
    offset_lo: u16,
    selector: u16,
    ist: u8,
    attributes: u8,
    offset_mid: u16,
    offset_hi: u32,
    reserved: u32,
}

impl IdtEntry {
    /// A zeroed, non-present entry.
    pub const MISSING: Self = Self {
        offset_lo: 0,
        selector: 0,
        ist: 0,
        attributes: 0,
        offset_mid: 0,
        offset_hi: 0,
        reserved: 0,
    };

    /// The handler address, reassembled from its three parts.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.offset_lo as u64) | ((self.offset_mid as u64) << 16) | ((self.offset_hi as u64) << 32)
    }

    #[allow(clippy::cast_possible_truncation)]
    pub const fn set_offset(&mut self, addr: u64) {
        self.offset_lo = addr as u16;
        self.offset_mid = (addr >> 16) as u16;
        self.offset_hi = (addr >> 32) as u32;
    }

    #[must_use]
    pub const fn selector(&self) -> u16 {
        self.selector
    }

    #[must_use]
    pub const fn attributes(&self) -> GateAttributes {
        GateAttributes::from_bits(self.attributes)
    }

    #[must_use]
    pub const fn ist(&self) -> u8 {
        self.ist & 0b111
    }

    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.attributes().present()
    }

    /// Stores the handler address and returns a builder for the rest.
    ///
    /// The selector defaults to [`KERNEL_CS`]. The entry starts out as a
    /// non-present ring-0 interrupt gate without IST.
    pub const fn set_handler(&mut self, addr: u64) -> IdtEntryBuilder<'_> {
        self.set_offset(addr);
        self.selector = KERNEL_CS;
        self.ist = 0;
        self.attributes = GateAttributes::new()
            .with_typ(GateType::Interrupt as u8)
            .into_bits();
        self.reserved = 0;
        IdtEntryBuilder { entry: self }
    }
}

/// Fluent builder for an [`IdtEntry`].
pub struct IdtEntryBuilder<'a> {
    entry: &'a mut IdtEntry,
}

impl IdtEntryBuilder<'_> {
    #[inline]
    pub const fn present(self, p: bool) -> Self {
        self.entry.attributes = GateAttributes::from_bits(self.entry.attributes)
            .with_present(p)
            .into_bits();
        self
    }

    /// Descriptor privilege level, `0..=3`.
    #[inline]
    pub fn dpl(self, dpl: u8) -> Self {
        debug_assert!(dpl <= 3);
        self.entry.attributes = GateAttributes::from_bits(self.entry.attributes)
            .with_dpl(dpl)
            .into_bits();
        self
    }

    #[inline]
    pub const fn gate_type(self, gate: GateType) -> Self {
        self.entry.attributes = GateAttributes::from_bits(self.entry.attributes)
            .with_typ(gate as u8)
            .into_bits();
        self
    }

    /// IST slot, 0 disables stack switching.
    #[inline]
    pub fn ist(self, idx: u8) -> Self {
        debug_assert!(idx <= 7);
        self.entry.ist = idx & 0b111;
        self
    }

    #[inline]
    pub const fn selector(self, sel: u16) -> Self {
        self.entry.selector = sel;
        self
    }
}

/// The full table.
#[derive(Debug)]
#[repr(C, align(4096))]
pub struct Idt {
    entries: [IdtEntry; IDT_ENTRIES],
}

impl Default for Idt {
    fn default() -> Self {
        Self::new()
    }
}

impl Idt {
    /// All gates non-present.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: [IdtEntry::MISSING; IDT_ENTRIES],
        }
    }

    /// Installs a present ring-0 gate of the given type for `vector`.
    pub fn install(&mut self, vector: u8, handler: u64, gate: GateType) {
        self[usize::from(vector)]
            .set_handler(handler)
            .selector(KERNEL_CS)
            .present(true)
            .gate_type(gate);
    }

    /// Vectors with a present gate.
    pub fn present_vectors(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_present())
            .map(|(v, _)| v)
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn pointer(&self) -> DescriptorTablePointer {
        DescriptorTablePointer {
            limit: (size_of::<Self>() - 1) as u16,
            base: core::ptr::from_ref(self) as u64,
        }
    }

    /// Loads the table into IDTR.
    ///
    /// # Safety
    /// - Must run at CPL0.
    /// - Every present gate must point at a valid handler in [`KERNEL_CS`].
    #[cfg(feature = "asm")]
    pub unsafe fn load(&'static self) {
        let ptr = self.pointer();
        unsafe {
            core::arch::asm!(
                "lidt [{}]",
                in(reg) &raw const ptr,
                options(readonly, nostack, preserves_flags)
            );
        }
    }
}

impl Index<usize> for Idt {
    type Output = IdtEntry;
    fn index(&self, i: usize) -> &Self::Output {
        &self.entries[i]
    }
}

impl IndexMut<usize> for Idt {
    fn index_mut(&mut self, i: usize) -> &mut Self::Output {
        &mut self.entries[i]
    }
}

const _: () = {
    assert!(size_of::<IdtEntry>() == 16);
    assert!(size_of::<Idt>() == 4096);
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_is_split_and_rejoined() {
        let mut e = IdtEntry::MISSING;
        e.set_offset(0xFFFF_8000_1234_5678);
        assert_eq!(e.offset_lo, 0x5678);
        assert_eq!(e.offset_mid, 0x1234);
        assert_eq!(e.offset_hi, 0xFFFF_8000);
        assert_eq!(e.offset(), 0xFFFF_8000_1234_5678);
    }

    fn assert_round_trip(addr: u64) {
        let mut e = IdtEntry::MISSING;
        e.set_offset(addr);
        assert_eq!(u64::from(e.offset_lo), addr & 0xFFFF, "lo of {addr:#x}");
        assert_eq!(u64::from(e.offset_mid), (addr >> 16) & 0xFFFF, "mid of {addr:#x}");
        assert_eq!(u64::from(e.offset_hi), addr >> 32, "hi of {addr:#x}");
        assert_eq!(e.offset(), addr);
    }

    #[test]
    fn offset_round_trip_at_field_boundaries() {
        for addr in [
            0,
            u64::MAX,
            0xFFFF,
            0xFFFF_0000,
            0xFFFF_FFFF_0000_0000,
            1 << 15,
            1 << 16,
            1 << 31,
            1 << 32,
            1 << 63,
        ] {
            assert_round_trip(addr);
        }
    }

    #[test]
    fn offset_round_trip_sweep() {
        // splitmix64, fixed seed
        let mut state = 0x9E37_79B9_7F4A_7C15_u64;
        for _ in 0..10_000 {
            state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
            let mut z = state;
            z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
            assert_round_trip(z ^ (z >> 31));
        }
    }

    #[test]
    fn set_offset_leaves_other_fields_alone() {
        let mut e = IdtEntry::MISSING;
        e.set_handler(0x1234).gate_type(GateType::Trap).present(true);
        let (sel, attr) = (e.selector(), e.attributes());
        e.set_offset(u64::MAX);
        assert_eq!(e.selector(), sel);
        assert_eq!(e.attributes(), attr);
        assert_eq!(e.ist(), 0);
    }

    #[test]
    fn attribute_bytes() {
        assert_eq!(GateAttributes::kernel(GateType::Interrupt).into_bits(), 0x8E);
        assert_eq!(GateAttributes::kernel(GateType::Trap).into_bits(), 0x8F);
        assert_eq!(GateAttributes::kernel(GateType::Call).into_bits(), 0x8C);
    }

    #[test]
    fn builder_defaults_to_kernel_cs_and_absent() {
        let mut e = IdtEntry::MISSING;
        e.set_handler(0x1000);
        assert_eq!(e.selector(), KERNEL_CS);
        assert!(!e.is_present());
        assert_eq!(e.attributes().typ(), GateType::Interrupt as u8);

        e.set_handler(0x2000).present(true).ist(1).dpl(3).gate_type(GateType::Trap);
        assert_eq!(e.offset(), 0x2000);
        assert_eq!(e.ist(), 1);
        assert_eq!(e.attributes().dpl(), 3);
        assert_eq!(e.attributes().into_bits(), 0xEF);
    }

    #[test]
    fn install_marks_only_the_given_vectors() {
        let mut idt = Box::new(Idt::new());
        idt.install(14, 0xDEAD_BEEF, GateType::Trap);
        idt.install(33, 0xCAFE_F00D, GateType::Interrupt);

        assert_eq!(idt.present_vectors().collect::<Vec<_>>(), vec![14, 33]);
        assert_eq!(idt[14].attributes().into_bits(), 0x8F);
        assert_eq!(idt[33].attributes().into_bits(), 0x8E);
        assert_eq!(idt[33].offset(), 0xCAFE_F00D);
        assert_eq!({ idt.pointer().limit }, 4095);
    }
}
