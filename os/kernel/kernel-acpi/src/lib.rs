//! # ACPI Table Discovery
//!
//! Early-boot discovery of the firmware's ACPI tables: just enough to find the
//! interrupt controller topology (MADT), the HPET, and the PCI Express
//! configuration windows (MCFG).
//!
//! ## Architecture
//!
//! ```text
//! UEFI configuration table
//!     ↓
//! RSDP (v1: 20 bytes, v2: 36 bytes)
//!     ↓
//! RSDT (4-byte pointers) or XSDT (8-byte pointers)   ← RootTable::find_table
//!     ↓
//! APIC (MADT) · HPET · MCFG · ...
//! ```
//!
//! ## Key Components
//!
//! * [`PhysMapRo`]: how physical table memory becomes a byte slice. The
//!   kernel runs identity-mapped, so [`IdentityMapRo`] is the production
//!   implementation; tests map synthetic tables instead.
//! * [`Rsdp`]: signature and checksum validation, revision-based choice of
//!   the root table.
//! * [`RootTable`]: signature lookup over the root pointer array; every table
//!   it returns has a verified checksum.
//! * [`Madt`] / [`MadtEntry`]: the variable-length entry stream as a closed
//!   sum type, and [`Madt::explore`] which reduces it to the Local APIC base.
//! * [`HpetTable`] and [`Mcfg`].
//!
//! ## Validation
//!
//! | Structure | Checks |
//! |-----------|--------|
//! | RSDP      | `"RSD PTR "`, 20-byte checksum, extended checksum over `length` (rev ≥ 2) |
//! | RSDT/XSDT | signature, checksum over `length` |
//! | any table | checksum over `length` before it is handed out |
//! | MADT      | entry length ≥ 2, within the table, ≥ the record's shape; known type tag |
//!
//! Every failure is reported as an [`AcpiError`]. Bring-up treats all of them
//! as fatal.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod bytes;
mod hpet;
mod madt;
mod mcfg;
mod root;
mod rsdp;
mod sdt;

pub use crate::hpet::{GenericAddress, HpetTable};
pub use crate::madt::{Madt, MadtEntries, MadtEntry, MadtInfo};
pub use crate::mcfg::{Mcfg, McfgAllocation};
pub use crate::root::{RootTable, RootWidth, Table};
pub use crate::rsdp::Rsdp;
pub use crate::sdt::{SdtHeader, Signature};

/// Map a physical region and return a *read-only* byte slice for its contents.
/// You provide the implementation (identity map, kmap, etc.).
pub trait PhysMapRo {
    /// # Safety
    /// The implementor must ensure the returned slice is valid for `len` bytes.
    unsafe fn map_ro<'a>(&self, paddr: u64, len: usize) -> &'a [u8];
}

/// Physical addresses are readable in place.
#[derive(Debug, Default, Copy, Clone)]
pub struct IdentityMapRo;

impl PhysMapRo for IdentityMapRo {
    unsafe fn map_ro<'a>(&self, paddr: u64, len: usize) -> &'a [u8] {
        unsafe { core::slice::from_raw_parts(paddr as *const u8, len) }
    }
}

/// Errors raised while discovering and parsing ACPI tables.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum AcpiError {
    #[error("RSDP address is null")]
    NullRsdp,

    #[error("no \"RSD PTR \" signature at {0:#x}")]
    BadRsdpSignature(u64),

    #[error("RSDP checksum mismatch")]
    RsdpChecksum,

    #[error("RSDP reports an impossible length of {0} bytes")]
    BadRsdpLength(u32),

    #[error("{0} checksum mismatch")]
    ChecksumMismatch(Signature),

    #[error("expected a {expected} table, found {found}")]
    UnexpectedSignature {
        expected: Signature,
        found: Signature,
    },

    #[error("{0} table is truncated")]
    Truncated(Signature),

    #[error("malformed MADT entry at offset {offset} (length {length})")]
    MalformedMadtEntry { offset: usize, length: u8 },

    #[error("unknown MADT entry type {entry_type} at offset {offset}")]
    UnknownMadtEntry { offset: usize, entry_type: u8 },
}

/// Byte sum modulo 256. A valid ACPI structure sums to zero.
#[must_use]
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |a, &b| a.wrapping_add(b))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Synthetic physical memory: a set of buffers at made-up addresses.
    #[derive(Default)]
    pub struct FakePhys {
        regions: Vec<(u64, Vec<u8>)>,
    }

    impl FakePhys {
        pub fn place(&mut self, addr: u64, bytes: Vec<u8>) {
            self.regions.push((addr, bytes));
        }
    }

    impl PhysMapRo for FakePhys {
        #[allow(clippy::cast_possible_truncation)]
        unsafe fn map_ro<'a>(&self, paddr: u64, len: usize) -> &'a [u8] {
            let (base, bytes) = self
                .regions
                .iter()
                .find(|(base, b)| paddr >= *base && paddr < *base + b.len() as u64)
                .unwrap_or_else(|| panic!("unmapped physical address {paddr:#x}"));
            let off = (paddr - base) as usize;
            assert!(off + len <= bytes.len(), "read past region at {paddr:#x}");
            unsafe { core::slice::from_raw_parts(bytes.as_ptr().add(off), len) }
        }
    }

    /// Builds a table with a valid header and checksum around `body`.
    pub fn sdt(signature: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let len = u32::try_from(SdtHeader::SIZE + body.len()).unwrap();
        let mut t = Vec::with_capacity(len as usize);
        t.extend_from_slice(signature);
        t.extend_from_slice(&len.to_le_bytes());
        t.push(1); // revision
        t.push(0); // checksum
        t.extend_from_slice(b"TESTID");
        t.extend_from_slice(b"TESTTBL ");
        t.extend_from_slice(&1u32.to_le_bytes());
        t.extend_from_slice(b"RUST");
        t.extend_from_slice(&1u32.to_le_bytes());
        t.extend_from_slice(body);
        fix_checksum(&mut t, 9);
        t
    }

    /// Rewrites the byte at `at` so that `bytes` sums to zero.
    pub fn fix_checksum(bytes: &mut [u8], at: usize) {
        bytes[at] = 0;
        bytes[at] = 0u8.wrapping_sub(checksum(bytes));
    }
}
