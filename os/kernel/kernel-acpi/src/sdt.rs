//! System Description Table header.

use core::fmt;

/// Four-byte ASCII table signature, e.g. `APIC`.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Signature(pub [u8; 4]);

impl Signature {
    pub const MADT: Self = Self(*b"APIC");
    pub const HPET: Self = Self(*b"HPET");
    pub const MCFG: Self = Self(*b"MCFG");
    pub const RSDT: Self = Self(*b"RSDT");
    pub const XSDT: Self = Self(*b"XSDT");

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '?'
            };
            fmt::Write::write_char(f, c)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature(\"{self}\")")
    }
}

/// Common 36-byte header at the start of every ACPI table except the RSDP.
#[derive(Debug, Copy, Clone)]
#[repr(C, packed)]
pub struct SdtHeader {
    pub signature: [u8; 4],
    /// Length of the whole table, header included.
    pub length: u32,
    pub revision: u8,
    /// Makes the whole table sum to zero.
    pub checksum: u8,
    pub oem_id: [u8; 6],
    pub oem_table_id: [u8; 8],
    pub oem_revision: u32,
    pub creator_id: u32,
    pub creator_revision: u32,
}

const _: () = assert!(size_of::<SdtHeader>() == 36);

impl SdtHeader {
    pub const SIZE: usize = 36;

    /// Reads a header from the start of `bytes`. `None` if it is too short.
    #[must_use]
    pub fn read(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        // SAFETY: length checked; the struct is packed, so any address is aligned.
        Some(unsafe { core::ptr::read_unaligned(bytes.as_ptr().cast::<Self>()) })
    }

    #[must_use]
    pub const fn signature(&self) -> Signature {
        Signature(self.signature)
    }

    #[must_use]
    pub const fn length(&self) -> usize {
        self.length as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sdt;

    #[test]
    fn header_fields_decode() {
        let t = sdt(b"MCFG", &[0; 8]);
        let h = SdtHeader::read(&t).unwrap();
        assert_eq!(h.signature(), Signature::MCFG);
        assert_eq!(h.length(), 44);
        assert_eq!({ h.oem_id }, *b"TESTID");
        assert_eq!({ h.creator_id }, u32::from_le_bytes(*b"RUST"));
    }

    #[test]
    fn short_buffer_has_no_header() {
        assert!(SdtHeader::read(&[0; 35]).is_none());
    }

    #[test]
    fn signature_display_masks_control_bytes() {
        assert_eq!(format!("{}", Signature::MADT), "APIC");
        assert_eq!(format!("{}", Signature([b'A', 0, b'C', 0x7F])), "A?C?");
    }
}
