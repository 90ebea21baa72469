//! RSDT / XSDT lookup.

use crate::bytes::{u32_at, u64_at};
use crate::sdt::{SdtHeader, Signature};
use crate::{AcpiError, PhysMapRo, Rsdp, checksum};
use log::debug;

/// Pointer width of the root table.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RootWidth {
    /// ACPI 1.0 RSDT: 32-bit table pointers.
    Rsdt,
    /// ACPI 2.0+ XSDT: 64-bit table pointers.
    Xsdt,
}

impl RootWidth {
    #[must_use]
    pub const fn entry_size(self) -> usize {
        match self {
            Self::Rsdt => 4,
            Self::Xsdt => 8,
        }
    }

    #[must_use]
    pub const fn signature(self) -> Signature {
        match self {
            Self::Rsdt => Signature::RSDT,
            Self::Xsdt => Signature::XSDT,
        }
    }
}

/// A checksum-verified ACPI table.
#[derive(Debug, Copy, Clone)]
pub struct Table<'a> {
    pub phys: u64,
    pub header: SdtHeader,
    /// The whole table, header included.
    pub bytes: &'a [u8],
}

impl Table<'_> {
    #[must_use]
    pub const fn signature(&self) -> Signature {
        self.header.signature()
    }
}

/// The validated RSDT or XSDT.
pub struct RootTable<'m, M: PhysMapRo> {
    map: &'m M,
    phys: u64,
    width: RootWidth,
    entries: &'m [u8],
}

impl<'m, M: PhysMapRo> RootTable<'m, M> {
    /// Opens the root table the RSDP points at.
    ///
    /// # Errors
    /// See [`open`](Self::open).
    ///
    /// # Safety
    /// As for [`open`](Self::open).
    pub unsafe fn from_rsdp(map: &'m M, rsdp: &Rsdp) -> Result<Self, AcpiError> {
        let (phys, width) = rsdp.root();
        unsafe { Self::open(map, phys, width) }
    }

    /// Opens and validates the root table at `phys`.
    ///
    /// # Errors
    /// Wrong signature, a length shorter than the header, or a bad checksum.
    ///
    /// # Safety
    /// `phys` and every table pointer stored in the root table must be
    /// mappable through `map` for the lengths their headers declare, for as
    /// long as the returned value lives.
    pub unsafe fn open(map: &'m M, phys: u64, width: RootWidth) -> Result<Self, AcpiError> {
        let table = unsafe { read_table(map, phys) }?;
        if table.signature() != width.signature() {
            return Err(AcpiError::UnexpectedSignature {
                expected: width.signature(),
                found: table.signature(),
            });
        }

        let entries = &table.bytes[SdtHeader::SIZE..];
        let entries = &entries[..entries.len() / width.entry_size() * width.entry_size()];
        debug!(
            "{} at {phys:#x}: {} entries",
            width.signature(),
            entries.len() / width.entry_size()
        );
        Ok(Self {
            map,
            phys,
            width,
            entries,
        })
    }

    #[must_use]
    pub const fn phys(&self) -> u64 {
        self.phys
    }

    #[must_use]
    pub const fn width(&self) -> RootWidth {
        self.width
    }

    /// Number of table pointers: `(length - 36) / entry_size`.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len() / self.width.entry_size()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Physical addresses of all tables, in root-table order.
    pub fn table_addresses(&self) -> impl Iterator<Item = u64> + '_ {
        let width = self.width;
        self.entries
            .chunks_exact(width.entry_size())
            .map(move |e| match width {
                RootWidth::Rsdt => u64::from(u32_at(e, 0)),
                RootWidth::Xsdt => u64_at(e, 0),
            })
    }

    /// Signatures of all tables, for diagnostics.
    pub fn signatures(&self) -> impl Iterator<Item = (u64, Signature)> + '_ {
        self.table_addresses().filter_map(|addr| {
            // SAFETY: covered by the contract of `open`.
            let raw = unsafe { self.map.map_ro(addr, SdtHeader::SIZE) };
            SdtHeader::read(raw).map(|h| (addr, h.signature()))
        })
    }

    /// Returns the first table whose signature matches, or `None` when no
    /// entry has it.
    ///
    /// # Errors
    /// The matching table fails its checksum or is shorter than its header.
    pub fn find_table(&self, signature: Signature) -> Result<Option<Table<'m>>, AcpiError> {
        for (addr, sig) in self.signatures() {
            if sig == signature {
                // SAFETY: covered by the contract of `open`.
                let table = unsafe { read_table(self.map, addr) }?;
                debug!("found {signature} at {addr:#x} ({} bytes)", table.bytes.len());
                return Ok(Some(table));
            }
        }
        Ok(None)
    }
}

/// Maps a table in full and verifies its checksum.
unsafe fn read_table<'m>(map: &'m impl PhysMapRo, phys: u64) -> Result<Table<'m>, AcpiError> {
    let head = unsafe { map.map_ro(phys, SdtHeader::SIZE) };
    let header = SdtHeader::read(head).ok_or(AcpiError::Truncated(Signature([0; 4])))?;
    if header.length() < SdtHeader::SIZE {
        return Err(AcpiError::Truncated(header.signature()));
    }
    let bytes = unsafe { map.map_ro(phys, header.length()) };
    if checksum(bytes) != 0 {
        return Err(AcpiError::ChecksumMismatch(header.signature()));
    }
    Ok(Table {
        phys,
        header,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakePhys, sdt};

    fn root(width: RootWidth, pointers: &[u64]) -> Vec<u8> {
        let mut body = Vec::new();
        for &p in pointers {
            match width {
                RootWidth::Rsdt => body.extend_from_slice(&u32::try_from(p).unwrap().to_le_bytes()),
                RootWidth::Xsdt => body.extend_from_slice(&p.to_le_bytes()),
            }
        }
        sdt(width.signature().as_bytes(), &body)
    }

    fn firmware(width: RootWidth) -> FakePhys {
        let mut phys = FakePhys::default();
        phys.place(0x1000, root(width, &[0x2000, 0x3000, 0x4000]));
        phys.place(0x2000, sdt(b"FACP", &[0; 16]));
        phys.place(0x3000, sdt(b"APIC", &[0; 8]));
        phys.place(0x4000, sdt(b"HPET", &[0; 20]));
        phys
    }

    #[test]
    fn xsdt_lookup_finds_present_tables() {
        let phys = firmware(RootWidth::Xsdt);
        let root = unsafe { RootTable::open(&phys, 0x1000, RootWidth::Xsdt) }.unwrap();
        assert_eq!(root.len(), 3);

        let madt = root.find_table(Signature::MADT).unwrap().unwrap();
        assert_eq!(madt.phys, 0x3000);
        assert_eq!(madt.signature(), Signature::MADT);
        assert_eq!(madt.bytes.len(), 44);

        let hpet = root.find_table(Signature::HPET).unwrap().unwrap();
        assert_eq!(hpet.phys, 0x4000);

        assert!(root.find_table(Signature::MCFG).unwrap().is_none());
    }

    #[test]
    fn rsdt_uses_four_byte_pointers() {
        let phys = firmware(RootWidth::Rsdt);
        let root = unsafe { RootTable::open(&phys, 0x1000, RootWidth::Rsdt) }.unwrap();
        let addrs: Vec<_> = root.table_addresses().collect();
        assert_eq!(addrs, [0x2000, 0x3000, 0x4000]);
        assert_eq!(root.find_table(Signature::HPET).unwrap().unwrap().phys, 0x4000);
    }

    #[test]
    fn first_match_wins() {
        let mut phys = FakePhys::default();
        phys.place(0x1000, root(RootWidth::Xsdt, &[0x2000, 0x3000]));
        phys.place(0x2000, sdt(b"SSDT", &[1]));
        phys.place(0x3000, sdt(b"SSDT", &[2, 2]));
        let root = unsafe { RootTable::open(&phys, 0x1000, RootWidth::Xsdt) }.unwrap();
        let t = root.find_table(Signature(*b"SSDT")).unwrap().unwrap();
        assert_eq!(t.phys, 0x2000);
    }

    #[test]
    fn corrupt_table_is_reported() {
        let mut phys = FakePhys::default();
        let mut madt = sdt(b"APIC", &[0; 8]);
        madt[40] ^= 0x55;
        phys.place(0x1000, root(RootWidth::Xsdt, &[0x3000]));
        phys.place(0x3000, madt);
        let root = unsafe { RootTable::open(&phys, 0x1000, RootWidth::Xsdt) }.unwrap();
        assert_eq!(
            root.find_table(Signature::MADT).err(),
            Some(AcpiError::ChecksumMismatch(Signature::MADT))
        );
    }

    #[test]
    fn root_signature_must_match_width() {
        let phys = firmware(RootWidth::Rsdt);
        let err = unsafe { RootTable::open(&phys, 0x1000, RootWidth::Xsdt) }.err();
        assert_eq!(
            err,
            Some(AcpiError::UnexpectedSignature {
                expected: Signature::XSDT,
                found: Signature::RSDT,
            })
        );
    }
}
