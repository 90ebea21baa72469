//! # RSDP/XSDP (Root/Extended System Description Pointer)

use crate::root::RootWidth;
use crate::{AcpiError, PhysMapRo, checksum};

/// ACPI 1.0 Root System Description Pointer (RSDP)
#[derive(Clone, Copy)]
#[repr(C, packed)]
struct RsdpV1 {
    signature: [u8; 8], // "RSD PTR "
    checksum: u8,       // sum of first 20 bytes == 0
    oem_id: [u8; 6],
    revision: u8, // 0 for ACPI 1.0
    rsdt_addr: u32,
}

/// ACPI 2.0 Extended System Description Pointer (XSDP)
#[derive(Clone, Copy)]
#[repr(C, packed)]
struct RsdpV2 {
    v1: RsdpV1,
    length: u32,
    xsdt_addr: u64,
    ext_checksum: u8, // checksum of entire table
    reserved: [u8; 3],
}

const _: () = assert!(size_of::<RsdpV1>() == 20);
const _: () = assert!(size_of::<RsdpV2>() == 36);

const SIGNATURE: &[u8; 8] = b"RSD PTR ";

/// A validated RSDP.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Rsdp {
    pub rsdp_addr: u64,
    pub revision: u8,
    pub oem_id: [u8; 6],
    pub rsdt_addr: u32,
    /// Present for revision 2 and later.
    pub xsdt_addr: Option<u64>,
}

impl Rsdp {
    /// Validates the RSDP at `rsdp_addr`.
    ///
    /// Revision 0 structures are 20 bytes with one checksum. Revision 2 and
    /// later carry a `length` and an extended checksum over all of it.
    ///
    /// # Errors
    /// Null address, wrong signature, bad checksum or impossible length.
    ///
    /// # Safety
    /// `map` must be able to map `rsdp_addr` for at least 36 bytes if the
    /// revision says v2, and for `length` bytes after that.
    pub unsafe fn parse(map: &impl PhysMapRo, rsdp_addr: u64) -> Result<Self, AcpiError> {
        if rsdp_addr == 0 {
            return Err(AcpiError::NullRsdp);
        }

        let v1_bytes = unsafe { map.map_ro(rsdp_addr, size_of::<RsdpV1>()) };
        if &v1_bytes[0..8] != SIGNATURE {
            return Err(AcpiError::BadRsdpSignature(rsdp_addr));
        }
        if checksum(v1_bytes) != 0 {
            return Err(AcpiError::RsdpChecksum);
        }
        let v1 = unsafe { core::ptr::read_unaligned(v1_bytes.as_ptr().cast::<RsdpV1>()) };

        let mut rsdp = Self {
            rsdp_addr,
            revision: v1.revision,
            oem_id: v1.oem_id,
            rsdt_addr: v1.rsdt_addr,
            xsdt_addr: None,
        };

        if v1.revision >= 2 {
            let v2_bytes = unsafe { map.map_ro(rsdp_addr, size_of::<RsdpV2>()) };
            let v2 = unsafe { core::ptr::read_unaligned(v2_bytes.as_ptr().cast::<RsdpV2>()) };
            let len = v2.length;
            if (len as usize) < size_of::<RsdpV2>() {
                return Err(AcpiError::BadRsdpLength(len));
            }
            let full = unsafe { map.map_ro(rsdp_addr, len as usize) };
            if checksum(full) != 0 {
                return Err(AcpiError::RsdpChecksum);
            }
            rsdp.xsdt_addr = Some(v2.xsdt_addr);
        }

        Ok(rsdp)
    }

    /// The root table to walk: XSDT when available, otherwise RSDT.
    #[must_use]
    pub fn root(&self) -> (u64, RootWidth) {
        match self.xsdt_addr {
            Some(xsdt) if xsdt != 0 => (xsdt, RootWidth::Xsdt),
            _ => (u64::from(self.rsdt_addr), RootWidth::Rsdt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakePhys, fix_checksum};

    fn v1(rsdt: u32) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(SIGNATURE);
        b.push(0);
        b.extend_from_slice(b"BOCHS ");
        b.push(0);
        b.extend_from_slice(&rsdt.to_le_bytes());
        fix_checksum(&mut b, 8);
        b
    }

    fn v2(rsdt: u32, xsdt: u64) -> Vec<u8> {
        let mut b = v1(rsdt);
        b[15] = 2;
        fix_checksum(&mut b, 8);
        b.extend_from_slice(&36u32.to_le_bytes());
        b.extend_from_slice(&xsdt.to_le_bytes());
        b.push(0);
        b.extend_from_slice(&[0; 3]);
        fix_checksum(&mut b, 32);
        b
    }

    #[test]
    fn revision_0_uses_rsdt() {
        let mut phys = FakePhys::default();
        phys.place(0xE_0000, v1(0x7FE1_0000));
        let rsdp = unsafe { Rsdp::parse(&phys, 0xE_0000) }.unwrap();
        assert_eq!(rsdp.revision, 0);
        assert_eq!(rsdp.xsdt_addr, None);
        assert_eq!(&rsdp.oem_id, b"BOCHS ");
        assert_eq!(rsdp.root(), (0x7FE1_0000, RootWidth::Rsdt));
    }

    #[test]
    fn revision_2_prefers_xsdt() {
        let mut phys = FakePhys::default();
        phys.place(0xE_0000, v2(0x7FE1_0000, 0x1_7FE2_0000));
        let rsdp = unsafe { Rsdp::parse(&phys, 0xE_0000) }.unwrap();
        assert_eq!(rsdp.revision, 2);
        assert_eq!(rsdp.root(), (0x1_7FE2_0000, RootWidth::Xsdt));
    }

    #[test]
    fn rejects_null_signature_and_checksum() {
        let mut phys = FakePhys::default();
        assert_eq!(unsafe { Rsdp::parse(&phys, 0) }, Err(AcpiError::NullRsdp));

        let mut bad_sig = v1(1);
        bad_sig[0] = b'X';
        phys.place(0x1000, bad_sig);
        assert_eq!(
            unsafe { Rsdp::parse(&phys, 0x1000) },
            Err(AcpiError::BadRsdpSignature(0x1000))
        );

        let mut bad_sum = v1(1);
        bad_sum[8] ^= 1;
        phys.place(0x2000, bad_sum);
        assert_eq!(unsafe { Rsdp::parse(&phys, 0x2000) }, Err(AcpiError::RsdpChecksum));

        let mut bad_ext = v2(1, 2);
        bad_ext[32] ^= 1;
        phys.place(0x3000, bad_ext);
        assert_eq!(unsafe { Rsdp::parse(&phys, 0x3000) }, Err(AcpiError::RsdpChecksum));
    }
}
