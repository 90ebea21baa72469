//! High Precision Event Timer description table.

use crate::bytes::{u16_at, u64_at};
use crate::sdt::{SdtHeader, Signature};
use crate::AcpiError;
use bitfield_struct::bitfield;

const TABLE_LEN: usize = SdtHeader::SIZE + 20;

/// Byte 1 of the event timer block ID.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct HpetBlockCaps {
    /// Number of comparators in the first timer block.
    #[bits(5)]
    pub comparator_count: u8,
    /// Main counter is 64 bits wide.
    pub counter_64bit: bool,
    #[bits(1)]
    __: u8,
    /// Legacy replacement IRQ routing capable.
    pub legacy_replacement: bool,
}

/// ACPI Generic Address Structure.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct GenericAddress {
    /// 0 = system memory, 1 = system I/O.
    pub address_space_id: u8,
    pub register_bit_width: u8,
    pub register_bit_offset: u8,
    pub access_size: u8,
    pub address: u64,
}

impl GenericAddress {
    const fn decode(b: &[u8], at: usize) -> Self {
        Self {
            address_space_id: b[at],
            register_bit_width: b[at + 1],
            register_bit_offset: b[at + 2],
            access_size: b[at + 3],
            address: u64_at(b, at + 4),
        }
    }
}

/// Parsed `HPET` table.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct HpetTable {
    pub hardware_revision: u8,
    pub caps: HpetBlockCaps,
    pub pci_vendor_id: u16,
    pub base: GenericAddress,
    pub hpet_number: u8,
    /// Minimum periodic tick in main-counter units.
    pub minimum_tick: u16,
    pub page_protection: u8,
}

impl HpetTable {
    /// # Errors
    /// Wrong signature or a table shorter than 56 bytes.
    pub fn parse(table: &[u8]) -> Result<Self, AcpiError> {
        let header = SdtHeader::read(table).ok_or(AcpiError::Truncated(Signature::HPET))?;
        if header.signature() != Signature::HPET {
            return Err(AcpiError::UnexpectedSignature {
                expected: Signature::HPET,
                found: header.signature(),
            });
        }
        if header.length() < TABLE_LEN || table.len() < TABLE_LEN {
            return Err(AcpiError::Truncated(Signature::HPET));
        }

        let b = &table[SdtHeader::SIZE..];
        Ok(Self {
            hardware_revision: b[0],
            caps: HpetBlockCaps::from_bits(b[1]),
            pci_vendor_id: u16_at(b, 2),
            base: GenericAddress::decode(b, 4),
            hpet_number: b[16],
            minimum_tick: u16_at(b, 17),
            page_protection: b[19],
        })
    }

    /// Physical address of the HPET register block.
    #[must_use]
    pub const fn base_address(&self) -> u64 {
        self.base.address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sdt;

    fn qemu_hpet() -> Vec<u8> {
        let mut body = vec![0x01, 0b1010_0010];
        body.extend_from_slice(&0x8086u16.to_le_bytes());
        body.extend_from_slice(&[0, 64, 0, 0]);
        body.extend_from_slice(&0xFED0_0000u64.to_le_bytes());
        body.push(0);
        body.extend_from_slice(&0x0080u16.to_le_bytes());
        body.push(0);
        sdt(b"HPET", &body)
    }

    #[test]
    fn decodes_fields() {
        let t = qemu_hpet();
        let h = HpetTable::parse(&t).unwrap();
        assert_eq!(h.base_address(), 0xFED0_0000);
        assert_eq!(h.base.address_space_id, 0);
        assert_eq!(h.base.register_bit_width, 64);
        assert_eq!(h.hardware_revision, 1);
        assert_eq!(h.caps.comparator_count(), 2);
        assert!(h.caps.counter_64bit());
        assert!(h.caps.legacy_replacement());
        assert_eq!(h.pci_vendor_id, 0x8086);
        assert_eq!(h.minimum_tick, 0x80);
    }

    #[test]
    fn short_table_is_rejected() {
        let t = sdt(b"HPET", &[0; 12]);
        assert_eq!(HpetTable::parse(&t), Err(AcpiError::Truncated(Signature::HPET)));
    }
}
