//! Multiple APIC Description Table (MADT).
//!
//! After the SDT header come the 32-bit Local APIC base and a flags word,
//! then a stream of `{type u8, length u8, ...}` records up to the table's end.

use crate::bytes::{u16_at, u32_at, u64_at};
use crate::sdt::{SdtHeader, Signature};
use crate::AcpiError;
use log::debug;

/// Offset of the first entry from the start of the table.
const ENTRIES_OFFSET: usize = SdtHeader::SIZE + 8;

/// MADT flags bit 0: the system also has dual 8259 PICs.
const PCAT_COMPAT: u32 = 1 << 0;

/// One interrupt controller structure.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MadtEntry {
    /// Type 0, 8 bytes.
    LocalApic {
        processor_id: u8,
        apic_id: u8,
        flags: u32,
    },
    /// Type 1, 12 bytes.
    IoApic {
        id: u8,
        address: u32,
        gsi_base: u32,
    },
    /// Type 2, 10 bytes.
    InterruptSourceOverride {
        bus: u8,
        source: u8,
        gsi: u32,
        flags: u16,
    },
    /// Type 4, 6 bytes. `processor_id == 0xFF` means all processors.
    LocalApicNmi {
        processor_id: u8,
        flags: u16,
        lint: u8,
    },
    /// Type 5, 12 bytes. Replaces the 32-bit base from the MADT header.
    LocalApicAddressOverride { address: u64 },
}

impl MadtEntry {
    /// Decodes one record. `raw` is exactly the record, header included.
    fn decode(raw: &[u8], offset: usize) -> Result<Self, AcpiError> {
        let entry_type = raw[0];
        #[allow(clippy::cast_possible_truncation)]
        let malformed = AcpiError::MalformedMadtEntry {
            offset,
            length: raw.len() as u8,
        };
        let min_len = match entry_type {
            0 => 8,
            1 => 12,
            2 => 10,
            4 => 6,
            5 => 12,
            _ => return Err(AcpiError::UnknownMadtEntry { offset, entry_type }),
        };
        if raw.len() < min_len {
            return Err(malformed);
        }

        Ok(match entry_type {
            0 => Self::LocalApic {
                processor_id: raw[2],
                apic_id: raw[3],
                flags: u32_at(raw, 4),
            },
            1 => Self::IoApic {
                id: raw[2],
                address: u32_at(raw, 4),
                gsi_base: u32_at(raw, 8),
            },
            2 => Self::InterruptSourceOverride {
                bus: raw[2],
                source: raw[3],
                gsi: u32_at(raw, 4),
                flags: u16_at(raw, 8),
            },
            4 => Self::LocalApicNmi {
                processor_id: raw[2],
                flags: u16_at(raw, 3),
                lint: raw[5],
            },
            _ => Self::LocalApicAddressOverride {
                address: u64_at(raw, 4),
            },
        })
    }
}

/// A parsed MADT over the table bytes.
#[derive(Debug, Copy, Clone)]
pub struct Madt<'a> {
    pub local_apic_address: u32,
    pub flags: u32,
    entries: &'a [u8],
}

/// What bring-up needs out of the MADT.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MadtInfo {
    /// Header base, or the address-override entry's address if present.
    pub local_apic_address: u64,
    pub address_overridden: bool,
    pub dual_legacy_pics: bool,
    pub entry_count: usize,
}

impl<'a> Madt<'a> {
    /// # Errors
    /// Wrong signature or a table too short for the fixed fields.
    pub fn parse(table: &'a [u8]) -> Result<Self, AcpiError> {
        let header = SdtHeader::read(table).ok_or(AcpiError::Truncated(Signature::MADT))?;
        if header.signature() != Signature::MADT {
            return Err(AcpiError::UnexpectedSignature {
                expected: Signature::MADT,
                found: header.signature(),
            });
        }
        let len = header.length();
        if len < ENTRIES_OFFSET || len > table.len() {
            return Err(AcpiError::Truncated(Signature::MADT));
        }
        Ok(Self {
            local_apic_address: u32_at(table, SdtHeader::SIZE),
            flags: u32_at(table, SdtHeader::SIZE + 4),
            entries: &table[ENTRIES_OFFSET..len],
        })
    }

    #[must_use]
    pub const fn dual_legacy_pics(&self) -> bool {
        self.flags & PCAT_COMPAT != 0
    }

    #[must_use]
    pub const fn entries(&self) -> MadtEntries<'a> {
        MadtEntries {
            data: self.entries,
            pos: 0,
            failed: false,
        }
    }

    /// Walks every entry, logging each one.
    ///
    /// The Local APIC base is the header's unless an address-override entry
    /// appears anywhere in the stream; the last override wins.
    ///
    /// # Errors
    /// The first malformed or unknown entry.
    pub fn explore(&self) -> Result<MadtInfo, AcpiError> {
        let mut info = MadtInfo {
            local_apic_address: u64::from(self.local_apic_address),
            address_overridden: false,
            dual_legacy_pics: self.dual_legacy_pics(),
            entry_count: 0,
        };
        debug!("dual legacy PICs installed: {}", info.dual_legacy_pics);

        for entry in self.entries() {
            let entry = entry?;
            match entry {
                MadtEntry::LocalApic {
                    processor_id,
                    apic_id,
                    flags,
                } => debug!("MADT local APIC: processor {processor_id}, APIC id {apic_id}, flags {flags:#x}"),
                MadtEntry::IoApic {
                    id,
                    address,
                    gsi_base,
                } => debug!("MADT I/O APIC {id}: address {address:#x}, GSI base {gsi_base}"),
                MadtEntry::InterruptSourceOverride {
                    bus,
                    source,
                    gsi,
                    flags,
                } => debug!("MADT source override: bus {bus}, IRQ {source} -> GSI {gsi}, flags {flags:#x}"),
                MadtEntry::LocalApicNmi {
                    processor_id,
                    flags,
                    lint,
                } => debug!("MADT local APIC NMI: processor {processor_id}, flags {flags:#x}, LINT{lint}"),
                MadtEntry::LocalApicAddressOverride { address } => {
                    debug!("MADT local APIC address override: {address:#x}");
                    info.local_apic_address = address;
                    info.address_overridden = true;
                }
            }
            info.entry_count += 1;
        }

        debug!(
            "local APIC at {:#x} (override: {}), {} MADT entries",
            info.local_apic_address, info.address_overridden, info.entry_count
        );
        Ok(info)
    }
}

/// Iterator over MADT entries. Stops after the first error.
pub struct MadtEntries<'a> {
    data: &'a [u8],
    pos: usize,
    failed: bool,
}

impl Iterator for MadtEntries<'_> {
    type Item = Result<MadtEntry, AcpiError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.data.len() {
            return None;
        }
        let offset = ENTRIES_OFFSET + self.pos;
        let rest = &self.data[self.pos..];
        let length = rest.get(1).copied().unwrap_or(0);
        if length < 2 || usize::from(length) > rest.len() {
            self.failed = true;
            return Some(Err(AcpiError::MalformedMadtEntry { offset, length }));
        }

        let raw = &rest[..usize::from(length)];
        self.pos += raw.len();
        let entry = MadtEntry::decode(raw, offset);
        self.failed = entry.is_err();
        Some(entry)
    }
}

impl core::iter::FusedIterator for MadtEntries<'_> {}
