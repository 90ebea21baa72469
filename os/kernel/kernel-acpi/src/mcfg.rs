//! PCI Express memory-mapped configuration table.

use crate::bytes::{u16_at, u64_at};
use crate::sdt::{SdtHeader, Signature};
use crate::AcpiError;

const ALLOCATIONS_OFFSET: usize = SdtHeader::SIZE + 8;
const ALLOCATION_LEN: usize = 16;

/// One ECAM window: configuration space for a bus range of a segment.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct McfgAllocation {
    pub base: u64,
    pub segment: u16,
    pub start_bus: u8,
    pub end_bus: u8,
}

/// Parsed `MCFG` table.
#[derive(Debug, Copy, Clone)]
pub struct Mcfg<'a> {
    allocations: &'a [u8],
}

impl<'a> Mcfg<'a> {
    /// # Errors
    /// Wrong signature or a table shorter than its fixed part.
    pub fn parse(table: &'a [u8]) -> Result<Self, AcpiError> {
        let header = SdtHeader::read(table).ok_or(AcpiError::Truncated(Signature::MCFG))?;
        if header.signature() != Signature::MCFG {
            return Err(AcpiError::UnexpectedSignature {
                expected: Signature::MCFG,
                found: header.signature(),
            });
        }
        let len = header.length();
        if len < ALLOCATIONS_OFFSET || len > table.len() {
            return Err(AcpiError::Truncated(Signature::MCFG));
        }
        Ok(Self {
            allocations: &table[ALLOCATIONS_OFFSET..len],
        })
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.allocations.len() / ALLOCATION_LEN
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn allocations(&self) -> impl Iterator<Item = McfgAllocation> + 'a {
        self.allocations
            .chunks_exact(ALLOCATION_LEN)
            .map(|a| McfgAllocation {
                base: u64_at(a, 0),
                segment: u16_at(a, 8),
                start_bus: a[10],
                end_bus: a[11],
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sdt;

    #[test]
    fn lists_allocations() {
        let mut body = vec![0; 8];
        for (base, seg, end) in [(0xB000_0000u64, 0u16, 0xFFu8), (0xE000_0000, 1, 0x3F)] {
            body.extend_from_slice(&base.to_le_bytes());
            body.extend_from_slice(&seg.to_le_bytes());
            body.extend_from_slice(&[0, end, 0, 0, 0, 0]);
        }
        let t = sdt(b"MCFG", &body);
        let mcfg = Mcfg::parse(&t).unwrap();
        assert_eq!(mcfg.len(), 2);
        let all: Vec<_> = mcfg.allocations().collect();
        assert_eq!(
            all[1],
            McfgAllocation {
                base: 0xE000_0000,
                segment: 1,
                start_bus: 0,
                end_bus: 0x3F
            }
        );
    }
}
