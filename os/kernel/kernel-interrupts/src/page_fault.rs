//! `#PF` error code decoding.

use bitfield_struct::bitfield;
use core::fmt;

/// Page-fault error code pushed by the CPU (Intel SDM Vol. 3A, §6.15).
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct PageFaultError {
    /// 0 = non-present page, 1 = protection violation.
    pub present: bool, // bit 0

    /// 0 = read or execute, 1 = write.
    pub write: bool, // bit 1

    /// Access from CPL 3.
    pub user: bool, // bit 2

    /// Reserved bit set in a paging structure.
    pub reserved_bit: bool, // bit 3

    pub instruction_fetch: bool, // bit 4

    /// Protection-key violation (CR4.PKE).
    pub protection_key: bool, // bit 5

    /// Shadow-stack access (CET).
    pub shadow_stack: bool, // bit 6

    #[bits(57)]
    __: u64,
}

impl PageFaultError {
    /// One-line human reading of the error code.
    #[must_use]
    pub const fn explain(&self) -> &'static str {
        if self.reserved_bit() {
            "Reserved bit set in a paging structure"
        } else if !self.present() {
            "Non-present page"
        } else if self.instruction_fetch() {
            "Instruction fetch from a protected page"
        } else if self.write() {
            "Write access to a protected page"
        } else {
            "Read access to a protected page"
        }
    }
}

impl fmt::Display for PageFaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} {} in {} mode)",
            self.explain(),
            if self.present() { "P" } else { "NP" },
            if self.instruction_fetch() {
                "exec"
            } else if self.write() {
                "write"
            } else {
                "read"
            },
            if self.user() { "user" } else { "kernel" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_common_codes() {
        let e = PageFaultError::from_bits(0b10);
        assert!(!e.present());
        assert!(e.write());
        assert_eq!(e.explain(), "Non-present page");
        assert_eq!(e.to_string(), "Non-present page (NP write in kernel mode)");

        let e = PageFaultError::from_bits(0b1_0101);
        assert_eq!(e.explain(), "Instruction fetch from a protected page");
        assert_eq!(
            e.to_string(),
            "Instruction fetch from a protected page (P exec in user mode)"
        );

        let e = PageFaultError::from_bits(0b1001);
        assert_eq!(e.explain(), "Reserved bit set in a paging structure");
    }
}
