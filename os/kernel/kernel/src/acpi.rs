//! # Firmware Table Discovery
//!
//! Walks the RSDP → RSDT/XSDT chain under the identity map and pulls out what
//! bring-up needs: the MADT (required), the HPET (required in APIC mode) and
//! the MCFG (reported for PCI, optional).

use kernel_acpi::{
    AcpiError, HpetTable, IdentityMapRo, Madt, MadtInfo, Mcfg, RootTable, Rsdp, Signature,
};
use kernel_memory_addresses::PhysicalAddress;
use log::{debug, info};

/// What the firmware told us.
#[derive(Debug, Copy, Clone)]
pub struct AcpiTables {
    pub madt: MadtInfo,
    pub hpet_base: Option<PhysicalAddress>,
}

impl AcpiTables {
    #[must_use]
    pub const fn local_apic_base(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.madt.local_apic_address)
    }
}

/// Discovers the tables behind `rsdp_addr`.
///
/// # Panics
/// On any [`AcpiError`] (bad checksum, malformed or unknown MADT entry) and
/// when no MADT exists.
pub fn discover(rsdp_addr: u64) -> AcpiTables {
    try_discover(rsdp_addr).unwrap_or_else(|e| panic!("ACPI: {e}"))
}

fn try_discover(rsdp_addr: u64) -> Result<AcpiTables, AcpiError> {
    // SAFETY: firmware tables live in identity-mapped RAM or ACPI regions,
    // all of which the kernel identity-maps.
    let rsdp = unsafe { Rsdp::parse(&IdentityMapRo, rsdp_addr)? };
    let root = unsafe { RootTable::from_rsdp(&IdentityMapRo, &rsdp)? };
    info!(
        "ACPI revision {} ({:?} at {:#x}, {} tables)",
        rsdp.revision,
        root.width(),
        root.phys(),
        root.len()
    );
    for (addr, signature) in root.signatures() {
        debug!("  {signature} at {addr:#x}");
    }

    let Some(madt) = root.find_table(Signature::MADT)? else {
        panic!("ACPI: no MADT (\"APIC\") table");
    };
    let madt = Madt::parse(madt.bytes)?.explore()?;
    info!(
        "MADT: local APIC at {:#x}{}, {} entries, dual 8259: {}",
        madt.local_apic_address,
        if madt.address_overridden { " (overridden)" } else { "" },
        madt.entry_count,
        madt.dual_legacy_pics
    );

    let hpet_base = match root.find_table(Signature::HPET)? {
        Some(table) => {
            let hpet = HpetTable::parse(table.bytes)?;
            info!(
                "HPET #{} at {:#x}, caps {:?}",
                hpet.hpet_number,
                hpet.base_address(),
                hpet.caps
            );
            Some(PhysicalAddress::new(hpet.base_address()))
        }
        None => None,
    };

    if let Some(table) = root.find_table(Signature::MCFG)? {
        for window in Mcfg::parse(table.bytes)?.allocations() {
            info!(
                "PCIe segment {} buses {}..={} at {:#x}",
                window.segment, window.start_bus, window.end_bus, window.base
            );
        }
    } else {
        debug!("no MCFG table");
    }

    Ok(AcpiTables { madt, hpet_base })
}
