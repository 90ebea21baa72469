//! Fixed interrupt vector assignments.
//!
//! ```text
//! 0x00..0x20  CPU exceptions
//! 0x20..0x28  PIC #1 (IRQ 0-7), or the LAPIC timer in APIC mode
//! 0x28..0x30  PIC #2 (IRQ 8-15)
//! 0xFF        LAPIC spurious
//! ```

pub const DOUBLE_FAULT: u8 = 0x08;
pub const GENERAL_PROTECTION: u8 = 0x0D;
pub const PAGE_FAULT: u8 = 0x0E;

/// First vector of PIC #1 after remapping.
pub const PIC1_OFFSET: u8 = 0x20;
/// First vector of PIC #2 after remapping.
pub const PIC2_OFFSET: u8 = 0x28;

/// Local APIC timer. Shares IRQ 0's slot; the PIT never fires in APIC mode.
pub const LAPIC_TIMER: u8 = 0x20;

/// IRQ 1.
pub const KEYBOARD: u8 = PIC1_OFFSET + 1;

/// IRQ 12.
pub const MOUSE: u8 = PIC1_OFFSET + 12;

pub const SPURIOUS: u8 = 0xFF;

/// Vector an 8259 IRQ line is delivered on after remapping.
#[must_use]
pub const fn irq_vector(irq: u8) -> u8 {
    PIC1_OFFSET + irq
}

const _: () = {
    assert!(KEYBOARD == 33);
    assert!(MOUSE == 44);
    assert!(MOUSE >= PIC2_OFFSET);
};
