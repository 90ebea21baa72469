//! # Local APIC (xAPIC mode)
//!
//! The register page sits at the physical address reported by the MADT
//! (usually `0xFEE0_0000`). Every register is 32 bits wide at a 16-byte
//! aligned offset.
//!
//! | Offset | Register |
//! |--------|----------|
//! | `0x020` | Local APIC ID |
//! | `0x080` | Task priority (TPR) |
//! | `0x0B0` | End of interrupt |
//! | `0x0D0` | Logical destination (LDR) |
//! | `0x0E0` | Destination format (DFR) |
//! | `0x0F0` | Spurious interrupt vector (SVR) |
//! | `0x320` | LVT timer |
//! | `0x340` | LVT performance monitoring |
//! | `0x350` | LVT LINT0 |
//! | `0x360` | LVT LINT1 |
//! | `0x380` | Timer initial count |
//! | `0x390` | Timer current count |
//! | `0x3E0` | Timer divide configuration |

use crate::{Mmio, TimerError};
use bitfield_struct::bitfield;
use kernel_registers::msr::Ia32ApicBase;
use log::debug;

/// Size of the register window.
pub const LAPIC_MMIO_SIZE: usize = 0x1000;

pub mod regs {
    pub const ID: usize = 0x020;
    pub const TPR: usize = 0x080;
    pub const EOI: usize = 0x0B0;
    pub const LDR: usize = 0x0D0;
    pub const DFR: usize = 0x0E0;
    pub const SVR: usize = 0x0F0;
    pub const LVT_TIMER: usize = 0x320;
    pub const LVT_PERF: usize = 0x340;
    pub const LVT_LINT0: usize = 0x350;
    pub const LVT_LINT1: usize = 0x360;
    pub const TIMER_INITIAL: usize = 0x380;
    pub const TIMER_CURRENT: usize = 0x390;
    pub const TIMER_DIVIDE: usize = 0x3E0;
}

/// Divide configuration `0b0011`: bus clock / 16.
pub const DIVIDE_BY_16: u32 = 0x3;

/// LVT mask bit.
pub const LVT_MASKED: u32 = 1 << 16;

/// LVT delivery mode NMI.
pub const LVT_DELIVERY_NMI: u32 = 0b100 << 8;

/// Flat model.
const DFR_FLAT: u32 = 0xFFFF_FFFF;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum TimerMode {
    OneShot = 0,
    Periodic = 1,
    TscDeadline = 2,
}

impl TimerMode {
    const fn into_bits(self) -> u8 {
        self as u8
    }

    const fn from_bits(value: u8) -> Self {
        match value {
            1 => Self::Periodic,
            2 => Self::TscDeadline,
            _ => Self::OneShot,
        }
    }
}

/// LVT timer register.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct LvtTimer {
    pub vector: u8,
    #[bits(4)]
    _reserved8: u8,
    #[bits(access = RO)]
    pub delivery_pending: bool,
    #[bits(3)]
    _reserved13: u8,
    pub masked: bool,
    #[bits(2)]
    pub mode: TimerMode,
    #[bits(13)]
    _reserved19: u16,
}

/// Spurious interrupt vector register.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct SpuriousVector {
    pub vector: u8,
    /// APIC software enable.
    pub enabled: bool,
    #[bits(23)]
    _reserved9: u32,
}

/// The local APIC of the current CPU.
pub struct Lapic<M: Mmio> {
    mmio: M,
}

impl<M: Mmio> Lapic<M> {
    pub const fn new(mmio: M) -> Self {
        Self { mmio }
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn id(&self) -> u8 {
        (self.mmio.read32(regs::ID) >> 24) as u8
    }

    /// Flat logical destination, NMI on perf-mon, everything else masked,
    /// TPR 0, software-enabled with `spurious_vector`.
    pub fn setup(&mut self, spurious_vector: u8) {
        self.mmio.write32(regs::DFR, DFR_FLAT);
        let ldr = self.mmio.read32(regs::LDR);
        self.mmio.write32(regs::LDR, (ldr & 0x00FF_FFFF) | 1);
        self.mmio.write32(regs::LVT_TIMER, LVT_MASKED);
        self.mmio.write32(regs::LVT_PERF, LVT_DELIVERY_NMI);
        self.mmio.write32(regs::LVT_LINT0, LVT_MASKED);
        self.mmio.write32(regs::LVT_LINT1, LVT_MASKED);
        self.mmio.write32(regs::TPR, 0);
        let svr = SpuriousVector::new()
            .with_vector(spurious_vector)
            .with_enabled(true);
        self.mmio.write32(regs::SVR, svr.into_bits());
        debug!("LAPIC {} configured, spurious vector {spurious_vector:#04x}", self.id());
    }

    #[inline]
    pub fn eoi(&mut self) {
        self.mmio.write32(regs::EOI, 0);
    }

    #[must_use]
    pub fn lvt_timer(&self) -> LvtTimer {
        LvtTimer::from_bits(self.mmio.read32(regs::LVT_TIMER))
    }

    pub fn set_lvt_timer(&mut self, lvt: LvtTimer) {
        self.mmio.write32(regs::LVT_TIMER, lvt.into_bits());
    }

    /// Replaces the LVT timer with just the mask bit set.
    pub fn mask_timer(&mut self) {
        self.set_lvt_timer(LvtTimer::new().with_masked(true));
    }

    pub fn set_divide(&mut self, divide: u32) {
        self.mmio.write32(regs::TIMER_DIVIDE, divide);
    }

    /// Writing the initial count (re)starts the countdown.
    pub fn set_initial_count(&mut self, count: u32) {
        self.mmio.write32(regs::TIMER_INITIAL, count);
    }

    #[must_use]
    pub fn current_count(&self) -> u32 {
        self.mmio.read32(regs::TIMER_CURRENT)
    }
}

/// Checks that `IA32_APIC_BASE` has the global enable bit set.
///
/// # Errors
/// [`TimerError::ApicNotEnabled`] if it does not.
pub const fn verify_enabled(base: Ia32ApicBase) -> Result<Ia32ApicBase, TimerError> {
    if base.global_enable() {
        Ok(base)
    } else {
        Err(TimerError::ApicNotEnabled)
    }
}

/// Switches the APIC to xAPIC mode, opens the task priority to every class
/// and verifies that the enable bit took.
///
/// # Errors
/// See [`verify_enabled`].
///
/// # Safety
/// CPL0 only, with interrupts disabled.
#[cfg(feature = "asm")]
pub unsafe fn enable_xapic() -> Result<Ia32ApicBase, TimerError> {
    use kernel_registers::cr8::Cr8;
    use kernel_registers::{LoadRegisterUnsafe, StoreRegisterUnsafe};

    unsafe {
        let before = Ia32ApicBase::load_unsafe();
        before.xapic_enabled().store_unsafe();
        Cr8::ACCEPT_ALL.store_unsafe();
        let after = Ia32ApicBase::load_unsafe();
        debug!("IA32_APIC_BASE {:#x} -> {:#x}", before.into_bits(), after.into_bits());
        verify_enabled(after)
    }
}
