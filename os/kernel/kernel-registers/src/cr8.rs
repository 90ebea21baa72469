use crate::{LoadRegisterUnsafe, StoreRegisterUnsafe};
use bitfield_struct::bitfield;

/// CR8: Task Priority Register alias.
///
/// Only the low four bits are defined; they mirror `TPR[7:4]` of the local
/// APIC. A value of 0 lets every interrupt priority class through.
#[bitfield(u64)]
pub struct Cr8 {
    #[bits(4)]
    pub task_priority: u8,

    #[bits(60)]
    _reserved: u64,
}

impl Cr8 {
    /// Accept every priority class.
    pub const ACCEPT_ALL: Self = Self::new();
}

#[cfg(feature = "asm")]
impl LoadRegisterUnsafe for Cr8 {
    unsafe fn load_unsafe() -> Self {
        let cr8: u64;
        unsafe {
            core::arch::asm!("mov {}, cr8", out(reg) cr8, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(cr8)
    }
}

#[cfg(feature = "asm")]
impl StoreRegisterUnsafe for Cr8 {
    unsafe fn store_unsafe(self) {
        let cr8 = self.into_bits();
        unsafe {
            core::arch::asm!("mov cr8, {}", in(reg) cr8, options(nostack, preserves_flags));
        }
    }
}
