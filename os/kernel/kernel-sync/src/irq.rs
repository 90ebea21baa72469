//! Interrupt-flag control for `x86_64`.
//!
//! The free functions execute privileged instructions and must only run at
//! CPL0. [`InterruptControl`] is the seam guards go through, so the
//! save/restore logic can be exercised against a fake flag.

/// `RFLAGS.IF`.
const RFLAGS_IF: u64 = 1 << 9;

/// Disables maskable interrupts (`cli`).
#[inline]
pub fn cli_stop_interrupts() {
    unsafe { core::arch::asm!("cli", options(nomem, nostack, preserves_flags)) }
}

/// Enables maskable interrupts (`sti`).
#[inline]
pub fn sti_enable_interrupts() {
    unsafe { core::arch::asm!("sti", options(nomem, nostack, preserves_flags)) }
}

/// Returns the current `RFLAGS` value (via `pushfq/pop`).
#[inline]
#[must_use]
pub fn rflags() -> u64 {
    let r: u64;
    unsafe { core::arch::asm!("pushfq; pop {}", out(reg) r, options(nostack, preserves_flags)) }
    r
}

#[inline]
#[must_use]
pub fn interrupts_enabled() -> bool {
    rflags() & RFLAGS_IF != 0
}

/// Reads and flips the interrupt-enable flag.
pub trait InterruptControl {
    fn enabled(&self) -> bool;
    fn disable(&self);
    fn enable(&self);
}

/// The executing CPU's `RFLAGS.IF`.
#[derive(Debug, Default, Copy, Clone)]
pub struct Cpu;

impl InterruptControl for Cpu {
    #[inline]
    fn enabled(&self) -> bool {
        interrupts_enabled()
    }

    #[inline]
    fn disable(&self) {
        cli_stop_interrupts();
    }

    #[inline]
    fn enable(&self) {
        sti_enable_interrupts();
    }
}

/// RAII guard that disables interrupts on creation and restores them on drop.
///
/// `sti` is only issued on drop if interrupts were enabled when the guard was
/// taken, so guards nest.
pub struct IrqGuard<C: InterruptControl = Cpu> {
    control: C,
    were_enabled: bool,
}

impl Default for IrqGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl IrqGuard {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with(Cpu)
    }
}

impl<C: InterruptControl> IrqGuard<C> {
    #[inline]
    #[must_use]
    pub fn with(control: C) -> Self {
        let were_enabled = control.enabled();
        if were_enabled {
            control.disable();
        }
        Self {
            control,
            were_enabled,
        }
    }
}

impl<C: InterruptControl> Drop for IrqGuard<C> {
    fn drop(&mut self) {
        if self.were_enabled {
            self.control.enable();
        }
    }
}
