//! # Kernel synchronization primitives
//!
//! The kernel is single-core; the only concurrency it has to survive is an
//! interrupt handler preempting the main flow of control. The primitives here
//! are shaped by that:
//!
//! | Type | Use |
//! |------|-----|
//! | [`BootCell`] | A global that is written exactly once during bring-up and read afterwards. |
//! | [`SpinLock`] | Mutual exclusion for state touched from the main flow only. |
//! | [`SpinLock::lock_irq`] | Same, with interrupts masked while held. |
//! | [`IsrRing`] | A fixed-capacity byte queue filled by an interrupt handler and drained by the main loop. |
//!
//! Interrupt handlers never spin on a lock; they only push into an
//! [`IsrRing`] or bump an atomic.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod boot_cell;
pub mod irq;
mod isr_ring;
mod spin_lock;

pub use boot_cell::BootCell;
pub use irq::{Cpu, InterruptControl, IrqGuard};
pub use isr_ring::{Drained, IsrRing};
pub use spin_lock::{IrqSpinLockGuard, SpinLock, SpinLockGuard};
