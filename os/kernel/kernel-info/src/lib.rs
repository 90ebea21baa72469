//! # Kernel Boot Interface
//!
//! Data structures and layout constants shared between the UEFI loader and
//! the kernel. The loader fills a [`KernelBootInfo`](boot::KernelBootInfo),
//! exits boot services and jumps to the kernel entry point with a pointer to
//! it; everything the kernel learns about the machine at that point flows
//! through this crate.
//!
//! ## Overview
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`boot`] | The hand-off record: framebuffer, PSF1 font, EFI memory map, ACPI root pointer. |
//! | [`efi`] | UEFI memory descriptor types and a stride-aware view over the raw memory map. |
//! | [`memory`] | Link-time layout constants consumed by the kernel's `build.rs`. |
//!
//! ## Boot Protocol
//!
//! ```rust
//! # use kernel_info::boot::KernelBootInfo;
//! pub type KernelEntryFn = extern "sysv64" fn(*const KernelBootInfo) -> !;
//! ```
//!
//! * The loader identity-maps all of physical memory, so every address in the
//!   record can be dereferenced directly until the kernel installs its own
//!   page tables (which are an identity map as well).
//! * The memory map is handed over as a raw byte buffer. Descriptors are
//!   `descriptor_size` bytes apart, which may be larger than the descriptor
//!   structure defined by the UEFI specification. Always walk it through
//!   [`MemoryMap`](efi::MemoryMap).
//!
//! ## Physical Memory Layout
//!
//! ```text
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │     Low Memory (< 1MiB)         │
//! PHYS_LOAD   ├─────────────────────────────────┤ 0x0010_0000 (1 MiB)
//!             │       Kernel Image              │
//!             │  __kernel_start .. __kernel_end │
//!             ├─────────────────────────────────┤
//!             │    Available RAM                │
//!             │  (page-frame bitmap allocator)  │
//!             └─────────────────────────────────┘
//! ```
//!
//! The kernel runs identity-mapped: virtual and physical addresses are the
//! same numbers.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod boot;
pub mod efi;
pub mod memory;
