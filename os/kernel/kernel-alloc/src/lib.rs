//! # Physical Page-Frame Allocation
//!
//! Tracks every 4 KiB page of physical memory with one bit and hands out
//! free pages with a forward linear scan.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │          PageFrameAllocator                  │
//! │  • free / used / reserved byte counters      │
//! │  • lock / free / reserve / unreserve         │
//! │  • request_page (cursor-based forward scan)  │
//! └───────────────┬──────────────────────────────┘
//!                 │
//! ┌───────────────▼──────────────────────────────┐
//! │                 Bitmap                       │
//! │  • bit i set ⇔ page i used or reserved       │
//! │  • lives in the largest conventional region  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Accounting
//!
//! At every point `free + used + reserved == total`, where `total` is the
//! sum of all memory-map descriptors. Every state change is idempotent: locking
//! a locked page, freeing a free page and so on change nothing.
//!
//! *Used* pages belong to the kernel (page tables, the bitmap itself, the
//! kernel image, the framebuffer). *Reserved* pages are firmware-owned or
//! otherwise unusable and are never handed out.
//!
//! ## Initialization
//!
//! [`PageFrameAllocator::from_memory_map`] sizes the bitmap from the EFI
//! memory map, places it at the base of the largest conventional region,
//! reserves every non-conventional descriptor and locks the bitmap's own
//! pages.
//!
//! The allocator is also the [`FrameAlloc`](kernel_vmem::FrameAlloc) the page
//! table builder draws its tables from.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod bitmap;
mod page_frame_allocator;

pub use bitmap::Bitmap;
pub use page_frame_allocator::{MemoryMapError, PageFrameAllocator};
