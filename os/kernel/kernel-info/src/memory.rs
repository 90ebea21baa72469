//! # Memory Layout

/// Where the kernel image is placed in *physical* memory.
///
/// # Kernel Build
/// This information is sourced in the kernel's `build.rs` to configure
/// the linker. With the identity map this is also the kernel's VMA.
pub const PHYS_LOAD: u64 = 0x0010_0000; // 1 MiB

/// The size of the boot stack the entry stub switches to.
pub const KERNEL_STACK_SIZE: usize = 64 * 1024;

/// Size of a page as the firmware counts them in the memory map.
pub const EFI_PAGE_SIZE: u64 = 4096;

const _: () = {
    assert!(KERNEL_STACK_SIZE.is_multiple_of(4096));
    assert!(PHYS_LOAD.is_multiple_of(EFI_PAGE_SIZE));
};
