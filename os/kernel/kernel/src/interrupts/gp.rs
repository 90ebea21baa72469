use super::CpuHalt;
use kernel_interrupts::fault::{Fault, report_and_halt};
use kernel_interrupts::stack_walk::{FramePointerWalk, MAX_FRAMES};

/// `#GP` entry.
///
/// Stack on entry: error code, then the faulting `RIP`. `RBP` still belongs
/// to the faulting function, which makes it the start of the backtrace.
#[unsafe(naked)]
pub extern "C" fn general_protection_handler() {
    core::arch::naked_asm!(
        "cli",
        "mov rdi, [rsp]",
        "mov rsi, [rsp + 8]",
        "mov rdx, rbp",
        "and rsp, -16",
        "call {rust}",
        "2: hlt",
        "jmp 2b",
        rust = sym general_protection_rust,
    );
}

extern "C" fn general_protection_rust(error_code: u64, rip: u64, rbp: u64) -> ! {
    // SAFETY: the kernel keeps frame pointers and the boot stack ends in a
    // zero RBP; the walk is capped either way.
    let walk = unsafe { FramePointerWalk::new(rbp, MAX_FRAMES) };
    report_and_halt(&Fault::GeneralProtection { error_code, rip }, walk, &CpuHalt)
}
