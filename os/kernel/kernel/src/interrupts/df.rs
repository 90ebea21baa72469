use super::CpuHalt;
use kernel_interrupts::fault::{Fault, report_and_halt};

/// `#DF` entry. The CPU pushes an error code of zero.
#[unsafe(naked)]
pub extern "C" fn double_fault_handler() {
    core::arch::naked_asm!(
        "cli",
        "mov rdi, [rsp]",
        "and rsp, -16",
        "call {rust}",
        "2: hlt",
        "jmp 2b",
        rust = sym double_fault_rust,
    );
}

extern "C" fn double_fault_rust(error_code: u64) -> ! {
    report_and_halt(&Fault::DoubleFault { error_code }, core::iter::empty(), &CpuHalt)
}
