use super::CpuHalt;
use kernel_interrupts::fault::{Fault, report_and_halt};
use kernel_registers::LoadRegisterUnsafe;
use kernel_registers::cr2::Cr2;

/// `#PF` entry. Passes the error code and the faulting `RIP`.
#[unsafe(naked)]
pub extern "C" fn page_fault_handler() {
    core::arch::naked_asm!(
        "cli",
        "mov rdi, [rsp]",
        "mov rsi, [rsp + 8]",
        "and rsp, -16",
        "call {rust}",
        "2: hlt",
        "jmp 2b",
        rust = sym page_fault_rust,
    );
}

extern "C" fn page_fault_rust(error_code: u64, rip: u64) -> ! {
    // SAFETY: CPL0; nothing ran since the fault that could overwrite CR2.
    let cr2 = unsafe { Cr2::load_unsafe() };
    let fault = Fault::page_fault(error_code, cr2.fault_address().as_u64(), rip);
    report_and_halt(&fault, core::iter::empty(), &CpuHalt)
}
