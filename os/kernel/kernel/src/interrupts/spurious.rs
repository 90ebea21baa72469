/// LAPIC spurious interrupt. Must not be acknowledged.
#[unsafe(naked)]
pub extern "C" fn spurious_handler() {
    core::arch::naked_asm!("iretq");
}
