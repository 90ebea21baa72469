use crate::context::KernelContext;
use crate::interrupts;
use kernel_interrupts::InterruptMode;
use kernel_interrupts::idt::{GateType, Idt};
use kernel_interrupts::vectors::{
    DOUBLE_FAULT, GENERAL_PROTECTION, KEYBOARD, LAPIC_TIMER, PAGE_FAULT, SPURIOUS,
};
use kernel_memory_addresses::PhysicalAddress;
use log::{debug, info};

#[cfg(feature = "ps2-mouse")]
use kernel_interrupts::vectors::MOUSE;

/// Builds the IDT in a fresh page, installs every handler for `mode` and
/// loads it.
///
/// # Panics
/// If no page is left for the table.
pub fn init(ctx: &mut KernelContext, mode: InterruptMode) -> PhysicalAddress {
    let page = ctx
        .allocator
        .request_page()
        .unwrap_or_else(|| panic!("out of physical memory while allocating the IDT"));

    // SAFETY: the page was just locked for us and is identity-mapped; an
    // IDT is exactly one 4 KiB-aligned page.
    let idt: &'static mut Idt = unsafe {
        let ptr = page.as_mut_ptr::<Idt>();
        ptr.write(Idt::new());
        &mut *ptr
    };

    install_handlers(idt, mode);
    let idt: &'static Idt = idt;
    debug!("IDT vectors: {:?}", IdtVectors(idt));

    // SAFETY: CPL0, interrupts disabled, every present gate points at a stub
    // in KERNEL_CS.
    unsafe { idt.load() };
    info!("IDT loaded at {page}");
    page
}

fn install_handlers(idt: &mut Idt, mode: InterruptMode) {
    idt.install(DOUBLE_FAULT, handler_addr(interrupts::df::double_fault_handler), GateType::Trap);
    idt.install(
        GENERAL_PROTECTION,
        handler_addr(interrupts::gp::general_protection_handler),
        GateType::Trap,
    );
    idt.install(PAGE_FAULT, handler_addr(interrupts::page_fault::page_fault_handler), GateType::Trap);
    idt.install(KEYBOARD, handler_addr(interrupts::keyboard::keyboard_handler), GateType::Interrupt);

    #[cfg(feature = "ps2-mouse")]
    idt.install(MOUSE, handler_addr(interrupts::mouse::mouse_handler), GateType::Interrupt);

    if mode == InterruptMode::Apic {
        idt.install(LAPIC_TIMER, handler_addr(interrupts::timer::lapic_timer_handler), GateType::Interrupt);
        idt.install(SPURIOUS, handler_addr(interrupts::spurious::spurious_handler), GateType::Interrupt);
    }
}

fn handler_addr(handler: extern "C" fn()) -> u64 {
    handler as usize as u64
}

/// `Debug` adapter listing the present vectors.
struct IdtVectors<'a>(&'a Idt);

impl core::fmt::Debug for IdtVectors<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.0.present_vectors()).finish()
    }
}
