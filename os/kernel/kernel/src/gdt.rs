use kernel_interrupts::gdt::Gdt;
use kernel_interrupts::selectors::{KERNEL_CS, KERNEL_DS};
use log::info;

/// The one GDT. Ring-3 descriptors exist but are never used.
static GDT: Gdt = Gdt::new();

/// Loads [`GDT`] and reloads every segment register.
pub fn init() {
    // SAFETY: CPL0, interrupts still disabled; the table is 'static.
    unsafe { GDT.load() };
    info!("GDT loaded (CS={KERNEL_CS:#04x}, DS={KERNEL_DS:#04x})");
}
