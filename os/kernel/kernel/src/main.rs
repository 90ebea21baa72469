//! # Kernel Entry Point
//!
//! The UEFI loader jumps to [`_start_kernel`] after `ExitBootServices` with
//! a pointer to the [`KernelBootInfo`] in `RDI`. From there:
//!
//! ```text
//! _start_kernel (naked)          switch to BOOT_STACK
//!   └─ kernel_entry_on_boot_stack
//!        └─ init::bring_up        logger → memory → GDT → IDT → ACPI → APIC → sti
//!             └─ kernel_main      drain keyboard/mouse buffers, hlt
//! ```
//!
//! Any fatal condition ends in the [panic handler](panic), which reports and
//! halts with interrupts disabled.

#![no_std]
#![no_main]
#![allow(unsafe_code)]

mod acpi;
mod apic;
mod context;
mod gdt;
mod idt;
mod init;
mod interrupts;
mod memory;
mod tracing;

use kernel_info::boot::KernelBootInfo;
use kernel_info::memory::KERNEL_STACK_SIZE;
use kernel_interrupts::stack_walk::{FramePointerWalk, MAX_FRAMES};
use kernel_qemu::qemu_trace;
use kernel_sync::irq::cli_stop_interrupts;
use log::{error, info, trace, warn};

/// 16-byte aligned stack storage.
#[repr(align(16))]
struct Aligned16<const N: usize>([u8; N]);

/// The only stack the kernel ever runs on.
#[unsafe(link_section = ".bss.boot")]
#[unsafe(no_mangle)]
static mut BOOT_STACK: Aligned16<KERNEL_STACK_SIZE> = Aligned16([0; KERNEL_STACK_SIZE]);

/// The kernel entry point.
///
/// Uses the System V ABI (`boot_info` in `RDI`). Naked so that nothing runs
/// on the loader's stack after we take over.
#[unsafe(no_mangle)]
#[unsafe(naked)]
pub extern "C" fn _start_kernel(_boot_info: *const KernelBootInfo) {
    core::arch::naked_asm!(
        "cli",
        "mov r12, rdi",
        "lea rax, [rip + {stack_sym}]",
        "add rax, {stack_size}",
        "and rax, -16",
        "mov rsp, rax",
        // Fake return address so RSP % 16 == 8 at entry.
        "push 0",
        // Terminates the frame-pointer chain for backtraces.
        "xor rbp, rbp",
        "mov rdi, r12",
        "jmp {rust_entry}",
        stack_sym = sym BOOT_STACK,
        stack_size = const KERNEL_STACK_SIZE,
        rust_entry = sym kernel_entry_on_boot_stack,
    );
}

/// Kernel entry running on [`BOOT_STACK`].
#[unsafe(no_mangle)]
pub extern "C" fn kernel_entry_on_boot_stack(boot_info: *const KernelBootInfo) -> ! {
    // SAFETY: the loader hands over a valid record that outlives the kernel.
    let bi = unsafe { &*boot_info };
    init::bring_up(bi);
    kernel_main()
}

/// Steady state: everything happens in interrupt handlers; we only drain
/// what they left behind.
fn kernel_main() -> ! {
    report_context();

    let mut scancodes = [0u8; interrupts::keyboard::SCANCODE_RING_SIZE];
    let mut last_second = 0;
    loop {
        let second = interrupts::timer::ticks() / 1000;
        if second != last_second {
            last_second = second;
            trace!("uptime {second} s");
        }

        let drained = interrupts::keyboard::drain(&mut scancodes);
        if drained.overflowed {
            warn!("keyboard buffer overflowed, scancodes were lost");
        }
        for code in &scancodes[..drained.count] {
            trace!("scancode {code:#04x}");
        }

        #[cfg(feature = "ps2-mouse")]
        if let Some(packet) = interrupts::mouse::take_packet() {
            let (dx, dy) = packet.delta();
            trace!(
                "mouse dx={dx} dy={dy} buttons L={} M={} R={}",
                packet.flags.left(),
                packet.flags.middle(),
                packet.flags.right()
            );
        }

        // SAFETY: CPL0; an interrupt wakes us up again.
        unsafe { core::arch::asm!("hlt", options(nomem, nostack, preserves_flags)) };
    }
}

fn report_context() {
    let Some(kernel) = context::KERNEL.get() else {
        warn!("kernel context missing after bring-up");
        return;
    };
    let ctx = kernel.lock_irq();
    info!(
        "Kernel bring-up complete: {:?} mode, IDT at {}, PML4 at {}, {} KiB free, {} KiB used, {} KiB reserved",
        ctx.interrupt_mode,
        ctx.idt,
        ctx.pml4,
        ctx.allocator.free_bytes() / 1024,
        ctx.allocator.used_bytes() / 1024,
        ctx.allocator.reserved_bytes() / 1024
    );
    info!(
        "framebuffer {}x{} at {:#x}",
        ctx.boot_info.framebuffer.width,
        ctx.boot_info.framebuffer.height,
        ctx.boot_info.framebuffer.base
    );
    if let Some(apic) = ctx.apic {
        info!(
            "LAPIC at {}, HPET at {}, timer {} ticks/ms",
            apic.lapic_base, apic.hpet_base, apic.ticks_per_ms
        );
    }
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    cli_stop_interrupts();
    if log::max_level() >= log::LevelFilter::Error {
        error!("KERNEL PANIC: {info}");
        // SAFETY: the kernel is built with frame pointers; the walk is capped.
        let walk = unsafe { FramePointerWalk::from_current(MAX_FRAMES) };
        for (depth, frame) in walk.enumerate() {
            error!("  #{depth:<2} rip={:#018x} rbp={:#018x}", frame.rip, frame.rbp);
        }
    } else {
        qemu_trace!("KERNEL PANIC: {info}\n");
    }
    halt_forever()
}

/// `cli; hlt` until the end of time.
pub fn halt_forever() -> ! {
    loop {
        cli_stop_interrupts();
        unsafe { core::arch::asm!("hlt", options(nomem, nostack, preserves_flags)) };
    }
}
