//! Architecture constants and register primitives.
//!
//! Only the subset of xv6's `riscv.h` that the scheduler core actually
//! touches: page-table/PTE types for the trapframe and process address
//! space fields, and the interrupt enable/disable primitives `sync` and
//! `trap` build their nesting counters on. Everything else (trap vector
//! setup, SATP, PMP, ...) belongs to the trap-entry and VM collaborators
//! out of scope for this crate (spec.md §1, §6).

pub type Pte = u64;
pub type Pagetable = *mut [Pte; 512];

/// Previous mode: 1 = Supervisor, 0 = User
pub const SSTATUS_SPP: u64 = 1 << 8;
/// Supervisor Previous Interrupt Enable
pub const SSTATUS_SPIE: u64 = 1 << 5;
/// Supervisor Interrupt Enable
pub const SSTATUS_SIE: u64 = 1 << 1;

/// Bytes per page
pub const PGSIZE: u64 = 4096;

pub const PTE_V: u64 = 1 << 0;
pub const PTE_R: u64 = 1 << 1;
pub const PTE_W: u64 = 1 << 2;
pub const PTE_X: u64 = 1 << 3;
pub const PTE_U: u64 = 1 << 4;

#[cfg(not(test))]
mod hart {
    use core::arch::asm;

    /// Which hart (core) is this? Read out of `tp`, which the trap-entry
    /// assembly keeps pinned to the hartid, per xv6 convention.
    #[inline(always)]
    pub unsafe fn r_tp() -> u64 {
        let x: u64;
        asm!("mv {}, tp", out(reg) x);
        x
    }

    #[inline(always)]
    unsafe fn w_sstatus(x: u64) {
        asm!("csrw sstatus, {}", in(reg) x);
    }

    #[inline(always)]
    unsafe fn r_sstatus() -> u64 {
        let x: u64;
        asm!("csrr {}, sstatus", out(reg) x);
        x
    }

    #[inline(always)]
    pub unsafe fn intr_on() {
        w_sstatus(r_sstatus() | super::SSTATUS_SIE);
    }

    #[inline(always)]
    pub unsafe fn intr_off() {
        w_sstatus(r_sstatus() & !super::SSTATUS_SIE);
    }

    #[inline(always)]
    pub unsafe fn intr_get() -> i32 {
        i32::from((r_sstatus() & super::SSTATUS_SIE) > 0)
    }

    /// Halt this hart until the next interrupt (idle task body).
    #[inline(always)]
    pub unsafe fn wfi() {
        asm!("wfi");
    }
}

/// Host-side stand-ins used only by `cargo test`, so the lock and
/// scheduler logic under test never has to special-case its call sites.
/// A single pretend hart, interrupts modeled as always enabled.
#[cfg(test)]
mod hart {
    use core::sync::atomic::{AtomicBool, Ordering};

    static TEST_INTERRUPTS_ENABLED: AtomicBool = AtomicBool::new(true);

    pub unsafe fn r_tp() -> u64 {
        0
    }
    pub unsafe fn intr_on() {
        TEST_INTERRUPTS_ENABLED.store(true, Ordering::SeqCst);
    }
    pub unsafe fn intr_off() {
        TEST_INTERRUPTS_ENABLED.store(false, Ordering::SeqCst);
    }
    pub unsafe fn intr_get() -> i32 {
        i32::from(TEST_INTERRUPTS_ENABLED.load(Ordering::SeqCst))
    }
    /// No actual hart to halt under test; a no-op stand-in.
    pub unsafe fn wfi() {}
}

pub use hart::{intr_get, intr_off, intr_on, r_tp, wfi};
