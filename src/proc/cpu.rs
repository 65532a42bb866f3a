//! Per-CPU state: which process (if any) is running here, the context
//! `swtch()` returns to when that process yields the CPU back to the
//! scheduler, and the interrupt-disable nesting counter `sync::Spinlock`
//! is built on.

use super::{context::Context, process::Process};
use crate::riscv::r_tp;
use core::ptr::{addr_of_mut, null_mut};

/// Per-CPU state.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct Cpu {
    pub proc: *mut Process,
    /// swtch() here to enter scheduler()
    pub context: Context,
    /// Depth of push_intr_off() nesting.
    pub interrupt_disable_layers: i32,
    /// Were interrupts enabled before the outermost push_intr_off()?
    pub previous_interrupts_enabled: i32,
}
impl Cpu {
    pub const fn new() -> Cpu {
        Cpu {
            proc: null_mut(),
            context: Context::new(),
            interrupt_disable_layers: 0,
            previous_interrupts_enabled: 0,
        }
    }

    /// Return this CPU's state. Interrupts must be disabled, since
    /// `cpuid()` is only stable while the calling kernel thread can't
    /// be migrated mid-read.
    pub unsafe fn current() -> &'static mut Cpu {
        &mut *mycpu()
    }
}
impl Default for Cpu {
    fn default() -> Cpu {
        Cpu::new()
    }
}

pub static mut CPUS: [Cpu; crate::NCPU] = [Cpu::new(); crate::NCPU];

/// Which hart is this? Must be called with interrupts disabled, to
/// prevent a race with the process being migrated to a different CPU.
pub unsafe fn cpuid() -> i32 {
    r_tp() as i32
}

/// Return a pointer to the current CPU's `Cpu` struct. Interrupts must
/// be disabled.
pub unsafe fn mycpu() -> *mut Cpu {
    let id = cpuid();
    addr_of_mut!(CPUS[id as usize])
}
