//! Timer tick bookkeeping and the interrupt-disable nesting counter.
//!
//! The trap entry/return path itself (`usertrap`, `kerneltrap`, `devintr`,
//! the trampoline) is an opaque out-of-scope collaborator (spec.md §1,
//! §6): only its two hooks into the scheduler are implemented here —
//! incrementing `TICKS` and running `age_boost` on a cadence, and the
//! `push_intr_off`/`pop_intr_off` nesting counter every `Spinlock`
//! acquire/release is built on.

use crate::{
    proc::{cpu::Cpu, mlfq, process::Process, scheduler::wakeup},
    riscv::{intr_get, intr_off, intr_on},
    sync::SpinMutex,
    AGE_BOOST_PERIOD,
};
use core::ptr::addr_of;

extern "C" {
    /// Supplied by the out-of-scope trap-entry collaborator; not called
    /// from anywhere in this crate, declared only so linkers building the
    /// full kernel can resolve it from the same symbol table.
    pub fn kernelvec();
}

/// Monotonic tick counter, incremented by the timer ISR. Used for
/// `entry_time`/aging and `sys_uptime`/`sys_sleep`.
pub static TICKS: SpinMutex<u32> = SpinMutex::new(0);

/// Called by the timer interrupt handler on every tick. Advances
/// `TICKS`, wakes anyone sleeping on the tick counter (`sys_sleep`), runs
/// the aging sweep every `AGE_BOOST_PERIOD` ticks, and bumps the calling
/// hart's running descriptor's quantum counter (spec.md §4.3: "on every
/// timer tick for the running descriptor, the dispatcher subsystem
/// increments `ticks_in_queue`").
pub fn clockintr() {
    let mut ticks = TICKS.lock();
    *ticks += 1;
    let now = *ticks;
    drop(ticks);

    unsafe {
        wakeup(addr_of!(TICKS).cast_mut().cast());

        if let Some(p) = Process::current() {
            mlfq::tick_current(p);
        }
    }

    if now % AGE_BOOST_PERIOD == 0 {
        mlfq::age_boost(now);
    }
}

/// Current value of the tick counter.
pub fn ticks() -> u32 {
    *TICKS.lock()
}

/// RAII interrupt-disable guard: disables interrupts for as long as it's
/// alive, restoring the CPU's previous interrupt state on drop. Nests:
/// only the outermost guard actually re-enables interrupts.
#[derive(Default)]
pub struct InterruptBlocker;
impl InterruptBlocker {
    pub fn new() -> InterruptBlocker {
        unsafe { push_intr_off() };
        InterruptBlocker
    }
}
impl Drop for InterruptBlocker {
    fn drop(&mut self) {
        unsafe { pop_intr_off() };
    }
}
impl !Send for InterruptBlocker {}

/// push_intr_off/pop_intr_off are like intr_off()/intr_on() except that
/// they are matched: it takes two pop_intr_off()s to undo two
/// push_intr_off()s. Also, if interrupts are initially off, then
/// push_intr_off, pop_intr_off leaves them off.
pub unsafe fn push_intr_off() {
    let old = intr_get();
    let cpu = Cpu::current();

    intr_off();
    if cpu.interrupt_disable_layers == 0 {
        cpu.previous_interrupts_enabled = old;
    }
    cpu.interrupt_disable_layers += 1;
}

pub unsafe fn pop_intr_off() {
    let cpu = Cpu::current();

    if intr_get() == 1 {
        panic!("pop_intr_off - interruptible");
    } else if cpu.interrupt_disable_layers < 1 {
        panic!("pop_intr_off");
    }

    cpu.interrupt_disable_layers -= 1;

    if cpu.interrupt_disable_layers == 0 && cpu.previous_interrupts_enabled == 1 {
        intr_on();
    }
}
