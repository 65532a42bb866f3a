//! The dispatcher: picks the next runnable descriptor and performs the
//! context switch (spec.md §4.2), plus the lifecycle hooks that hinge on
//! it — `sleep`/`wakeup`, `yield`, and the per-CPU idle loop (§4.5, §4.6).
//!
//! Grounded in the teacher's `proc/scheduler.rs` draft and in
//! `original_source/kernel/proc.c`'s `scheduler`/`sched`/`sleep`/`wakeup`/
//! `yield`.

use super::{
    context::Context,
    cpu::Cpu,
    mlfq,
    process::{Process, ProcessState, IDLE_SLOT, PROC},
};
use crate::{
    riscv::intr_get,
    sync::spinlock::{Spinlock, SpinlockGuard},
    trap::ticks,
};
use core::{
    ffi::c_void,
    ptr::{addr_of_mut, null_mut},
};

extern "C" {
    /// Save callee-preserved registers into `old`, load them from `new`.
    /// The single audited stack-switch boundary (spec.md §9); everything
    /// above it is safe.
    pub fn swtch(old: *mut Context, new: *mut Context);
}

/// Per-CPU scheduler loop (spec.md §4.6). Runs forever on its hart:
/// selects a descriptor (falling back to the idle task), switches into
/// it, and on resumption loops back to pick again.
pub unsafe fn scheduler() -> ! {
    let cpu = Cpu::current();
    cpu.proc = null_mut();

    loop {
        crate::riscv::intr_on();

        match mlfq::dequeue_any(0) {
            Some((p, _level)) => {
                let p = &mut *p;
                let _guard = p.lock.lock();

                if p.state == ProcessState::Runnable {
                    p.state = ProcessState::Running;
                    cpu.proc = addr_of_mut!(*p);
                    swtch(addr_of_mut!(cpu.context), addr_of_mut!(p.context));
                    cpu.proc = null_mut();
                }
                // else: stale entry raced out from under us; drop it.
            }
            None => {
                // Nothing runnable: fall back to the idle task (spec.md
                // §4.6). It is never enqueued, so this is the only path
                // that ever dispatches it.
                let idle = &mut PROC[IDLE_SLOT];
                let _guard = idle.lock.lock();
                idle.state = ProcessState::Running;
                cpu.proc = addr_of_mut!(*idle);
                swtch(addr_of_mut!(cpu.context), addr_of_mut!(idle.context));
                cpu.proc = null_mut();
                idle.state = ProcessState::Runnable;
                crate::riscv::wfi();
            }
        }
    }
}

/// The dispatcher proper (spec.md §4.2). Called with the current
/// descriptor's lock held and interrupts already disabled by that lock.
/// Re-enqueues the outgoing descriptor (unless it's the idle task or
/// already left RUNNABLE/ZOMBIE by the caller) and switches back to
/// `scheduler()`, which will pick the next one.
///
/// # Panics
/// If called with more or fewer than one interrupt-disable layer held,
/// on a descriptor that still believes it's RUNNING, or with interrupts
/// enabled — these are the dispatcher-reentrancy invariants (spec.md §9).
#[no_mangle]
pub unsafe extern "C" fn sched() {
    let p = Process::current().expect("sched outside process context");
    let cpu = Cpu::current();

    if cpu.interrupt_disable_layers != 1 {
        panic!("sched locks");
    } else if p.state == ProcessState::Running {
        panic!("sched running");
    } else if intr_get() > 0 {
        panic!("sched interruptible");
    }

    let previous_interrupts_enabled = cpu.previous_interrupts_enabled;
    swtch(addr_of_mut!(p.context), addr_of_mut!(cpu.context));
    cpu.previous_interrupts_enabled = previous_interrupts_enabled;
}

/// Give up the CPU for one scheduling round (spec.md §4.5). A ZOMBIE
/// process must not be re-enqueued — it's picked up directly by the next
/// dispatch pass once its state is visible.
pub unsafe fn r#yield() {
    let p = Process::current().expect("yield outside process context");
    let _guard = p.lock.lock();

    if p.state != ProcessState::Zombie {
        p.state = ProcessState::Runnable;
        let priority = mlfq::next_priority(p);
        mlfq::enqueue(addr_of_mut!(*p), priority, ticks());
    }

    sched();
}

/// Sleep until `wakeup(chan)` is called elsewhere (spec.md §4.5). Atomic
/// with respect to concurrent wakeups because the descriptor's lock is
/// held from before `chan`/`state` are set until after `sched()` returns.
pub unsafe fn sleep(chan: *mut c_void) {
    let p = Process::current().expect("sleep outside process context");
    let _guard = p.lock.lock();

    p.chan = chan;
    p.state = ProcessState::Sleeping;

    sched();

    p.chan = null_mut();
}

/// `lk` must already be held by the caller; reconstruct a guard over it
/// so `SpinlockGuard::sleep` can release-and-reacquire around the switch.
/// Exposed for the FFI boundary (`sync` guards also expose `.sleep()`
/// directly for Rust callers).
#[no_mangle]
pub unsafe extern "C" fn sleep_lock(chan: *mut c_void, lock: *mut Spinlock) {
    let lock: &Spinlock = &*lock;
    let guard = SpinlockGuard { lock };
    guard.sleep(chan);
    core::mem::forget(guard);
}

/// Wake every descriptor sleeping on `chan`, except the caller and the
/// idle task, enqueueing each at priority 0 (spec.md §4.5: woken
/// processes are heuristically treated as interactive).
#[no_mangle]
pub unsafe extern "C" fn wakeup(chan: *mut c_void) {
    let now = ticks();
    for (i, p) in PROC.iter_mut().enumerate() {
        if i == IDLE_SLOT || p.is_current() {
            continue;
        }

        let _guard = p.lock.lock();
        if p.state == ProcessState::Sleeping && p.chan == chan {
            p.state = ProcessState::Runnable;
            mlfq::enqueue(addr_of_mut!(*p), 0, now);
        }
    }
}
