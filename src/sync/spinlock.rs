//! Interrupt-disabling spinlock with an RAII guard.
//!
//! Combines the teacher's two unwired drafts: the CPU-holder bookkeeping
//! from the original `spinlock.rs` (needed so `sched()` can assert the
//! caller already holds the process lock) and the guard-based
//! `lock()`/`Drop` pairing from `sync/spinlock.rs`, so callers never have
//! to hand-balance `push_off`/`pop_off` the way xv6's C does.

use crate::{
    proc::cpu::{mycpu, Cpu},
    trap::{pop_intr_off, push_intr_off},
};
use core::{
    ptr::null_mut,
    sync::atomic::{AtomicBool, AtomicPtr, Ordering},
};

pub struct Spinlock {
    locked: AtomicBool,
    /// Which CPU holds this lock, for `held_by_current_cpu`. Only
    /// meaningful while `locked` is true.
    holder: AtomicPtr<Cpu>,
}
impl Spinlock {
    pub const fn new() -> Spinlock {
        Spinlock {
            locked: AtomicBool::new(false),
            holder: AtomicPtr::new(null_mut()),
        }
    }

    /// Whether this CPU currently holds the lock. Interrupts must be off.
    pub fn held_by_current_cpu(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
            && self.holder.load(Ordering::Relaxed) == unsafe { mycpu() }
    }

    /// Acquire without producing a guard. Used where the unlock happens
    /// from a different call frame than the lock (e.g. `sleep`).
    pub unsafe fn lock_unguarded(&self) {
        push_intr_off();

        if self.held_by_current_cpu() {
            panic!("Spinlock: acquire twice by the same CPU");
        }

        while self.locked.swap(true, Ordering::Acquire) {
            core::hint::spin_loop();
        }

        self.holder.store(mycpu(), Ordering::Relaxed);
    }

    pub fn lock(&self) -> SpinlockGuard<'_> {
        unsafe {
            self.lock_unguarded();
        }
        SpinlockGuard { lock: self }
    }

    pub unsafe fn unlock(&self) {
        if !self.held_by_current_cpu() {
            panic!("Spinlock: release from a different CPU");
        }
        self.holder.store(null_mut(), Ordering::Relaxed);
        self.locked.store(false, Ordering::Release);

        pop_intr_off();
    }
}
impl Default for Spinlock {
    fn default() -> Spinlock {
        Spinlock::new()
    }
}
unsafe impl Sync for Spinlock {}

pub struct SpinlockGuard<'l> {
    pub lock: &'l Spinlock,
}
impl<'l> SpinlockGuard<'l> {
    /// Atomically release this lock and put the current process to sleep
    /// on `chan`, reacquiring the lock before returning. Mirrors xv6's
    /// `sleep(chan, lk)`: the caller's lock variable is valid again on
    /// return, so ordinary RAII unlock on drop still applies once.
    pub unsafe fn sleep(&self, chan: *mut core::ffi::c_void) {
        use crate::proc::{process::Process, scheduler::sched};

        let p = Process::current().expect("sleep outside process context");
        p.lock.lock_unguarded();
        self.lock.unlock();

        p.chan = chan;
        p.state = crate::proc::process::ProcessState::Sleeping;

        sched();

        p.chan = null_mut();
        p.lock.unlock();

        self.lock.lock_unguarded();
    }
}
impl<'l> Drop for SpinlockGuard<'l> {
    fn drop(&mut self) {
        unsafe { self.lock.unlock() }
    }
}
