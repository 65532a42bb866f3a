use core::{
    cell::UnsafeCell,
    convert::{AsMut, AsRef},
    ops::{Deref, DerefMut, Drop},
    sync::atomic::{AtomicBool, Ordering},
};

pub struct SpinMutex<T> {
    locked: AtomicBool,
    pub inner: UnsafeCell<T>,
}
impl<T> SpinMutex<T> {
    pub const fn new(value: T) -> SpinMutex<T> {
        SpinMutex {
            locked: AtomicBool::new(false),
            inner: UnsafeCell::new(value),
        }
    }
    pub fn lock(&self) -> SpinMutexGuard<'_, T> {
        unsafe {
            crate::trap::push_intr_off();
        }

        while self.locked.swap(true, Ordering::Acquire) {
            core::hint::spin_loop();
        }

        SpinMutexGuard { mutex: self }
    }
    pub unsafe fn unlock(&self) {
        self.locked.store(false, Ordering::Release);

        unsafe {
            crate::trap::pop_intr_off();
        }
    }
    /// Acquire without producing a guard, for callers that already hold
    /// one (`SpinMutexGuard::sleep` reacquiring after a wakeup).
    unsafe fn lock_raw(&self) {
        crate::trap::push_intr_off();
        while self.locked.swap(true, Ordering::Acquire) {
            core::hint::spin_loop();
        }
    }
}
unsafe impl<T> Sync for SpinMutex<T> where T: Send {}

pub struct SpinMutexGuard<'m, T> {
    pub mutex: &'m SpinMutex<T>,
}
impl<'m, T> Deref for SpinMutexGuard<'m, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.mutex.inner.get() }
    }
}
impl<'m, T> DerefMut for SpinMutexGuard<'m, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.mutex.inner.get() }
    }
}
impl<'m, T> AsRef<T> for SpinMutexGuard<'m, T> {
    fn as_ref(&self) -> &T {
        self.deref()
    }
}
impl<'m, T> AsMut<T> for SpinMutexGuard<'m, T> {
    fn as_mut(&mut self) -> &mut T {
        self.deref_mut()
    }
}
impl<'m, T> Drop for SpinMutexGuard<'m, T> {
    fn drop(&mut self) {
        unsafe { self.mutex.unlock() }
    }
}

impl<'m, T> SpinMutexGuard<'m, T> {
    /// Same contract as `SpinlockGuard::sleep`: release, block on `chan`,
    /// reacquire. Lets condition-variable style waiters (the UART ring
    /// buffer, the console) block while holding a `SpinMutex` instead of
    /// a `Spinlock`.
    pub unsafe fn sleep(&self, chan: *mut core::ffi::c_void) {
        use crate::proc::{process::Process, scheduler::sched};
        use core::ptr::null_mut;

        let p = Process::current().expect("sleep outside process context");
        p.lock.lock_unguarded();
        self.mutex.unlock();

        p.chan = chan;
        p.state = crate::proc::process::ProcessState::Sleeping;

        sched();

        p.chan = null_mut();
        p.lock.unlock();

        self.mutex.lock_raw();
    }
}