pub mod spinlock;
pub mod spinmutex;

pub use spinlock::{Spinlock, SpinlockGuard};
pub use spinmutex::{SpinMutex, SpinMutexGuard};
