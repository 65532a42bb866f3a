//! The process subsystem: table, MLFQ queues, dispatcher, and the
//! lifecycle hooks that tie them together.
//!
//! Lock acquisition order, enforced by convention rather than the type
//! system (spec.md §5, §9): `process::WAIT_LOCK` (global), then a
//! descriptor's own `Process::lock`, then the MLFQ bank's internal lock
//! (`mlfq::QUEUES`), then the pid allocator (`process::NEXT_PID`, an
//! atomic so it needs no separate lock). Never acquire in the reverse
//! order.

pub mod context;
pub mod cpu;
pub mod mlfq;
pub mod process;
pub mod scheduler;
pub mod trapframe;

pub use context::Context;
pub use trapframe::Trapframe;
