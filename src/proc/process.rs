//! The process table and the lifecycle hooks that mutate it: `alloc`,
//! `fork`, `exit`, `wait`, `kill`, `growproc`, `userinit`, `procdump`.
//!
//! Grounded in the teacher's `proc/process.rs` draft, generalized from a
//! single fixed-priority run queue to the MLFQ bank in `mlfq.rs`, and in
//! `original_source/kernel/proc.c`'s `fork`/`exit`/`wait`/`kill`/
//! `userinit`/`procdump`.

#![allow(clippy::comparison_chain)]

use super::{cpu::Cpu, mlfq, scheduler::{sched, wakeup}, trapframe::Trapframe, context::Context};
use crate::{
    console::uprintln,
    fs::{fileclose, filedup, idup, iput, File, Inode, LogOperation},
    riscv::{Pagetable, PGSIZE, PTE_W},
    sync::Spinlock,
    trap::ticks,
    vm::{
        copyout, kalloc, kfree, memset, proc_freepagetable, proc_pagetable, uvmalloc, uvmcopy,
        uvmdealloc,
    },
};
use core::{
    ffi::c_void,
    ptr::{addr_of, addr_of_mut, null_mut},
    sync::atomic::{AtomicI32, Ordering},
};

extern "C" {
    /// Returns into `usertrapret`, set up as the child's initial resume
    /// point by `Process::alloc`. Out-of-scope trap-entry collaborator.
    pub fn forkret();
    /// Installs the first user image into a freshly allocated address
    /// space. Out-of-scope VM collaborator.
    pub fn uvmfirst(pagetable: Pagetable, code: *const u8, size: u32);
}

/// Index of the always-runnable idle task (SPEC_FULL.md §4.6). Never
/// handed out by `Process::alloc`.
pub const IDLE_SLOT: usize = 0;

pub static NEXT_PID: AtomicI32 = AtomicI32::new(1);
pub static WAIT_LOCK: Spinlock = Spinlock::new();

/// The first real process, allocated by `userinit`. Orphans are
/// reparented here, distinct from the idle task at `IDLE_SLOT` (which
/// never calls `wait` and isn't a valid reap target).
pub static mut INITPROC: *mut Process = null_mut();

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum ProcessState {
    #[default]
    Unused,
    Used,
    Sleeping,
    Runnable,
    Running,
    Zombie,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ProcessError {
    MaxProcesses,
    Allocation,
    NoChildren,
    Killed,
    PageError,
}

/// Per-process descriptor.
#[repr(C)]
pub struct Process {
    pub lock: Spinlock,

    // p.lock must be held when using these:
    pub state: ProcessState,
    /// If non-null, sleeping on this channel.
    pub chan: *mut c_void,
    /// Nonzero once killed.
    pub killed: i32,
    /// Exit status to be returned to the parent's `wait`.
    pub exit_status: i32,
    pub pid: i32,

    /// MLFQ priority level, [0, NMLFQ).
    pub priority: usize,
    /// Ticks consumed at `priority` since the last time it was (re-)set.
    pub ticks_in_queue: u32,
    /// Tick value when placed into its current queue; aging watches this.
    pub entry_time: u32,

    // wait_lock must be held when using this:
    pub parent: *mut Process,

    // Private to the process; p.lock need not be held.
    pub kernel_stack: u64,
    pub memory_allocated: u64,
    pub pagetable: Pagetable,
    pub trapframe: *mut Trapframe,
    pub context: Context,
    pub open_files: [*mut File; crate::NOFILE],
    pub current_dir: *mut Inode,
    pub name: [u8; 16],
}
impl Process {
    pub const fn new() -> Process {
        Process {
            lock: Spinlock::new(),
            state: ProcessState::Unused,
            chan: null_mut(),
            killed: 0,
            exit_status: 0,
            pid: 0,
            priority: 0,
            ticks_in_queue: 0,
            entry_time: 0,
            parent: null_mut(),
            kernel_stack: 0,
            memory_allocated: 0,
            pagetable: null_mut(),
            trapframe: null_mut(),
            context: Context::new(),
            open_files: [null_mut(); crate::NOFILE],
            current_dir: null_mut(),
            name: [0u8; 16],
        }
    }
    /// A constant usable in array-repeat position (`[Process::NEW; N]`)
    /// since `Process` itself doesn't implement `Copy`.
    pub const NEW: Process = Process::new();

    pub fn current() -> Option<&'static mut Process> {
        let _guard = crate::trap::InterruptBlocker::new();
        let p = unsafe { Cpu::current() }.proc;
        if p.is_null() {
            None
        } else {
            unsafe { Some(&mut *p) }
        }
    }
    pub fn is_current(&self) -> bool {
        addr_of!(*self).cast_mut() == unsafe { Cpu::current() }.proc
    }

    fn alloc_pid() -> i32 {
        NEXT_PID.fetch_add(1, Ordering::SeqCst)
    }

    /// Look in the process table for an `UNUSED` slot (skipping the
    /// idle task at `IDLE_SLOT`). If found, initialize it enough to run
    /// in the kernel and return with its lock held. Errs if the table
    /// is full or a page allocation fails.
    pub unsafe fn alloc() -> Result<&'static mut Process, ProcessError> {
        let mut index: Option<usize> = None;
        for (i, p) in PROC.iter_mut().enumerate() {
            if i == IDLE_SLOT {
                continue;
            }
            p.lock.lock_unguarded();
            if p.state == ProcessState::Unused {
                index = Some(i);
                break;
            } else {
                p.lock.unlock();
            }
        }
        let Some(index) = index else {
            return Err(ProcessError::MaxProcesses);
        };

        let p: &mut Process = &mut PROC[index];
        p.pid = Process::alloc_pid();
        p.state = ProcessState::Used;

        p.trapframe = kalloc() as *mut Trapframe;
        if p.trapframe.is_null() {
            p.free();
            p.lock.unlock();
            return Err(ProcessError::Allocation);
        }

        p.pagetable = proc_pagetable(addr_of_mut!(*p).cast());
        if p.pagetable.is_null() {
            p.free();
            p.lock.unlock();
            return Err(ProcessError::Allocation);
        }

        memset(
            addr_of_mut!(p.context).cast(),
            0,
            core::mem::size_of::<Context>() as u32,
        );
        p.context.ra = forkret as usize as u64;
        p.context.sp = p.kernel_stack + PGSIZE;

        Ok(p)
    }

    /// Free a process and everything hanging off it, including user
    /// pages. `self.lock` must be held.
    pub unsafe fn free(&mut self) {
        if !self.trapframe.is_null() {
            kfree(self.trapframe.cast());
        }
        self.trapframe = null_mut();
        if !self.pagetable.is_null() {
            proc_freepagetable(self.pagetable, self.memory_allocated);
        }
        self.pagetable = null_mut();
        self.memory_allocated = 0;
        self.pid = 0;
        self.parent = null_mut();
        self.chan = null_mut();
        self.killed = 0;
        self.exit_status = 0;
        self.name = [0u8; 16];
        self.priority = 0;
        self.ticks_in_queue = 0;
        self.entry_time = 0;
        self.state = ProcessState::Unused;
    }

    /// Grow or shrink user memory by `num_bytes`. Purely a VM operation;
    /// does not touch scheduling state.
    pub unsafe fn grow_memory(&mut self, num_bytes: i32) -> Result<(), ProcessError> {
        let mut size = self.memory_allocated;

        if num_bytes > 0 {
            size = uvmalloc(
                self.pagetable,
                size,
                size.wrapping_add(num_bytes as u64),
                PTE_W,
            );
            if size == 0 {
                return Err(ProcessError::Allocation);
            }
        } else if num_bytes < 0 {
            size = uvmdealloc(self.pagetable, size, size.wrapping_add(num_bytes as u64));
        }

        self.memory_allocated = size;
        Ok(())
    }

    /// Create a new process, copying the parent's address space,
    /// trapframe, open files, and cwd. Returns the child's pid to the
    /// parent (the child's own `a0` is set to 0, so it observes 0 from
    /// the same syscall on its own first return).
    pub unsafe fn fork() -> Result<i32, ProcessError> {
        let parent = Process::current().unwrap();
        let child = Process::alloc()?;

        if uvmcopy(parent.pagetable, child.pagetable, parent.memory_allocated) < 0 {
            child.free();
            child.lock.unlock();
            return Err(ProcessError::Allocation);
        }
        child.memory_allocated = parent.memory_allocated;

        *child.trapframe = *parent.trapframe;
        (*child.trapframe).a0 = 0;

        for (i, file) in parent.open_files.iter().enumerate() {
            if !file.is_null() {
                child.open_files[i] = filedup(parent.open_files[i]);
            }
        }
        child.current_dir = idup(parent.current_dir);
        child.name = parent.name;

        let pid = child.pid;

        child.lock.unlock();
        {
            let _guard = WAIT_LOCK.lock();
            child.parent = addr_of!(*parent).cast_mut();
        }

        // Child inherits the parent's priority with fresh quantum/entry
        // bookkeeping (SPEC_FULL.md §4.5), then joins the run queue.
        let inherited_priority = parent.priority;
        {
            let _guard = child.lock.lock();
            child.state = ProcessState::Runnable;
        }
        mlfq::enqueue(addr_of_mut!(*child), inherited_priority, ticks());

        Ok(pid)
    }

    /// Pass `self`'s abandoned children to init. Caller must hold
    /// `WAIT_LOCK`.
    pub unsafe fn reparent(&self) {
        for p in PROC.iter_mut() {
            if p.parent == addr_of!(*self).cast_mut() {
                p.parent = INITPROC;
                wakeup(INITPROC.cast());
            }
        }
    }

    /// Exit the current process. Does not return. An exited process
    /// stays a zombie until its parent calls `wait`.
    pub unsafe fn exit(&mut self, status: i32) -> ! {
        if addr_of_mut!(*self) == INITPROC {
            panic!("init exiting");
        }

        mlfq::remove(addr_of_mut!(*self));

        for file in self.open_files.iter_mut() {
            if !file.is_null() {
                fileclose(*file);
                *file = null_mut();
            }
        }

        {
            let _operation = LogOperation::new();
            iput(self.current_dir);
        }
        self.current_dir = null_mut();

        {
            let _guard = WAIT_LOCK.lock();

            self.reparent();
            wakeup(self.parent.cast());

            self.lock.lock_unguarded();
            self.exit_status = status;
            self.state = ProcessState::Zombie;
        }

        sched();
        unreachable!();
    }

    /// Wait for a child to exit, returning its pid. Errs with
    /// `NoChildren` if `self` has none, `Killed` if `self` is killed
    /// while waiting.
    pub unsafe fn wait_for_child(&mut self, addr: u64) -> Result<i32, ProcessError> {
        let guard = WAIT_LOCK.lock();

        loop {
            let mut has_children = false;

            for p in PROC.iter_mut() {
                if p.parent == addr_of_mut!(*self) {
                    has_children = true;

                    p.lock.lock_unguarded();

                    if p.state == ProcessState::Zombie {
                        let pid = p.pid;

                        if addr != 0
                            && copyout(
                                self.pagetable,
                                addr,
                                addr_of_mut!(p.exit_status).cast(),
                                core::mem::size_of::<i32>() as u64,
                            ) < 0
                        {
                            p.lock.unlock();
                            return Err(ProcessError::PageError);
                        }

                        p.free();
                        p.lock.unlock();
                        return Ok(pid);
                    }

                    p.lock.unlock();
                }
            }

            if !has_children {
                return Err(ProcessError::NoChildren);
            } else if self.is_killed() {
                return Err(ProcessError::Killed);
            }

            guard.sleep(addr_of_mut!(*self).cast());
        }
    }

    /// Find the process with pid `pid` and mark it killed, waking it
    /// if it's sleeping. Returns whether a matching process was found.
    pub unsafe fn kill(pid: i32) -> bool {
        for (i, p) in PROC.iter_mut().enumerate() {
            if i == IDLE_SLOT {
                continue;
            }

            let _guard = p.lock.lock();

            if p.pid == pid {
                p.killed = 1;

                if p.state == ProcessState::Sleeping {
                    p.state = ProcessState::Runnable;
                    let priority = p.priority;
                    mlfq::enqueue(addr_of_mut!(*p), priority, ticks());
                }

                return true;
            }
        }
        false
    }
    pub fn is_killed(&self) -> bool {
        let _guard = self.lock.lock();
        self.killed > 0
    }
    pub fn set_killed(&mut self, killed: bool) {
        let _guard = self.lock.lock();
        self.killed = if killed { 1 } else { 0 };
    }
}
impl Default for Process {
    fn default() -> Process {
        Process::new()
    }
}
unsafe impl Sync for Process {}

pub static mut PROC: [Process; crate::NPROC] = [Process::NEW; crate::NPROC];

/// Perform early process-subsystem initialization: clear kernel-stack
/// fields. Called once at boot, before `userinit`.
pub unsafe fn procinit() {
    for p in PROC.iter_mut() {
        p.kernel_stack = 0;
    }
}

/// Install the idle task at `IDLE_SLOT` (pid 0, lowest priority,
/// always runnable, never enqueued — SPEC_FULL.md §4.6) and allocate
/// the first real user process at priority 0.
pub unsafe fn userinit() {
    let idle = &mut PROC[IDLE_SLOT];
    idle.pid = 0;
    idle.name[0..4].copy_from_slice(b"idle");
    idle.priority = crate::NMLFQ - 1;
    idle.state = ProcessState::Runnable;

    let p = Process::alloc().expect("userinit: process table should be empty");
    uvmfirst(p.pagetable, core::ptr::null(), 0);
    p.memory_allocated = PGSIZE;
    p.name[0..4].copy_from_slice(b"init");
    p.current_dir = namei_root();

    INITPROC = addr_of_mut!(*p);
    p.state = ProcessState::Runnable;
    mlfq::enqueue(addr_of_mut!(*p), 0, ticks());
    p.lock.unlock();
}

unsafe fn namei_root() -> *mut Inode {
    crate::fs::namei(b"/\0".as_ptr().cast())
}

/// Print a process listing to the console for debugging. Runs when a
/// user types Ctrl-P. No lock taken, to avoid wedging an already-stuck
/// machine further.
pub unsafe fn procdump() {
    uprintln!("\nprocdump:");
    for p in PROC.iter() {
        if p.state != ProcessState::Unused {
            let name = core::str::from_utf8(&p.name)
                .unwrap_or("?")
                .trim_end_matches('\0');
            uprintln!(
                "    {}: {:?} priority={} {}",
                p.pid,
                p.state,
                p.priority,
                name
            );
        }
    }
}
