//! Virtual memory boundary.
//!
//! Page table management, `uvmalloc`/`uvmcopy`/`copyout` and friends are
//! the out-of-scope VM collaborator (spec.md §1, §6). `proc::process`
//! calls these to size a process's address space and move bytes across
//! the user/kernel boundary; none of it is reimplemented here.

use core::ffi::c_void;

pub use crate::riscv::{Pagetable, Pte};

extern "C" {
    /// Build a fresh page table for a given process, mapping the
    /// trampoline page and the process's own trapframe below TRAPFRAME.
    /// Returns null on failure.
    pub fn proc_pagetable(p: *mut c_void) -> Pagetable;
    /// Tear down a process's page table, unmapping the trampoline and
    /// trapframe pages before freeing the rest of the user image.
    pub fn proc_freepagetable(pagetable: Pagetable, size: u64);

    /// Allocate physical memory and map it at the top of a process's
    /// existing image, growing it from `oldsz` to `newsz`. Returns the
    /// new size, or 0 on failure.
    pub fn uvmalloc(pagetable: Pagetable, oldsz: u64, newsz: u64, xperm: u64) -> u64;
    /// Deallocate user pages to bring the process size from `oldsz` to
    /// `newsz`. `newsz` need not be less than `oldsz`.
    pub fn uvmdealloc(pagetable: Pagetable, oldsz: u64, newsz: u64) -> u64;
    /// Create an empty user page table with no user memory.
    pub fn uvmcreate() -> Pagetable;
    /// Given a parent process's page table, copy its memory into a
    /// child's page table. Copies both the page table and the physical
    /// memory. Returns 0 on success, -1 on failure.
    pub fn uvmcopy(old: Pagetable, new: Pagetable, size: u64) -> i32;
    /// Free a process's page table, and the physical memory it refers
    /// to, assuming the first `size` bytes are mapped.
    pub fn uvmfree(pagetable: Pagetable, size: u64);
    /// Remove `count` mapped pages starting at `va`, which must be
    /// page-aligned. Optionally frees the physical memory.
    pub fn uvmunmap(pagetable: Pagetable, va: u64, count: u64, do_free: i32);
    /// Map `size` bytes starting at `va` to physical addresses starting
    /// at `pa` with permissions `perm`. Returns 0 on success, -1 if it
    /// ran out of page-table pages.
    pub fn mappages(pagetable: Pagetable, va: u64, size: u64, pa: u64, perm: u64) -> i32;
    /// Copy `n` bytes from kernel address `src` to user address
    /// `dst_va` in `pagetable`. Returns 0 on success, -1 on error.
    pub fn copyout(pagetable: Pagetable, dst_va: u64, src: *mut u8, n: u64) -> i32;
    /// Copy `n` bytes from user address `src_va` in `pagetable` to
    /// kernel address `dst`. Returns 0 on success, -1 on error.
    pub fn copyin(pagetable: Pagetable, dst: *mut u8, src_va: u64, n: u64) -> i32;

    /// Allocate one page of physical memory, or null on failure.
    pub fn kalloc() -> *mut u8;
    /// Free the page of physical memory pointed to by `pa`.
    pub fn kfree(pa: *mut u8);

    /// Fill `n` bytes starting at `dst` with `c`, like C's `memset`.
    pub fn memset(dst: *mut u8, c: i32, n: u32) -> *mut u8;
}
