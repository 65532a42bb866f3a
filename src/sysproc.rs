//! Process-related syscalls (spec.md §6 syscall surface). Argument
//! fetching reads straight out of the calling process's trapframe `a0..a5`
//! registers — the syscall dispatch table itself (matching a trapframe's
//! `a7` to one of these handlers) is part of the opaque trap-entry
//! collaborator and lives outside this crate.

use crate::{
    proc::process::Process,
    trap::{ticks, TICKS},
};
use core::ptr::addr_of;

unsafe fn argraw(n: usize) -> u64 {
    let p = Process::current().expect("syscall outside process context");
    let tf = &*p.trapframe;
    match n {
        0 => tf.a0,
        1 => tf.a1,
        2 => tf.a2,
        3 => tf.a3,
        4 => tf.a4,
        5 => tf.a5,
        _ => panic!("argraw"),
    }
}

unsafe fn argint(n: usize) -> i32 {
    argraw(n) as i32
}

unsafe fn argaddr(n: usize) -> u64 {
    argraw(n)
}

#[no_mangle]
pub unsafe extern "C" fn sys_exit() -> u64 {
    let status = argint(0);
    Process::current()
        .expect("syscall outside process context")
        .exit(status)
}

#[no_mangle]
pub unsafe extern "C" fn sys_getpid() -> u64 {
    Process::current().expect("syscall outside process context").pid as u64
}

#[no_mangle]
pub unsafe extern "C" fn sys_fork() -> u64 {
    match Process::fork() {
        Ok(pid) => pid as u64,
        Err(_) => -1i64 as u64,
    }
}

#[no_mangle]
pub unsafe extern "C" fn sys_wait() -> u64 {
    let addr = argaddr(0);
    let p = Process::current().expect("syscall outside process context");
    match p.wait_for_child(addr) {
        Ok(pid) => pid as u64,
        Err(_) => -1i64 as u64,
    }
}

#[no_mangle]
pub unsafe extern "C" fn sys_sbrk() -> u64 {
    let n = argint(0);
    let p = Process::current().expect("syscall outside process context");
    let addr = p.memory_allocated;

    match p.grow_memory(n) {
        Ok(()) => addr,
        Err(_) => -1i64 as u64,
    }
}

/// Suspend the calling process for `n` ticks, sleeping on the global
/// tick counter and rechecking `killed` on every wakeup.
#[no_mangle]
pub unsafe extern "C" fn sys_sleep() -> u64 {
    let n = argint(0);
    let p = Process::current().expect("syscall outside process context");

    let guard = TICKS.lock();
    let target = *guard + n.max(0) as u32;
    while *guard < target {
        if p.is_killed() {
            return -1i64 as u64;
        }
        guard.sleep(addr_of!(TICKS).cast_mut().cast());
    }
    0
}

#[no_mangle]
pub unsafe extern "C" fn sys_kill() -> u64 {
    let pid = argint(0);
    if Process::kill(pid) {
        0
    } else {
        -1i64 as u64
    }
}

/// Returns how many clock tick interrupts have occurred since boot.
#[no_mangle]
pub unsafe extern "C" fn sys_uptime() -> u64 {
    ticks() as u64
}
