//! File system boundary.
//!
//! Process lifecycle code touches open files and the current-directory
//! inode (dup on fork, close on exit), but the file system itself — the
//! on-disk layout, the log, `namei` path resolution — is an opaque
//! collaborator out of scope here. Only the handful of entry points
//! `proc::process` calls against are declared.

use core::ffi::c_void;

/// Opaque in-memory file descriptor. Layout owned by the file system
/// collaborator; this crate only ever holds and copies pointers to it.
#[repr(C)]
pub struct File {
    _private: [u8; 0],
}

/// Opaque in-memory inode. Same treatment as `File`.
#[repr(C)]
pub struct Inode {
    _private: [u8; 0],
}

extern "C" {
    /// Increment a file's reference count, returning the same pointer.
    pub fn filedup(f: *mut File) -> *mut File;
    /// Close one reference to a file.
    pub fn fileclose(f: *mut File);
    /// Increment an inode's reference count, returning the same pointer.
    pub fn idup(ip: *mut Inode) -> *mut Inode;
    /// Drop a reference to an inode, freeing it if this was the last one.
    pub fn iput(ip: *mut Inode);
    /// Resolve a path to an inode.
    pub fn namei(path: *const c_void) -> *mut Inode;

    /// Start an FS transaction; must be paired with `end_op`.
    pub fn begin_op();
    /// End an FS transaction started with `begin_op`.
    pub fn end_op();
}

/// RAII wrapper around `begin_op`/`end_op`, so a transaction is always
/// closed even when the enclosed code returns early.
pub struct LogOperation;
impl LogOperation {
    pub fn new() -> LogOperation {
        unsafe { begin_op() };
        LogOperation
    }
}
impl Default for LogOperation {
    fn default() -> LogOperation {
        LogOperation::new()
    }
}
impl Drop for LogOperation {
    fn drop(&mut self) {
        unsafe { end_op() };
    }
}
