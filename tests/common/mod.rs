//! Helpers shared by the scenario tests.

#![allow(dead_code)]

use std::path::PathBuf;

use shm_range_lock::{FileHandle, LockType};

/// A per-process temp path, so concurrent test runs never collide on a
/// file identity (and therefore never share a segment).
pub fn unique_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("shm-range-lock-{}-{}", tag, std::process::id()))
}

pub fn my_pid() -> libc::pid_t {
    std::process::id() as libc::pid_t
}

/// Snapshot of the lock table as `(start, len, type)` triples, sorted by
/// position so assertions do not depend on table order.
pub fn geometry(handle: FileHandle) -> Vec<(libc::off_t, libc::off_t, LockType)> {
    let file = handle.lock().unwrap();
    let mut locks: Vec<_> = file
        .locks()
        .iter()
        .map(|l| (l.range().start(), l.range().len(), l.type_()))
        .collect();
    locks.sort_by_key(|&(start, len, _)| (start, len));
    locks
}

/// Waits for `pid` and returns its exit code, panicking on abnormal
/// termination.
pub fn wait_for(pid: libc::pid_t) -> i32 {
    let mut status = 0;
    let res = unsafe { libc::waitpid(pid, &mut status, 0) };
    assert_eq!(res, pid, "waitpid failed");
    assert!(
        libc::WIFEXITED(status),
        "child did not exit normally: status {}",
        status
    );
    libc::WEXITSTATUS(status)
}

pub fn pread_u32(fd: libc::c_int) -> u32 {
    let mut buf = [0u8; 4];
    let n = unsafe { libc::pread(fd, buf.as_mut_ptr() as *mut libc::c_void, 4, 0) };
    assert_eq!(n, 4, "pread failed");
    u32::from_ne_bytes(buf)
}

pub fn pwrite_u32(fd: libc::c_int, value: u32) {
    let buf = value.to_ne_bytes();
    let n = unsafe { libc::pwrite(fd, buf.as_ptr() as *const libc::c_void, 4, 0) };
    assert_eq!(n, 4, "pwrite failed");
}
