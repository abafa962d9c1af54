//! POSIX shared-memory segments holding one fixed-layout record each.
//!
//! A segment is named after the identity of the underlying file, attached
//! or created on open, flushed after every mutation and unlinked by the
//! last process to let go of the file. Mappings are never unmapped: once a
//! process has attached a segment, the mapping stays valid until the
//! process exits, even after the name is gone.

use std::ffi::CString;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::ptr::NonNull;

use crate::prelude::*;

/// Prefix of every segment name published by this crate.
const SHM_PREFIX: &str = "f";

/// Deterministic segment name for a file identity. Derived from the device
/// and inode numbers, never from the path, so hard links, symlinks and
/// re-opens of the same file all converge on one segment.
pub fn segment_name(dev: libc::dev_t, ino: libc::ino_t) -> String {
    format!("/{}_{}_{}", SHM_PREFIX, dev, ino)
}

fn shm_open(name: &str, oflag: c_int, mode: mode_t) -> Result<OwnedFd> {
    let c_name = CString::new(name).map_err(|_| Error::InvalidInput("segment name"))?;
    let fd = unsafe { libc::shm_open(c_name.as_ptr(), oflag, mode) };
    if fd < 0 {
        return Err(Error::last_os("shm_open"));
    }
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

fn map_fd<T>(fd: &OwnedFd) -> Result<NonNull<T>> {
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            mem::size_of::<T>(),
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED,
            fd.as_raw_fd(),
            0,
        )
    };
    if ptr == libc::MAP_FAILED {
        return Err(Error::last_os("mmap"));
    }
    // mmap never returns null on success
    Ok(unsafe { NonNull::new_unchecked(ptr as *mut T) })
}

/// Maps the existing segment published under `name`; fails if there is
/// none. The backing fd is closed once the mapping is established.
pub fn attach<T>(name: &str) -> Result<NonNull<T>> {
    let fd = shm_open(name, libc::O_RDWR, 0)?;
    map_fd(&fd)
}

/// Creates the segment under `name`, sizes it for one `T` and maps it.
/// The fresh mapping is zero-filled; the caller is responsible for
/// initializing the record before peers can observe it.
pub fn create<T>(name: &str) -> Result<NonNull<T>> {
    let fd = shm_open(name, libc::O_RDWR | libc::O_CREAT, 0o777)?;
    if unsafe { libc::ftruncate(fd.as_raw_fd(), mem::size_of::<T>() as off_t) } < 0 {
        let err = Error::last_os("ftruncate");
        let _ = unlink(name);
        return Err(err);
    }
    map_fd(&fd).map_err(|err| {
        let _ = unlink(name);
        err
    })
}

/// Flushes the mapped record so peers observe its current contents.
pub fn flush<T>(ptr: NonNull<T>) -> Result<()> {
    let code = unsafe {
        libc::msync(
            ptr.as_ptr() as *mut libc::c_void,
            mem::size_of::<T>(),
            libc::MS_SYNC | libc::MS_INVALIDATE,
        )
    };
    if code < 0 {
        return Err(Error::last_os("msync"));
    }
    Ok(())
}

/// Removes the segment name. Established mappings survive; a new attach
/// under the same name will fail until some process re-creates it.
pub fn unlink(name: &str) -> Result<()> {
    let c_name = CString::new(name).map_err(|_| Error::InvalidInput("segment name"))?;
    if unsafe { libc::shm_unlink(c_name.as_ptr()) } < 0 {
        return Err(Error::last_os("shm_unlink"));
    }
    Ok(())
}
