//! Record locks for open file descriptions, shared across processes.
//!
//! POSIX advisory record locks (`fcntl` with `F_SETLK`) have a well-known
//! defect: closing *any* descriptor referring to an open file description
//! drops every lock the process holds on that file, including locks placed
//! through other descriptors. This crate keeps the lock state out of the
//! kernel instead: one POSIX shared-memory segment per `(device, inode)`
//! holds the lock table of the file, and each lock records the full set of
//! `(pid, fd)` owners entitled to it. Locks therefore survive the close of
//! unrelated duplicate descriptors, extend to duplicates and forked
//! children explicitly, and can be reclaimed from owners that died without
//! unlocking.
//!
//! The entry points mirror the syscalls they stand in for: [`do_open`],
//! [`do_fcntl`], [`do_close`], [`do_dup`], [`do_dup2`], [`do_fork`].
//! All locking is non-blocking: a request conflicting with a lock held by
//! a live process fails with [`Error::WouldBlock`] and the caller decides
//! whether to retry.

#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

pub mod error;
pub mod fs;
pub mod process;
pub mod shm;

mod prelude;

pub use crate::error::{Error, Result};
pub use crate::fs::dump::{dump_open_file, format_open_file};
pub use crate::fs::file_ops::{
    do_close, do_dup, do_dup2, do_fcntl, do_open, AccessMode, CreationFlags, Descriptor, FcntlCmd,
};
pub use crate::fs::locks::{
    LockOwner, LockRange, LockRequest, LockRequestBuilder, LockType, RangeLock, Whence, MAX_LOCKS,
    MAX_OWNERS,
};
pub use crate::fs::open_file::{FileGuard, FileHandle, OpenFile, MAX_PID_ENTRIES};
pub use crate::process::{do_fork, do_init, ForkResult, MAX_FILES};
