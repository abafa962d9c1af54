use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::prelude::*;
use crate::process;
use crate::shm::{self, SharedMutex};

use super::locks::{RangeLock, MAX_LOCKS};

/// Most processes that can hold one open file description at a time.
pub const MAX_PID_ENTRIES: usize = 256;

/// Sentinel pid marking a free map entry.
const FREE_PID: pid_t = -1;

/// Map entry: how many descriptor aliases `pid` holds on this file. The
/// map drives segment lifetime only, never lock ownership.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub(crate) struct PidFdCount {
    pid: pid_t,
    fd_count: c_int,
}

impl PidFdCount {
    fn erased() -> Self {
        Self {
            pid: FREE_PID,
            fd_count: 0,
        }
    }

    fn is_free(&self) -> bool {
        self.pid == FREE_PID
    }
}

/// The shared, memory-resident state of one underlying file, keyed by its
/// `(device, inode)` identity. One instance fills one shared-memory
/// segment and is mapped by every process that opens the file through
/// this crate; the embedded mutex serializes all access to it.
#[repr(C)]
pub struct OpenFile {
    pub(crate) nb_locks: usize,
    pub(crate) mutex: SharedMutex,
    pub(crate) lock_table: [RangeLock; MAX_LOCKS],
    pub(crate) nb_pids: usize,
    pub(crate) pid_map: [PidFdCount; MAX_PID_ENTRIES],
}

impl OpenFile {
    /// The live lock records, in table order.
    pub fn locks(&self) -> &[RangeLock] {
        &self.lock_table[..self.nb_locks]
    }

    /// Marks every table slot free. Runs once on a freshly created
    /// segment, before it is published.
    pub(crate) fn reset(&mut self) {
        self.nb_locks = 0;
        for lock in self.lock_table.iter_mut() {
            lock.erase();
            lock.erase_owners();
        }
        self.nb_pids = 0;
        for entry in self.pid_map.iter_mut() {
            *entry = PidFdCount::erased();
        }
    }

    /// Bumps the alias count for `pid`, creating the entry at one.
    pub(crate) fn pid_count_increment(&mut self, pid: pid_t) -> Result<()> {
        if let Some(entry) = self.pid_map[..self.nb_pids]
            .iter_mut()
            .find(|e| e.pid == pid)
        {
            entry.fd_count += 1;
            return Ok(());
        }
        if self.nb_pids >= MAX_PID_ENTRIES {
            return Err(Error::CapacityExceeded("pid"));
        }
        self.pid_map[self.nb_pids] = PidFdCount { pid, fd_count: 1 };
        self.nb_pids += 1;
        Ok(())
    }

    /// Drops one alias for `pid`, deleting the entry at zero.
    pub(crate) fn pid_count_decrement(&mut self, pid: pid_t) -> Result<()> {
        let entry = self.pid_map[..self.nb_pids]
            .iter_mut()
            .find(|e| e.pid == pid)
            .ok_or(Error::Corrupted("no alias entry for this process"))?;
        entry.fd_count -= 1;
        if entry.fd_count == 0 {
            *entry = PidFdCount::erased();
            self.nb_pids -= 1;
            self.compact_pid_map()?;
        }
        Ok(())
    }

    /// Clones the parent's alias entry for a freshly forked child. A
    /// recycled pid could collide with a stale entry here; the liveness
    /// sweep on close cleans such entries up.
    pub(crate) fn clone_pid_entry(&mut self, parent: pid_t, child: pid_t) -> Result<()> {
        let parent_count = match self.pid_map[..self.nb_pids].iter().find(|e| e.pid == parent) {
            Some(entry) => entry.fd_count,
            None => return Ok(()),
        };
        if self.nb_pids >= MAX_PID_ENTRIES {
            return Err(Error::CapacityExceeded("pid"));
        }
        self.pid_map[self.nb_pids] = PidFdCount {
            pid: child,
            fd_count: parent_count,
        };
        self.nb_pids += 1;
        Ok(())
    }

    /// Erases the entries of processes that no longer exist. Returns true
    /// when no live entry remains, i.e. the segment can be torn down.
    pub(crate) fn prune_dead_pids(&mut self) -> Result<bool> {
        let mut all_gone = true;
        let mut remaining = self.nb_pids;
        for entry in self.pid_map[..self.nb_pids].iter_mut() {
            if process::is_process_alive(entry.pid) {
                all_gone = false;
            } else {
                *entry = PidFdCount::erased();
                remaining -= 1;
            }
        }
        self.nb_pids = remaining;
        self.compact_pid_map()?;
        Ok(all_gone)
    }

    /// Leftward compaction of the pid map, preserving relative order.
    pub(crate) fn compact_pid_map(&mut self) -> Result<()> {
        for i in 0..self.nb_pids {
            if self.pid_map[i].is_free() {
                let mut j = i + 1;
                while j < MAX_PID_ENTRIES && self.pid_map[j].is_free() {
                    j += 1;
                }
                if j >= MAX_PID_ENTRIES {
                    return Err(Error::Corrupted("missing live pid entry during compaction"));
                }
                self.pid_map[i] = self.pid_map[j];
                self.pid_map[j] = PidFdCount::erased();
            }
        }
        Ok(())
    }
}

/// Process-local handle to a mapped [`OpenFile`].
///
/// This is the crate's single unsafe boundary: the pointer aims into a
/// `MAP_SHARED` mapping that stays valid for the life of the process
/// (segments are unlinked but never unmapped), and every access to the
/// shared structure goes through [`FileHandle::lock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHandle(NonNull<OpenFile>);

// The mapping never moves and never goes away, and all mutation is
// serialized by the process-shared mutex inside the structure.
unsafe impl Send for FileHandle {}
unsafe impl Sync for FileHandle {}

impl FileHandle {
    pub(crate) fn new(ptr: NonNull<OpenFile>) -> Self {
        Self(ptr)
    }

    /// Acquires the file's process-shared mutex, blocking until it is
    /// available. The returned guard is the only way to reach the table.
    pub fn lock(&self) -> Result<FileGuard> {
        unsafe { (*self.0.as_ptr()).mutex.raw_lock()? };
        Ok(FileGuard { ptr: self.0 })
    }
}

/// Exclusive view of a locked [`OpenFile`]. Dropping the guard releases
/// the process-shared mutex, on success and error paths alike.
pub struct FileGuard {
    ptr: NonNull<OpenFile>,
}

impl FileGuard {
    /// Publishes the segment contents to peer processes. Call before the
    /// guard drops; a mutation that fails is not flushed.
    pub fn flush(&self) -> Result<()> {
        shm::flush(self.ptr)
    }
}

impl Deref for FileGuard {
    type Target = OpenFile;

    fn deref(&self) -> &OpenFile {
        unsafe { self.ptr.as_ref() }
    }
}

impl DerefMut for FileGuard {
    fn deref_mut(&mut self) -> &mut OpenFile {
        unsafe { self.ptr.as_mut() }
    }
}

impl Drop for FileGuard {
    fn drop(&mut self) {
        unsafe { (*self.ptr.as_ptr()).mutex.raw_unlock() };
    }
}
