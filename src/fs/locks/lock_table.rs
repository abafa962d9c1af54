//! The lock-table operations of an [`OpenFile`].
//!
//! Everything here mutates the shared segment and must run with the
//! file's process-shared mutex held; the `fs::file_ops` entry points are
//! the only callers and all go through a [`FileGuard`].
//!
//! [`FileGuard`]: crate::fs::open_file::FileGuard

use crate::fs::open_file::OpenFile;
use crate::prelude::*;
use crate::process;

use super::range::{LockRange, RegionOverlap};
use super::range_lock::{LockOwner, LockType, RangeLock, MAX_LOCKS};

/// Outcome of the applicability scan for a lock request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applicability {
    /// No conflicting lock stands in the way.
    Applicable,
    /// A live process owns a conflicting lock.
    Blocked,
    /// A conflicting lock belongs to a process that no longer exists;
    /// its ownership can be reclaimed.
    DeadOwner(pid_t),
}

impl OpenFile {
    /// Scans every lock for a conflict with the request. Unlock requests
    /// are always applicable; otherwise a conflict exists when the ranges
    /// overlap, at least one side wants to write, and the existing lock
    /// has an owner other than the requester.
    ///
    /// The scan decides on the first foreign owner it meets: the
    /// reclamation loop in `do_fcntl` re-runs it after each removal, so a
    /// single verdict per pass is enough.
    pub(crate) fn applicability(
        &self,
        range: &LockRange,
        type_: LockType,
        owner: &LockOwner,
    ) -> Result<Applicability> {
        if type_ == LockType::F_UNLCK {
            return Ok(Applicability::Applicable);
        }
        if self.nb_locks > MAX_LOCKS {
            return Err(Error::Corrupted("lock count out of bounds"));
        }
        for lock in self.locks() {
            if !lock.range().overlaps(range) {
                continue;
            }
            if lock.type_() != LockType::F_WRLCK && type_ != LockType::F_WRLCK {
                continue;
            }
            if !lock.has_other_owner(owner) {
                continue;
            }
            for other in lock.owners() {
                if other == owner {
                    continue;
                }
                return Ok(if process::is_process_alive(other.pid) {
                    Applicability::Blocked
                } else {
                    Applicability::DeadOwner(other.pid)
                });
            }
            return Err(Error::Corrupted("conflicting owner vanished mid-scan"));
        }
        Ok(Applicability::Applicable)
    }

    /// Removes every trace of ownership by `pid`, dropping locks that end
    /// up ownerless. This is the reclamation step for dead processes.
    pub(crate) fn remove_locks_of_pid(&mut self, pid: pid_t) -> Result<()> {
        if pid <= 0 {
            return Err(Error::InvalidInput("invalid pid"));
        }
        self.remove_owners_where(|o| o.pid == pid)
    }

    /// The single choke point for owner deletion: erases every owner
    /// matching `pred` across all locks, compacting each owner table and
    /// then the lock table. A lock whose last owner goes is dropped.
    pub(crate) fn remove_owners_where<F>(&mut self, pred: F) -> Result<()>
    where
        F: Fn(&LockOwner) -> bool,
    {
        if self.nb_locks > MAX_LOCKS {
            return Err(Error::Corrupted("lock count out of bounds"));
        }
        let mut remaining = self.nb_locks;
        for lock in self.lock_table[..self.nb_locks].iter_mut() {
            lock.remove_owners_where(&pred)?;
            if lock.owners().is_empty() {
                lock.erase();
                remaining -= 1;
            }
        }
        self.nb_locks = remaining;
        self.compact_locks()
    }

    /// Leftward compaction of the lock table, preserving relative order.
    pub(crate) fn compact_locks(&mut self) -> Result<()> {
        for i in 0..self.nb_locks {
            if self.lock_table[i].is_free() {
                let mut j = i + 1;
                while j < MAX_LOCKS && self.lock_table[j].is_free() {
                    j += 1;
                }
                if j >= MAX_LOCKS {
                    return Err(Error::Corrupted("missing live lock during compaction"));
                }
                self.lock_table[i] = self.lock_table[j];
                self.lock_table[j].erase();
            }
        }
        Ok(())
    }

    fn find_lock_idx(&self, range: &LockRange, type_: LockType) -> Option<usize> {
        self.locks()
            .iter()
            .position(|l| l.range() == *range && l.type_() == type_)
    }

    /// Appends a new lock owned solely by `first`.
    fn add_lock(&mut self, range: LockRange, type_: LockType, first: LockOwner) -> Result<()> {
        if self.nb_locks >= MAX_LOCKS {
            return Err(Error::CapacityExceeded("lock"));
        }
        let mut lock = RangeLock::new(range, type_);
        lock.add_owner(first)?;
        self.lock_table[self.nb_locks] = lock;
        self.nb_locks += 1;
        Ok(())
    }

    /// Installs `range`/`type_` for `owner`: joins the record with
    /// identical geometry and type if one exists, else appends a fresh
    /// one.
    fn install_lock(&mut self, range: LockRange, type_: LockType, owner: LockOwner) -> Result<()> {
        if let Some(i) = self.find_lock_idx(&range, type_) {
            return self.lock_table[i].add_owner(owner);
        }
        self.add_lock(range, type_, owner)
    }

    /// Releases `owner`'s claim on `range`. A fully covered lock loses the
    /// ownership outright (and disappears when no owner remains); a
    /// partially covered one is re-installed as one or two remainder
    /// fragments owned by the requester alone, joining identical records
    /// where they exist.
    pub(crate) fn apply_unlock(&mut self, range: &LockRange, owner: LockOwner) -> Result<()> {
        let mut fragments: Vec<(LockRange, LockType)> = Vec::new();
        let mut touched: Vec<usize> = Vec::new();

        for (i, lock) in self.locks().iter().enumerate() {
            if !lock.is_owned_by(&owner) {
                continue;
            }
            let class = match lock.range().classify(range) {
                Some(class) => class,
                None => continue,
            };
            touched.push(i);
            match class {
                RegionOverlap::Interior => {
                    fragments.push((lock.range().left_remainder(range), lock.type_()));
                    fragments.push((lock.range().right_remainder(range), lock.type_()));
                }
                RegionOverlap::Covers => {}
                RegionOverlap::Tail => {
                    fragments.push((lock.range().left_remainder(range), lock.type_()));
                }
                RegionOverlap::Head => {
                    fragments.push((lock.range().right_remainder(range), lock.type_()));
                }
            }
            if fragments.len() + self.nb_locks > MAX_LOCKS {
                return Err(Error::CapacityExceeded("lock"));
            }
        }

        for &i in touched.iter() {
            let lock = &mut self.lock_table[i];
            if lock.owners().len() == 1 {
                lock.erase();
                self.nb_locks -= 1;
            } else {
                lock.remove_owners_where(|o| *o == owner)?;
            }
        }
        self.compact_locks()?;

        for (range, type_) in fragments {
            self.install_lock(range, type_, owner)?;
        }
        Ok(())
    }

    /// Installs a read or write lock for `owner`: clears the region first
    /// so the new lock starts from a clean slate, absorbs same-type locks
    /// of the requester touching either edge, then installs the merged
    /// region. Contiguous same-type locks of one owner thus always end up
    /// as a single record.
    pub(crate) fn apply_rw_lock(
        &mut self,
        range: &LockRange,
        type_: LockType,
        owner: LockOwner,
    ) -> Result<()> {
        if self.nb_locks + 2 > MAX_LOCKS {
            return Err(Error::CapacityExceeded("lock"));
        }

        self.apply_unlock(range, owner)?;

        let mut left: Option<LockRange> = None;
        let mut right: Option<LockRange> = None;
        for lock in self.locks() {
            if lock.type_() != type_ || !lock.is_owned_by(&owner) {
                continue;
            }
            let r = lock.range();
            if !r.is_unbounded() && r.start() + r.len() == range.start() {
                left = Some(r);
            } else if !range.is_unbounded() && r.start() == range.start() + range.len() {
                right = Some(r);
            }
        }

        let mut merged_start = range.start();
        let mut merged_len = range.len();
        match (left, right) {
            (Some(l), Some(r)) => {
                merged_len = if r.is_unbounded() {
                    0
                } else {
                    merged_len + l.len() + r.len()
                };
                merged_start = l.start();
            }
            (Some(l), None) => {
                if merged_len != 0 {
                    merged_len += l.len();
                }
                merged_start = l.start();
            }
            (None, Some(r)) => {
                merged_len = if r.is_unbounded() { 0 } else { merged_len + r.len() };
            }
            (None, None) => {}
        }

        if let Some(l) = left {
            self.apply_unlock(&l, owner)?;
        }
        if let Some(r) = right {
            self.apply_unlock(&r, owner)?;
        }

        self.install_lock(LockRange::new(merged_start, merged_len), type_, owner)
    }

    /// Grants `to` co-ownership of every lock `from` owns. The lock
    /// geometry is never touched.
    pub(crate) fn extend_owner(&mut self, from: &LockOwner, to: LockOwner) -> Result<()> {
        for lock in self.lock_table[..self.nb_locks].iter_mut() {
            if lock.is_owned_by(from) {
                lock.add_owner(to)?;
            }
        }
        Ok(())
    }

    /// Adds `{child, fd}` beside every `{parent, fd}` owner entry.
    pub(crate) fn propagate_fork(&mut self, parent: pid_t, child: pid_t) -> Result<()> {
        for lock in self.lock_table[..self.nb_locks].iter_mut() {
            // snapshot the count: entries appended for the child must not
            // be revisited
            let nb_owners = lock.owners().len();
            for k in 0..nb_owners {
                let o = lock.owners()[k];
                if o.pid == parent {
                    lock.add_owner(LockOwner::new(child, o.fd))?;
                }
            }
        }
        Ok(())
    }
}
