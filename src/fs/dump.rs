//! Diagnostic rendering of a lock table. Pure formatting; the only
//! invariant-bearing caller behavior is the snapshot variant taking the
//! file mutex for consistency.

use std::fmt::Write;

use crate::fs::locks::LockType;
use crate::fs::open_file::{FileHandle, OpenFile};
use crate::prelude::*;

/// Renders the lock table of `file`. With `show_pids` false the owner
/// pids are redacted, leaving only the descriptor numbers.
pub fn format_open_file(file: &OpenFile, show_pids: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Number of locks: {}", file.locks().len());
    for (i, lock) in file.locks().iter().enumerate() {
        let _ = writeln!(out, "===== Lock {}:", i);
        let type_ = match lock.type_() {
            LockType::F_WRLCK => "write",
            _ => "read",
        };
        let _ = writeln!(out, "Type: {}", type_);
        let _ = writeln!(out, "Start: {}", lock.range().start());
        let _ = writeln!(out, "Length: {}", lock.range().len());
        let _ = writeln!(out, "Number of owners: {}", lock.owners().len());
        for (j, owner) in lock.owners().iter().enumerate() {
            if show_pids {
                let _ = writeln!(out, "Owner {}: fd = {}, pid = {}", j, owner.fd, owner.pid);
            } else {
                let _ = writeln!(out, "Owner {}: fd = {}", j, owner.fd);
            }
        }
    }
    out
}

/// Takes the file's mutex just long enough to render a consistent
/// snapshot of its lock table.
pub fn dump_open_file(handle: FileHandle, show_pids: bool) -> Result<String> {
    let file = handle.lock()?;
    Ok(format_open_file(&file, show_pids))
}
