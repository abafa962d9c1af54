use crate::fs::locks::{Applicability, LockRange, LockRequest, LockType, Whence};
use crate::prelude::*;

use super::Descriptor;

/// File-control commands understood by [`do_fcntl`].
#[derive(Debug)]
pub enum FcntlCmd<'a> {
    /// Acquire or release a record lock, non-blocking.
    SetLk(&'a LockRequest),
    /// The blocking variant; recognized, not supported.
    SetLkWait(&'a LockRequest),
}

/// Applies a record-lock command to `desc`.
///
/// Contention with a live owner surfaces as [`Error::WouldBlock`] with
/// the table untouched and unflushed; the caller decides whether to
/// retry. Conflicting locks whose every owner process is gone are
/// reclaimed on the spot and do not block the request.
pub fn do_fcntl(desc: Descriptor, cmd: FcntlCmd<'_>) -> Result<()> {
    debug!("fcntl: fd: {}, cmd: {:?}", desc.fd, cmd);

    if desc.fd < 0 {
        return Err(Error::InvalidInput("invalid descriptor"));
    }
    let req = match cmd {
        FcntlCmd::SetLk(req) => req,
        FcntlCmd::SetLkWait(_) => return Err(Error::Unsupported("blocking lock requests")),
    };
    if req.len() < 0 {
        return Err(Error::InvalidInput("negative lock length"));
    }
    if req.whence() == Whence::SEEK_SET && req.start() < 0 {
        return Err(Error::InvalidInput(
            "lock starts before the beginning of the file",
        ));
    }

    let owner = desc.owner();
    let mut file = desc.file.lock()?;

    let start = resolve_start(desc.fd, req.whence(), req.start())?;
    let range = LockRange::new(start, req.len());

    loop {
        match file.applicability(&range, req.type_(), &owner)? {
            Applicability::Applicable => break,
            Applicability::Blocked => {
                // nothing was mutated; report and let the caller retry
                return Err(Error::WouldBlock);
            }
            Applicability::DeadOwner(pid) => {
                warn!("reclaiming locks of dead process {}", pid);
                file.remove_locks_of_pid(pid)?;
            }
        }
    }

    match req.type_() {
        LockType::F_UNLCK => file.apply_unlock(&range, owner)?,
        LockType::F_RDLCK | LockType::F_WRLCK => file.apply_rw_lock(&range, req.type_(), owner)?,
    }

    file.flush()?;
    Ok(())
}

/// Resolves the request's absolute start offset, leaving the
/// descriptor's file position where it was.
fn resolve_start(fd: c_int, whence: Whence, start: off_t) -> Result<off_t> {
    if whence == Whence::SEEK_SET {
        return Ok(start);
    }
    let cur = lseek(fd, 0, libc::SEEK_CUR)?;
    let pos = lseek(fd, start, whence as c_int)?;
    lseek(fd, cur, libc::SEEK_SET)?;
    Ok(pos)
}

fn lseek(fd: c_int, offset: off_t, whence: c_int) -> Result<off_t> {
    let pos = unsafe { libc::lseek(fd, offset, whence) };
    if pos < 0 {
        return Err(Error::last_os("lseek"));
    }
    Ok(pos)
}
