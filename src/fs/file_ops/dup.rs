use crate::fs::locks::LockOwner;
use crate::prelude::*;
use crate::process;

use super::Descriptor;

/// Duplicates `desc` onto the lowest free descriptor number, extending
/// the ownership of every lock it holds to the new alias.
pub fn do_dup(desc: Descriptor) -> Result<Descriptor> {
    debug!("dup: fd: {}", desc.fd);
    if desc.fd < 0 {
        return Err(Error::InvalidInput("invalid descriptor"));
    }

    let new_fd = unsafe { libc::dup(desc.fd) };
    if new_fd < 0 {
        return Err(Error::last_os("dup"));
    }
    share_locks_with(desc, new_fd)
}

/// Duplicates `desc` onto `new_fd` exactly, closing whatever `new_fd`
/// referred to. A no-op returning `desc` itself when the two are equal.
pub fn do_dup2(desc: Descriptor, new_fd: c_int) -> Result<Descriptor> {
    debug!("dup2: fd: {} -> {}", desc.fd, new_fd);
    if desc.fd < 0 {
        return Err(Error::InvalidInput("invalid descriptor"));
    }
    if desc.fd == new_fd {
        return Ok(desc);
    }

    if unsafe { libc::dup2(desc.fd, new_fd) } < 0 {
        return Err(Error::last_os("dup2"));
    }
    share_locks_with(desc, new_fd)
}

/// Registers `new_fd` as a co-owner of every lock the source descriptor
/// owns; the lock geometry is never altered. The fresh fd is closed again
/// if the table cannot take the new alias.
fn share_locks_with(desc: Descriptor, new_fd: c_int) -> Result<Descriptor> {
    let pid = process::current_pid();
    let extend = || -> Result<()> {
        let mut file = desc.file.lock()?;
        file.extend_owner(&desc.owner(), LockOwner::new(pid, new_fd))?;
        file.pid_count_increment(pid)?;
        file.flush()?;
        Ok(())
    };
    if let Err(err) = extend() {
        unsafe { libc::close(new_fd) };
        return Err(err);
    }
    Ok(Descriptor {
        fd: new_fd,
        file: desc.file,
    })
}
