use crate::prelude::*;
use crate::process;
use crate::shm;

use super::open::fstat_identity;
use super::Descriptor;

/// Closes a locked descriptor.
///
/// Removes every lock-owner entry held by this exact `(pid, fd)` pair
/// (other aliases of the same open file description keep theirs), closes
/// the raw descriptor, drops one alias from this process's count, and
/// prunes the entries of processes that no longer exist. When nothing
/// live references the file anymore the segment name is unlinked --
/// strictly after the mutex is released, so the mutex is never destroyed
/// under a peer still mapping it.
pub fn do_close(desc: Descriptor) -> Result<()> {
    debug!("close: fd: {}", desc.fd);
    if desc.fd < 0 {
        return Err(Error::InvalidInput("invalid descriptor"));
    }

    let pid = process::current_pid();
    let owner = desc.owner();

    let mut file = desc.file.lock()?;

    file.remove_owners_where(|o| *o == owner)?;

    // the segment name needs the fd's identity, so derive it before the
    // raw close
    let (dev, ino) = fstat_identity(desc.fd)?;
    let name = shm::segment_name(dev, ino);

    if unsafe { libc::close(desc.fd) } < 0 {
        return Err(Error::last_os("close"));
    }

    file.pid_count_decrement(pid)?;
    let last_one_out = file.prune_dead_pids()?;

    file.flush()?;
    drop(file);

    if last_one_out {
        shm::unlink(&name)?;
    }
    Ok(())
}
