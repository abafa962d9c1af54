//! Process-wide state and process-level operations: the registry of
//! mapped files, the liveness oracle, and lock-propagating `fork`.

use std::sync::Mutex;

use crate::fs::open_file::FileHandle;
use crate::prelude::*;

/// Most open file descriptions one process can hold through this crate.
pub const MAX_FILES: usize = 256;

lazy_static! {
    /// Every file this process has mapped. Populated on open, consulted
    /// only to propagate lock ownership across [`do_fork`]; entries hold
    /// no ownership and are never torn down.
    static ref OPEN_FILES: Mutex<Vec<FileHandle>> = Mutex::new(Vec::new());
}

/// Resets the process-local registry. Call once before anything else;
/// calling it again just starts over with an empty registry.
pub fn do_init() {
    OPEN_FILES.lock().unwrap().clear();
}

pub(crate) fn current_pid() -> pid_t {
    unsafe { libc::getpid() }
}

/// Best-effort liveness oracle: a signal-0 probe. Only a clean ESRCH
/// counts as dead; EPERM means the process exists but is out of reach. A
/// recycled pid makes a dead owner look alive -- accepted approximation.
pub(crate) fn is_process_alive(pid: pid_t) -> bool {
    if unsafe { libc::kill(pid, 0) } == 0 {
        return true;
    }
    io::Error::last_os_error().raw_os_error() != Some(libc::ESRCH)
}

pub(crate) fn registry_full() -> bool {
    OPEN_FILES.lock().unwrap().len() >= MAX_FILES
}

/// Records `handle` for fork propagation; re-registering the same
/// mapping is a no-op.
pub(crate) fn register_open_file(handle: FileHandle) -> Result<()> {
    let mut files = OPEN_FILES.lock().unwrap();
    if files.iter().any(|h| *h == handle) {
        return Ok(());
    }
    if files.len() >= MAX_FILES {
        return Err(Error::TooManyFiles);
    }
    files.push(handle);
    Ok(())
}

/// Which side of a [`do_fork`] the caller is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkResult {
    Parent { child: pid_t },
    Child,
}

/// Forks the process and makes the child an equal co-owner of every lock
/// the parent holds, through every descriptor, on every file in the
/// registry -- the descriptor-table semantics of `fork(2)`, extended into
/// the shared lock state. The child also inherits the parent's alias
/// counts, so segment lifetime accounting keeps working for it.
pub fn do_fork() -> Result<ForkResult> {
    let parent = current_pid();
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        return Err(Error::last_os("fork"));
    }
    if pid != 0 {
        return Ok(ForkResult::Parent { child: pid });
    }

    let child = current_pid();
    debug!("fork: propagating locks of {} to {}", parent, child);
    let files: Vec<FileHandle> = OPEN_FILES.lock().unwrap().clone();
    for handle in files {
        let mut file = handle.lock()?;
        file.propagate_fork(parent, child)?;
        file.clone_pid_entry(parent, child)?;
        file.flush()?;
    }
    Ok(ForkResult::Child)
}
