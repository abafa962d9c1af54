use std::ffi::CString;
use std::mem::MaybeUninit;
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use crate::fs::open_file::{FileHandle, OpenFile};
use crate::prelude::*;
use crate::process;
use crate::shm;

use super::file_flags::{AccessMode, CreationFlags};
use super::Descriptor;

/// Opens `path` and attaches the shared lock state of the underlying
/// file, creating and initializing the segment when this is the first
/// open anywhere on the machine. `mode` applies only with `O_CREAT`.
pub fn do_open(
    path: impl AsRef<Path>,
    access: AccessMode,
    flags: CreationFlags,
    mode: mode_t,
) -> Result<Descriptor> {
    let path = path.as_ref();
    debug!(
        "open: path: {:?}, access: {:?}, flags: {:?}",
        path, access, flags
    );

    if process::registry_full() {
        return Err(Error::TooManyFiles);
    }

    let fd = open_raw(path, access, flags, mode)?;

    let (dev, ino) = fstat_identity(fd.as_raw_fd())?;
    let name = shm::segment_name(dev, ino);

    // Attach wins when the name exists; any attach failure falls back to
    // create-if-absent. A creator preempted after publishing the name but
    // before finishing initialization exposes a half-initialized record
    // to concurrent attachers, and two concurrent creators can both take
    // the create path (no O_EXCL) with the second re-initializing the
    // segment. Both windows are known defects of the segment protocol,
    // kept as documented behavior.
    let handle = match shm::attach::<OpenFile>(&name) {
        Ok(ptr) => attach_existing(FileHandle::new(ptr))?,
        Err(_) => create_segment(&name)?,
    };

    process::register_open_file(handle)?;

    Ok(Descriptor {
        fd: fd.into_raw_fd(),
        file: handle,
    })
}

fn attach_existing(handle: FileHandle) -> Result<FileHandle> {
    let mut file = handle.lock()?;
    file.pid_count_increment(process::current_pid())?;
    file.flush()?;
    Ok(handle)
}

fn create_segment(name: &str) -> Result<FileHandle> {
    let ptr = shm::create::<OpenFile>(name)?;

    // the mapping is zero-filled; make the mutex real before reaching the
    // tables through it
    if let Err(err) = unsafe { (*ptr.as_ptr()).mutex.init() } {
        let _ = shm::unlink(name);
        return Err(err);
    }

    let handle = FileHandle::new(ptr);
    let mut file = handle.lock()?;
    file.reset();
    file.pid_count_increment(process::current_pid())?;
    file.flush()?;
    drop(file);
    Ok(handle)
}

fn open_raw(
    path: &Path,
    access: AccessMode,
    flags: CreationFlags,
    mode: mode_t,
) -> Result<OwnedFd> {
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| Error::InvalidInput("path contains an interior NUL byte"))?;
    let oflag = access.bits() | flags.bits() as c_int;
    let fd = if flags.contains(CreationFlags::O_CREAT) {
        unsafe { libc::open(c_path.as_ptr(), oflag, mode as libc::c_uint) }
    } else {
        unsafe { libc::open(c_path.as_ptr(), oflag) }
    };
    if fd < 0 {
        return Err(Error::last_os("open"));
    }
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// The `(device, inode)` identity behind `fd`.
pub(super) fn fstat_identity(fd: c_int) -> Result<(libc::dev_t, libc::ino_t)> {
    let mut st = MaybeUninit::<libc::stat>::uninit();
    if unsafe { libc::fstat(fd, st.as_mut_ptr()) } < 0 {
        return Err(Error::last_os("fstat"));
    }
    let st = unsafe { st.assume_init() };
    Ok((st.st_dev, st.st_ino))
}
