use crate::fs::locks::LockOwner;
use crate::fs::open_file::FileHandle;
use crate::prelude::*;
use crate::process;

pub use self::close::do_close;
pub use self::dup::{do_dup, do_dup2};
pub use self::fcntl::{do_fcntl, FcntlCmd};
pub use self::file_flags::{AccessMode, CreationFlags};
pub use self::open::do_open;

mod close;
mod dup;
mod fcntl;
mod file_flags;
mod open;

/// A locked file descriptor: the raw descriptor paired with the handle to
/// the shared lock state of its file. Several descriptors, in one process
/// or many, may point at the same [`OpenFile`].
///
/// [`OpenFile`]: crate::fs::open_file::OpenFile
#[derive(Debug, Clone, Copy)]
pub struct Descriptor {
    pub fd: c_int,
    pub file: FileHandle,
}

impl Descriptor {
    /// The owner identity this descriptor locks under.
    pub(crate) fn owner(&self) -> LockOwner {
        LockOwner::new(process::current_pid(), self.fd)
    }
}
