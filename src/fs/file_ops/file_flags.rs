use crate::prelude::*;

/// Access mode bits of an open request, the low two bits of the flag
/// word.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AccessMode {
    /// read only
    O_RDONLY = 0,
    /// write only
    O_WRONLY = 1,
    /// read write
    O_RDWR = 2,
}

impl AccessMode {
    pub fn readable(&self) -> bool {
        matches!(*self, AccessMode::O_RDONLY | AccessMode::O_RDWR)
    }

    pub fn writable(&self) -> bool {
        matches!(*self, AccessMode::O_WRONLY | AccessMode::O_RDWR)
    }

    pub(crate) fn bits(&self) -> c_int {
        *self as c_int
    }
}

bitflags! {
    /// Creation-time flags of an open request, forwarded verbatim to
    /// `open(2)`.
    pub struct CreationFlags: u32 {
        /// create file if it does not exist
        const O_CREAT = libc::O_CREAT as u32;
        /// error if O_CREAT and the file exists
        const O_EXCL = libc::O_EXCL as u32;
        /// do not assign controlling terminal
        const O_NOCTTY = libc::O_NOCTTY as u32;
        /// truncate file upon open
        const O_TRUNC = libc::O_TRUNC as u32;
        /// fail if not a directory
        const O_DIRECTORY = libc::O_DIRECTORY as u32;
        /// do not follow symlinks
        const O_NOFOLLOW = libc::O_NOFOLLOW as u32;
        /// close on exec
        const O_CLOEXEC = libc::O_CLOEXEC as u32;
    }
}
