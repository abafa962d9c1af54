use std::io;

use libc::c_int;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level error, keeping the errno taxonomy of the syscalls this
/// library stands in for.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed request, rejected before any shared state is touched.
    #[error("invalid argument: {0}")]
    InvalidInput(&'static str),

    /// A conflicting lock is held by a live process. The only retryable
    /// failure.
    #[error("conflicting lock held by a live process")]
    WouldBlock,

    /// A fixed-capacity table is full.
    #[error("{0} table is full")]
    CapacityExceeded(&'static str),

    /// The per-process registry of open file descriptions is full.
    #[error("too many registered open files")]
    TooManyFiles,

    /// Recognized but unsupported command.
    #[error("unsupported command: {0}")]
    Unsupported(&'static str),

    /// The shared table contradicts itself.
    #[error("inconsistent lock table: {0}")]
    Corrupted(&'static str),

    /// A delegated syscall failed.
    #[error("{op}: {source}")]
    Os {
        op: &'static str,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Captures `errno` after a failed libc call.
    pub(crate) fn last_os(op: &'static str) -> Self {
        Error::Os {
            op,
            source: io::Error::last_os_error(),
        }
    }

    /// Wraps an error code returned directly, pthread-style.
    pub(crate) fn from_raw(op: &'static str, code: c_int) -> Self {
        Error::Os {
            op,
            source: io::Error::from_raw_os_error(code),
        }
    }

    /// The closest POSIX errno for this error.
    pub fn errno(&self) -> c_int {
        match self {
            Error::InvalidInput(_) | Error::Unsupported(_) => libc::EINVAL,
            Error::WouldBlock => libc::EAGAIN,
            Error::CapacityExceeded(_) => libc::ENOLCK,
            Error::TooManyFiles => libc::EMFILE,
            Error::Corrupted(_) => libc::EIO,
            Error::Os { source, .. } => source.raw_os_error().unwrap_or(libc::EIO),
        }
    }

    /// True for the retryable contention outcome.
    pub fn would_block(&self) -> bool {
        matches!(self, Error::WouldBlock)
    }
}
