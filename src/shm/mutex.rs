use std::cell::UnsafeCell;
use std::mem::MaybeUninit;

use crate::prelude::*;

/// A `pthread` mutex configured with `PTHREAD_PROCESS_SHARED`, embedded
/// directly in the shared segment it guards.
///
/// This is the only synchronization primitive of the crate and the only
/// point where a caller can be suspended: the acquire blocks without
/// timeout. A process that dies while holding the mutex leaves the file
/// permanently locked for every other participant; that risk is accepted,
/// it is inherent to the underlying primitive.
#[repr(C)]
pub struct SharedMutex {
    inner: UnsafeCell<libc::pthread_mutex_t>,
}

// Shared across processes by design; exclusive access is what the mutex
// itself provides.
unsafe impl Send for SharedMutex {}
unsafe impl Sync for SharedMutex {}

impl SharedMutex {
    /// Initializes the mutex for cross-process use.
    ///
    /// # Safety
    ///
    /// Must run exactly once, in the process that created the segment,
    /// before the segment is published to any peer.
    pub(crate) unsafe fn init(&self) -> Result<()> {
        let mut attr = MaybeUninit::<libc::pthread_mutexattr_t>::uninit();
        let code = libc::pthread_mutexattr_init(attr.as_mut_ptr());
        if code != 0 {
            return Err(Error::from_raw("pthread_mutexattr_init", code));
        }
        let mut attr = attr.assume_init();
        let code = libc::pthread_mutexattr_setpshared(&mut attr, libc::PTHREAD_PROCESS_SHARED);
        if code != 0 {
            libc::pthread_mutexattr_destroy(&mut attr);
            return Err(Error::from_raw("pthread_mutexattr_setpshared", code));
        }
        let code = libc::pthread_mutex_init(self.inner.get(), &attr);
        libc::pthread_mutexattr_destroy(&mut attr);
        if code != 0 {
            return Err(Error::from_raw("pthread_mutex_init", code));
        }
        Ok(())
    }

    /// Blocking acquire.
    pub(crate) fn raw_lock(&self) -> Result<()> {
        let code = unsafe { libc::pthread_mutex_lock(self.inner.get()) };
        if code != 0 {
            return Err(Error::from_raw("pthread_mutex_lock", code));
        }
        Ok(())
    }

    /// Release. Runs from guard drops, so a failure has no caller that
    /// could act on it; it is logged and swallowed.
    pub(crate) fn raw_unlock(&self) {
        let code = unsafe { libc::pthread_mutex_unlock(self.inner.get()) };
        if code != 0 {
            warn!("pthread_mutex_unlock failed with code {}", code);
        }
    }
}
