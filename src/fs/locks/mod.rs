pub use self::lock_table::Applicability;
pub use self::range::{LockRange, RegionOverlap};
pub use self::range_lock::{
    LockOwner, LockRequest, LockRequestBuilder, LockType, RangeLock, Whence, MAX_LOCKS, MAX_OWNERS,
};

mod lock_table;
mod range;
mod range_lock;
