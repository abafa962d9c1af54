pub use self::mutex::SharedMutex;
pub use self::segment::{attach, create, flush, segment_name, unlink};

mod mutex;
mod segment;
