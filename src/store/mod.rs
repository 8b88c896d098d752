//! Session store implementations

mod file;
mod memory;
mod traits;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use traits::{SessionStore, StoredSession};

/// Current time in epoch milliseconds.
///
/// Every expiry stamp and every expiry check goes through this clock.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
