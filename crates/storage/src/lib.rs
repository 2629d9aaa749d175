//! Persistent record storage for Ember Shell
//!
//! Three independent, id-keyed collections (bookmarks, history, downloads)
//! with secondary lookup by non-unique fields. Every operation is
//! individually atomic; there is no multi-call transaction support, so
//! read-modify-write sequences may race and the last completed write wins.

mod error;
mod record;
mod store;

pub use error::StorageError;
pub use record::{Collection, Record};
pub use store::PersistentStore;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
