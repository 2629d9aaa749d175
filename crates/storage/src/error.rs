use thiserror::Error;

/// StorageError represents all possible failures of the persistent store
///
/// Absence of a record is not an error; lookups return `None` instead.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The storage medium could not be opened or upgraded. Fatal at open;
    /// surfaced to the caller and never retried internally.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A write was refused by the backing medium. Surfaced so the caller
    /// can decide whether to retry.
    #[error("storage conflict: {0}")]
    Conflict(String),

    /// Record serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Returns true if the operation could reasonably be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Conflict(_))
    }
}
