use thiserror::Error;

/// Failure reported by a backing key-value store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Quota exceeded writing {key}: {size} bytes over a limit of {limit}")]
    QuotaExceeded {
        key: String,
        size: usize,
        limit: usize,
    },

    #[error("Corrupt record for {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a JSON-level storage operation.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// True when the backing store could not be reached at all
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StorageError::Store(StoreError::Unavailable(_)))
    }

    pub fn is_serialization(&self) -> bool {
        matches!(self, StorageError::Serialization(_))
    }
}
