/// Errors from ledger store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A value could not be encoded or decoded.
    #[error("codec error at {key}: {reason}")]
    Codec { key: String, reason: String },

    /// A record was found under the key but has a different kind.
    #[error("record at {key} is a {found}, expected a {expected}")]
    KindMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Snapshot (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the snapshot file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Compare-and-swap kept losing to concurrent writers.
    #[error("write contention on {key} after {attempts} attempts")]
    Contention { key: String, attempts: u32 },

    /// An internal lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub fn codec(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::Codec {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
