use thiserror::Error;

/// Error type for faults in the persistence layer. Storage faults are
/// fatal to the call that hit them; callers must not assume the write
/// happened.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(String),
}
