/// Errors from persistence adapter operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The storage key cannot be mapped onto the backend.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    /// A failure injected by a test backend.
    #[error("injected failure: {0}")]
    Injected(String),
}

/// Result alias for adapter operations.
pub type StoreResult<T> = Result<T, StoreError>;
