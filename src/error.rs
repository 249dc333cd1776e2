use thiserror::Error;

/// Main error type for krill operations
#[derive(Error, Debug)]
pub enum KrillError {
    #[error("Row width mismatch: container expects {expected} bytes, entry has {actual}")]
    RowWidthMismatch { expected: usize, actual: usize },

    #[error("Key width mismatch: expected {expected} bytes, got {actual}")]
    KeyWidthMismatch { expected: usize, actual: usize },

    #[error("Incompatible schemas: {0}")]
    SchemaMismatch(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for krill operations
pub type Result<T> = std::result::Result<T, KrillError>;

impl KrillError {
    /// Check if this error aborts only the current operation rather than
    /// indicating corrupted container state
    pub fn is_operation_local(&self) -> bool {
        !matches!(self, KrillError::Internal(_))
    }
}
