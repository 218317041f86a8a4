use thiserror::Error;

impl From<serde_json::Error> for SealError {
    fn from(err: serde_json::Error) -> Self {
        Self::StorageError(format!("JSON serialization error: {}", err))
    }
}

impl From<std::io::Error> for SealError {
    fn from(err: std::io::Error) -> Self {
        Self::StorageError(format!("I/O error: {}", err))
    }
}

impl From<config::ConfigError> for SealError {
    fn from(err: config::ConfigError) -> Self {
        Self::InvalidConfiguration(err.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SealError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Leaf index {index} out of range for tree with {leaf_count} leaves")]
    IndexOutOfRange { index: usize, leaf_count: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Signing failed: {0}")]
    SigningFailure(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

pub type Result<T> = std::result::Result<T, SealError>;

impl SealError {
    pub fn wrong_hash_length(what: &str, len: usize) -> Self {
        Self::InvalidInput(format!("{} must be exactly 32 bytes, got {}", what, len))
    }

    /// Close failures leave pending events in place and can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SigningFailure(_) | Self::StorageError(_))
    }
}
