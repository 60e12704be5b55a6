use thiserror::Error;

/// Top-level error type for the Voxpad system.
///
/// Each variant wraps a subsystem-specific failure. Subsystem crates map
/// their internal errors into these variants so that the `?` operator works
/// seamlessly across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VoxpadError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for VoxpadError {
    fn from(err: toml::de::Error) -> Self {
        VoxpadError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for VoxpadError {
    fn from(err: toml::ser::Error) -> Self {
        VoxpadError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for VoxpadError {
    fn from(err: serde_json::Error) -> Self {
        VoxpadError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Voxpad operations.
pub type Result<T> = std::result::Result<T, VoxpadError>;
