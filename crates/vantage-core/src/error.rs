use thiserror::Error;

/// Top-level error type for the Vantage system.
///
/// Subsystem crates map their failures into these variants so the `?`
/// operator works across crate boundaries. Sink delivery failures are
/// deliberately *not* represented here: they travel as `SinkOutcome` data
/// through the dispatcher and never surface as errors to callers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VantageError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Monitor error: {0}")]
    Monitor(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for VantageError {
    fn from(err: toml::de::Error) -> Self {
        VantageError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for VantageError {
    fn from(err: toml::ser::Error) -> Self {
        VantageError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for VantageError {
    fn from(err: serde_json::Error) -> Self {
        VantageError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Vantage operations.
pub type Result<T> = std::result::Result<T, VantageError>;
