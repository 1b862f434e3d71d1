//! Error types for the core library.

use thiserror::Error;

/// Core library error type.
///
/// Used for the soft-failing request paths; authentication has its own
/// error type in [`crate::auth`].
#[derive(Debug, Error)]
pub enum CoreError {
    /// A missing or unusable credential.
    #[error("authentication error: {0}")]
    Auth(String),

    /// An API or HTTP error.
    #[error("API error: {0}")]
    Api(String),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A generic error for other cases.
    #[error("error: {0}")]
    Other(String),
}

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;
