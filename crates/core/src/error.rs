//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("invalid digest: {0}")]
    InvalidDigest(String),

    #[error("invalid resource name: {0}")]
    InvalidResource(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
