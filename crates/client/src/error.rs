//! Client error types.

use porter_core::Digest;
use porter_rpc::RpcError;
use thiserror::Error;

/// Errors surfaced by CAS transfer operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("batch update of {total_bytes} total bytes exceeds maximum of {max}")]
    BatchTooLarge { total_bytes: u64, max: u64 },

    #[error("batch update of {count} total blobs exceeds maximum of {max}")]
    BatchTooMany { count: usize, max: usize },

    #[error(
        "uploading blobs as part of a batch resulted in {failures} failures, \
         including blob {digest}: {message}"
    )]
    BatchUpload {
        failures: usize,
        digest: Digest,
        message: String,
    },

    #[error("CAS fetch read {read} bytes but {expected} were expected")]
    Integrity { read: u64, expected: u64 },

    #[error("digest size {0} is too big to fit in addressable memory")]
    SizeTooLarge(u64),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Core(#[from] porter_core::Error),
}

impl Error {
    /// Check whether this error reports cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Rpc(RpcError::Cancelled))
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
