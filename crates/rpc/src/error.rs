//! RPC error types.

use crate::status::RpcStatus;
use thiserror::Error;

/// Errors surfaced by the RPC layer and its transports.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("remote status {0}")]
    Status(RpcStatus),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("call exceeded its deadline")]
    TimedOut,

    #[error("call was cancelled")]
    Cancelled,

    #[error("short write: committed {committed} of {expected} bytes")]
    ShortWrite { committed: u64, expected: u64 },

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl RpcError {
    /// Wrap a remote status as an error.
    pub fn status(status: RpcStatus) -> Self {
        Self::Status(status)
    }

    /// Get the remote status, if this error carries one.
    pub fn as_status(&self) -> Option<&RpcStatus> {
        match self {
            Self::Status(status) => Some(status),
            _ => None,
        }
    }
}

/// Result type for RPC operations.
pub type RpcResult<T> = std::result::Result<T, RpcError>;
