//! Core domain types for the porter CAS transfer client.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Content hashes and digests
//! - Byte-stream resource names
//! - Transfer limits
//! - Client configuration

pub mod config;
pub mod digest;
pub mod error;
pub mod resource;

pub use config::{CasConfig, RetryConfig};
pub use digest::{ContentHash, Digest};
pub use error::{Error, Result};
pub use resource::{read_resource_name, write_resource_name};

/// Maximum total payload of one batch-update RPC: slightly below the 4 MiB
/// gRPC message ceiling, leaving slack for wire overhead.
pub const MAX_BATCH_BYTES: u64 = 4 * 1024 * 1024 - 1024;

/// Maximum number of blobs in one batch-update RPC.
pub const MAX_BATCH_COUNT: usize = 4000;

/// Maximum number of digests in one missing-blobs query.
pub const MAX_QUERY_COUNT: usize = 10_000;

/// Extra capacity added to read buffers so the final read never forces a
/// reallocation.
pub const MIN_READ_PAD: usize = 512;

/// Protocol ceiling on a single byte-stream write chunk. Enforced by the
/// transport, documented here for its implementors.
pub const MAX_WRITE_CHUNK_BYTES: usize = 2 * 1024 * 1024;
