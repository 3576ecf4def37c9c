//! Content-addressable storage transfer client.
//!
//! This crate moves sets of content-addressed blobs between a local process
//! and a remote CAS service:
//! - Existence-filtered bulk upload over a bounded worker pool
//! - Knapsack-style batch packing under RPC size/count ceilings
//! - Per-entry retry of batch uploads
//! - Readers into memory, files, and arbitrary sinks
//! - Directory-tree enumeration and action-output flattening
//!
//! The RPC surface and byte-stream transport are injected behind the traits
//! in `porter-rpc`; this crate owns dispatch, batching, and retry semantics.

pub mod batch;
pub mod error;
mod exists;
mod pool;
mod read;
mod tree;
mod upload;

pub use batch::make_batches;
pub use error::{Error, Result};
pub use tree::{flatten_tree, Output};

pub use porter_core::{CasConfig, Digest};

use porter_rpc::{ByteStreamTransport, CasService, Retrier, RpcError, RpcResult};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A CAS transfer client.
///
/// Cheap to clone; all state is shared and request-scoped work lives only
/// for the duration of each call.
#[derive(Clone)]
pub struct Client {
    cas: Arc<dyn CasService>,
    transport: Arc<dyn ByteStreamTransport>,
    retrier: Retrier,
    config: CasConfig,
}

impl Client {
    /// Create a client over the given RPC stubs.
    pub fn new(
        config: CasConfig,
        cas: Arc<dyn CasService>,
        transport: Arc<dyn ByteStreamTransport>,
    ) -> Result<Self> {
        config.validate().map_err(Error::InvalidConfig)?;
        let retrier = Retrier::new(config.retry.clone());
        Ok(Self {
            cas,
            transport,
            retrier,
            config,
        })
    }

    /// Get the client configuration.
    pub fn config(&self) -> &CasConfig {
        &self.config
    }

    /// Issue one RPC future under the configured deadline, racing
    /// cancellation.
    pub(crate) async fn call_with_timeout<T>(
        &self,
        cancel: &CancellationToken,
        call: impl Future<Output = RpcResult<T>>,
    ) -> RpcResult<T> {
        tokio::select! {
            _ = cancel.cancelled() => Err(RpcError::Cancelled),
            result = tokio::time::timeout(self.config.rpc_timeout(), call) => match result {
                Ok(inner) => inner,
                Err(_) => Err(RpcError::TimedOut),
            }
        }
    }
}
