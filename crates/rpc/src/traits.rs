//! Collaborator trait definitions.
//!
//! The client core depends only on these capability sets; concrete gRPC
//! bindings live behind them.

use crate::error::RpcResult;
use crate::messages::{
    BatchUpdateBlobsRequest, BatchUpdateBlobsResponse, FindMissingBlobsRequest,
    FindMissingBlobsResponse, GetTreeRequest, GetTreeResponse,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::path::Path;
use std::pin::Pin;
use tokio::io::AsyncWrite;

/// A boxed stream of GetTree pages.
pub type TreePageStream<'a> = Pin<Box<dyn Stream<Item = RpcResult<GetTreeResponse>> + Send + 'a>>;

/// The unary/paged CAS RPC surface.
#[async_trait]
pub trait CasService: Send + Sync + 'static {
    /// Ask the remote which of the given digests it lacks.
    async fn find_missing_blobs(
        &self,
        request: FindMissingBlobsRequest,
    ) -> RpcResult<FindMissingBlobsResponse>;

    /// Upload a set of small blobs in one RPC, receiving a per-entry status.
    async fn batch_update_blobs(
        &self,
        request: BatchUpdateBlobsRequest,
    ) -> RpcResult<BatchUpdateBlobsResponse>;

    /// Walk a directory tree, one page of Directory messages per item.
    ///
    /// The stream ends after the page whose `next_page_token` is empty. Each
    /// call starts from the request's `page_token`.
    fn get_tree(&self, request: GetTreeRequest) -> TreePageStream<'_>;
}

/// The byte-stream transport primitives.
///
/// Implementations own chunked framing, write offsets, the finish bit, and
/// committed-size verification; callers hand over whole payloads and
/// resource names.
#[async_trait]
pub trait ByteStreamTransport: Send + Sync + 'static {
    /// Write a blob under a write resource name.
    async fn write_bytes(&self, resource: &str, data: Bytes) -> RpcResult<()>;

    /// Read a blob (or a slice of it) into the sink, returning the number of
    /// bytes written. A `limit` of zero means read to the end.
    async fn read_streamed(
        &self,
        resource: &str,
        offset: u64,
        limit: u64,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> RpcResult<u64>;

    /// Read a whole blob into a local file, returning the number of bytes
    /// written.
    async fn read_to_file(&self, resource: &str, path: &Path) -> RpcResult<u64>;
}
