//! Reader family: fetch blobs into memory, files, or arbitrary sinks.

use crate::error::{Error, Result};
use crate::Client;
use bytes::Bytes;
use porter_core::{resource, Digest, MIN_READ_PAD};
use std::io::Cursor;
use std::path::Path;
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

impl Client {
    /// Fetch a whole blob into memory.
    pub async fn read_blob(&self, cancel: &CancellationToken, digest: &Digest) -> Result<Bytes> {
        self.read_blob_slice(cancel, digest, 0, 0).await
    }

    /// Fetch a partial blob into memory, starting at `offset` and including
    /// at most `limit` bytes (all remaining bytes when `limit` is zero).
    ///
    /// The offset must not exceed the blob size; `offset + limit` may, in
    /// which case the read simply runs to the end.
    pub async fn read_blob_range(
        &self,
        cancel: &CancellationToken,
        digest: &Digest,
        offset: u64,
        limit: u64,
    ) -> Result<Bytes> {
        self.read_blob_slice(cancel, digest, offset, limit).await
    }

    async fn read_blob_slice(
        &self,
        cancel: &CancellationToken,
        digest: &Digest,
        offset: u64,
        limit: u64,
    ) -> Result<Bytes> {
        // On 32-bit targets a valid 64-bit size may not fit in a slice.
        let _ = usize::try_from(digest.size_bytes)
            .map_err(|_| Error::SizeTooLarge(digest.size_bytes))?;
        if offset > digest.size_bytes {
            return Err(Error::InvalidArgument(format!(
                "offset {offset} out of range for a blob of size {}",
                digest.size_bytes
            )));
        }

        let mut want = digest.size_bytes - offset;
        if limit > 0 && limit < want {
            want = limit;
        }
        // Pad the capacity so the final read never reallocates.
        let mut sink = Cursor::new(Vec::with_capacity(want as usize + MIN_READ_PAD));
        self.read_streamed_window(cancel, digest, offset, limit, &mut sink)
            .await?;
        Ok(Bytes::from(sink.into_inner()))
    }

    /// Fetch a whole blob into a local file, returning the bytes read.
    pub async fn read_blob_to_file(
        &self,
        cancel: &CancellationToken,
        digest: &Digest,
        path: &Path,
    ) -> Result<u64> {
        let name = resource::read_resource_name(&self.config.instance_name, digest);
        let read = self
            .call_with_timeout(cancel, self.transport.read_to_file(&name, path))
            .await?;
        if read != digest.size_bytes {
            return Err(Error::Integrity {
                read,
                expected: digest.size_bytes,
            });
        }
        Ok(read)
    }

    /// Fetch a whole blob into the sink, returning the bytes read.
    pub async fn read_blob_streamed<W>(
        &self,
        cancel: &CancellationToken,
        digest: &Digest,
        sink: &mut W,
    ) -> Result<u64>
    where
        W: AsyncWrite + Send + Unpin,
    {
        self.read_streamed_window(cancel, digest, 0, 0, sink).await
    }

    async fn read_streamed_window<W>(
        &self,
        cancel: &CancellationToken,
        digest: &Digest,
        offset: u64,
        limit: u64,
        sink: &mut W,
    ) -> Result<u64>
    where
        W: AsyncWrite + Send + Unpin,
    {
        let name = resource::read_resource_name(&self.config.instance_name, digest);
        let read = self
            .call_with_timeout(
                cancel,
                self.transport.read_streamed(&name, offset, limit, sink),
            )
            .await?;

        let mut expected = digest.size_bytes.saturating_sub(offset);
        if limit > 0 && limit < expected {
            expected = limit;
        }
        if read != expected {
            return Err(Error::Integrity { read, expected });
        }
        Ok(read)
    }
}
