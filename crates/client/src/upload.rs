//! Upload paths: bulk driver, batch uploads, and single-blob streaming.

use crate::batch::make_batches;
use crate::error::{Error, Result};
use crate::pool::dispatch_bounded;
use crate::Client;
use bytes::Bytes;
use porter_core::{resource, Digest, MAX_BATCH_BYTES, MAX_BATCH_COUNT};
use porter_rpc::messages::{BatchUpdateBlobsRequest, UploadRequest};
use porter_rpc::{RpcError, RpcStatus};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

impl Client {
    /// Store a large number of blobs from a digest-to-blob map.
    ///
    /// First queries the CAS for which blobs are missing and uploads only
    /// those, packed into batches and dispatched over the configured worker
    /// pool. Batches of one blob (including anything too big for a batch
    /// RPC) go over the byte stream; everything else goes through the batch
    /// RPC.
    pub async fn write_blobs(
        &self,
        cancel: &CancellationToken,
        blobs: &HashMap<Digest, Bytes>,
    ) -> Result<()> {
        if self.config.cas_concurrency < 1 {
            return Err(Error::InvalidConfig(
                "cas_concurrency must be at least 1".to_string(),
            ));
        }

        let digests: Vec<Digest> = blobs.keys().copied().collect();
        let missing = self.find_missing_blobs(cancel, &digests).await?;
        tracing::debug!(count = missing.len(), "blobs to store");

        let batches: Vec<Vec<Digest>> = if self.config.use_batch_ops {
            make_batches(missing)
        } else {
            tracing::debug!("batch ops disabled, uploading individually");
            missing.into_iter().map(|dg| vec![dg]).collect()
        };

        let token = cancel.child_token();
        let token_ref = &token;
        let this = self;
        dispatch_bounded(
            &token,
            self.config.cas_concurrency,
            batches,
            move |batch: Vec<Digest>| async move {
                if batch.len() > 1 {
                    tracing::debug!(blobs = batch.len(), "uploading batch");
                    let subset: HashMap<Digest, Bytes> = batch
                        .iter()
                        .filter_map(|dg| blobs.get(dg).map(|data| (*dg, data.clone())))
                        .collect();
                    this.batch_write_blobs(token_ref, &subset).await
                } else {
                    tracing::debug!("uploading single blob");
                    match blobs.get(&batch[0]) {
                        Some(data) => this.write_blob(token_ref, data).await.map(|_| ()),
                        None => Err(Error::InvalidArgument(format!(
                            "remote reported digest {} missing but it was never offered",
                            batch[0]
                        ))),
                    }
                }
            },
        )
        .await
    }

    /// Upload a set of blobs in one batch RPC.
    ///
    /// The blobs must collectively fit the batch ceilings; digests are
    /// computed in advance by the caller. Entries that fail with a retriable
    /// status are re-issued (alone) under the retry engine; any fatal entry
    /// fails the whole batch with an aggregate error.
    pub async fn batch_write_blobs(
        &self,
        cancel: &CancellationToken,
        blobs: &HashMap<Digest, Bytes>,
    ) -> Result<()> {
        let mut requests = Vec::with_capacity(blobs.len());
        let mut total_bytes: u64 = 0;
        for (digest, data) in blobs {
            total_bytes += digest.size_bytes;
            requests.push(UploadRequest {
                digest: *digest,
                data: data.clone(),
            });
        }
        if total_bytes > MAX_BATCH_BYTES {
            return Err(Error::BatchTooLarge {
                total_bytes,
                max: MAX_BATCH_BYTES,
            });
        }
        if blobs.len() > MAX_BATCH_COUNT {
            return Err(Error::BatchTooMany {
                count: blobs.len(),
                max: MAX_BATCH_COUNT,
            });
        }

        // The pending list shrinks to the retriable subset after every
        // round; the retry engine re-invokes the closure over whatever is
        // left. A fatal entry parks the aggregate error in `fatal` and
        // returns its (non-retriable) status to stop the engine.
        let pending = Mutex::new(requests);
        let fatal: Mutex<Option<Error>> = Mutex::new(None);
        let pending_ref = &pending;
        let fatal_ref = &fatal;
        let this = self;

        let outcome = self
            .retrier
            .run(cancel, move || async move {
                let request = BatchUpdateBlobsRequest {
                    instance_name: this.config.instance_name.clone(),
                    requests: pending_ref.lock().await.clone(),
                };
                let response = this
                    .call_with_timeout(cancel, this.cas.batch_update_blobs(request))
                    .await?;

                let mut failed = Vec::new();
                let mut failures = 0;
                let mut first_fatal: Option<(Digest, RpcStatus)> = None;
                let mut retriable: Option<RpcError> = None;
                for entry in response.responses {
                    if entry.status.is_ok() {
                        continue;
                    }
                    failures += 1;
                    let err = RpcError::Status(entry.status.clone());
                    if this.retrier.should_retry(&err) {
                        if let Some(data) = blobs.get(&entry.digest) {
                            failed.push(UploadRequest {
                                digest: entry.digest,
                                data: data.clone(),
                            });
                        }
                        retriable = Some(err);
                    } else if first_fatal.is_none() {
                        first_fatal = Some((entry.digest, entry.status));
                    }
                }
                *pending_ref.lock().await = failed;

                if let Some((digest, status)) = first_fatal {
                    *fatal_ref.lock().await = Some(Error::BatchUpload {
                        failures,
                        digest,
                        message: status.message.clone(),
                    });
                    return Err(RpcError::Status(status));
                }
                if let Some(err) = retriable {
                    return Err(err);
                }
                Ok(())
            })
            .await;

        match outcome {
            Ok(()) => Ok(()),
            Err(err) => match fatal.lock().await.take() {
                Some(aggregate) => Err(aggregate),
                None => Err(err.into()),
            },
        }
    }

    /// Upload a single blob over the byte stream, returning its digest.
    ///
    /// Each call writes under a fresh upload identifier, so concurrent
    /// uploads of the same digest are independent on the wire.
    pub async fn write_blob(&self, cancel: &CancellationToken, blob: &[u8]) -> Result<Digest> {
        let digest = Digest::of_blob(blob);
        let name = resource::write_resource_name(&self.config.instance_name, &digest);
        let data = Bytes::copy_from_slice(blob);

        let name_ref = name.as_str();
        let data_ref = &data;
        let this = self;
        self.retrier
            .run(cancel, move || {
                let data = data_ref.clone();
                this.call_with_timeout(cancel, async move {
                    this.transport.write_bytes(name_ref, data).await
                })
            })
            .await?;
        Ok(digest)
    }

    /// Encode a wire message and upload it, returning its digest.
    pub async fn write_message<T: Serialize>(
        &self,
        cancel: &CancellationToken,
        message: &T,
    ) -> Result<Digest> {
        let encoded = porter_rpc::encode(message)?;
        self.write_blob(cancel, &encoded).await
    }
}
