//! Existence probing: reduce a digest set to the remotely-missing subset.

use crate::error::{Error, Result};
use crate::pool::dispatch_bounded;
use crate::Client;
use porter_core::{Digest, MAX_QUERY_COUNT};
use porter_rpc::messages::FindMissingBlobsRequest;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

impl Client {
    /// Query the CAS for the subset of `digests` it does not have.
    ///
    /// Queries are issued in batches of at most [`MAX_QUERY_COUNT`] digests
    /// over the configured worker pool. The result carries no order
    /// guarantee.
    pub async fn find_missing_blobs(
        &self,
        cancel: &CancellationToken,
        digests: &[Digest],
    ) -> Result<Vec<Digest>> {
        if self.config.cas_concurrency < 1 {
            return Err(Error::InvalidConfig(
                "cas_concurrency must be at least 1".to_string(),
            ));
        }

        let queries: Vec<Vec<Digest>> = digests
            .chunks(MAX_QUERY_COUNT)
            .map(|chunk| chunk.to_vec())
            .collect();
        tracing::debug!(count = queries.len(), "query batches created");

        let missing = Mutex::new(Vec::new());
        let missing_ref = &missing;
        let token = cancel.child_token();
        let token_ref = &token;
        let this = self;

        dispatch_bounded(
            &token,
            self.config.cas_concurrency,
            queries,
            move |batch: Vec<Digest>| async move {
                let request = FindMissingBlobsRequest {
                    instance_name: this.config.instance_name.clone(),
                    blob_digests: batch,
                };
                let response = this
                    .retrier
                    .run(token_ref, move || {
                        let request = request.clone();
                        this.call_with_timeout(token_ref, async move {
                            this.cas.find_missing_blobs(request).await
                        })
                    })
                    .await?;
                missing_ref
                    .lock()
                    .await
                    .extend(response.missing_blob_digests);
                Ok(())
            },
        )
        .await?;

        Ok(missing.into_inner())
    }
}
