use async_trait::async_trait;
use bytes::Bytes;
use porter_core::{resource, Digest, MAX_BATCH_BYTES};
use porter_rpc::messages::{
    BatchUpdateBlobsRequest, BatchUpdateBlobsResponse, FindMissingBlobsRequest,
    FindMissingBlobsResponse, GetTreeRequest, GetTreeResponse, UploadResponse,
};
use porter_rpc::{
    ByteStreamTransport, CasService, RpcError, RpcResult, RpcStatus, StatusCode, TreePageStream,
};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// In-memory fake of the whole remote CAS surface: blob store, batch
/// updates with scriptable per-entry statuses, byte-stream reads/writes,
/// and pre-paginated GetTree responses. Counts every RPC so tests can
/// assert on batching and retry behavior.
pub struct InMemoryCas {
    expected_instance: String,
    blobs: Mutex<HashMap<Digest, Bytes>>,
    /// Per-digest status sequences consumed by successive batch updates.
    /// Once a digest's script runs dry it behaves normally.
    scripted: Mutex<HashMap<Digest, VecDeque<StatusCode>>>,
    trees: Mutex<HashMap<Digest, Vec<GetTreeResponse>>>,
    /// When armed, the next GetTree stream fails after its first page.
    tree_failure_armed: AtomicBool,
    /// Bytes silently dropped from the tail of every streamed read.
    truncate_reads: AtomicUsize,
    /// Artificial latency per mutating RPC.
    write_delay: Mutex<Duration>,
    pub find_missing_calls: AtomicUsize,
    pub batch_calls: AtomicUsize,
    pub write_calls: AtomicUsize,
    pub tree_calls: AtomicUsize,
    /// The digests requested by each batch update, in call order.
    pub batch_requests: Mutex<Vec<Vec<Digest>>>,
}

impl InMemoryCas {
    pub fn new(expected_instance: &str) -> Self {
        Self {
            expected_instance: expected_instance.to_string(),
            blobs: Mutex::new(HashMap::new()),
            scripted: Mutex::new(HashMap::new()),
            trees: Mutex::new(HashMap::new()),
            tree_failure_armed: AtomicBool::new(false),
            truncate_reads: AtomicUsize::new(0),
            write_delay: Mutex::new(Duration::ZERO),
            find_missing_calls: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
            write_calls: AtomicUsize::new(0),
            tree_calls: AtomicUsize::new(0),
            batch_requests: Mutex::new(Vec::new()),
        }
    }

    /// Mark a blob as already present remotely.
    pub fn seed_blob(&self, data: &[u8]) -> Digest {
        let digest = Digest::of_blob(data);
        self.blobs
            .lock()
            .unwrap()
            .insert(digest, Bytes::copy_from_slice(data));
        digest
    }

    pub fn contains(&self, digest: &Digest) -> bool {
        self.blobs.lock().unwrap().contains_key(digest)
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    /// Script the statuses successive batch updates return for a digest.
    pub fn script_statuses(&self, digest: Digest, codes: &[StatusCode]) {
        self.scripted
            .lock()
            .unwrap()
            .insert(digest, codes.iter().copied().collect());
    }

    /// Install pre-paginated GetTree pages for a root digest.
    pub fn set_tree_pages(&self, root: Digest, pages: Vec<GetTreeResponse>) {
        self.trees.lock().unwrap().insert(root, pages);
    }

    /// Make the next GetTree stream fail transiently after one page.
    pub fn arm_tree_failure(&self) {
        self.tree_failure_armed.store(true, Ordering::SeqCst);
    }

    /// Drop the last `n` bytes of every streamed read.
    pub fn truncate_reads_by(&self, n: usize) {
        self.truncate_reads.store(n, Ordering::SeqCst);
    }

    /// Delay every mutating RPC by the given duration.
    pub fn set_write_delay(&self, delay: Duration) {
        *self.write_delay.lock().unwrap() = delay;
    }

    fn check_instance(&self, instance: &str) -> RpcResult<()> {
        if instance != self.expected_instance {
            return Err(RpcError::Status(RpcStatus::new(
                StatusCode::InvalidArgument,
                format!("expected instance {:?}", self.expected_instance),
            )));
        }
        Ok(())
    }

    async fn apply_write_delay(&self) {
        let delay = *self.write_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl CasService for InMemoryCas {
    async fn find_missing_blobs(
        &self,
        request: FindMissingBlobsRequest,
    ) -> RpcResult<FindMissingBlobsResponse> {
        self.find_missing_calls.fetch_add(1, Ordering::SeqCst);
        self.check_instance(&request.instance_name)?;

        let blobs = self.blobs.lock().unwrap();
        let missing_blob_digests = request
            .blob_digests
            .into_iter()
            .filter(|dg| !blobs.contains_key(dg))
            .collect();
        Ok(FindMissingBlobsResponse {
            missing_blob_digests,
        })
    }

    async fn batch_update_blobs(
        &self,
        request: BatchUpdateBlobsRequest,
    ) -> RpcResult<BatchUpdateBlobsResponse> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.check_instance(&request.instance_name)?;
        self.apply_write_delay().await;
        self.batch_requests
            .lock()
            .unwrap()
            .push(request.requests.iter().map(|r| r.digest).collect());

        let total: u64 = request.requests.iter().map(|r| r.digest.size_bytes).sum();
        if total > MAX_BATCH_BYTES {
            return Err(RpcError::Status(RpcStatus::new(
                StatusCode::InvalidArgument,
                format!("batch of {total} bytes exceeds maximum of {MAX_BATCH_BYTES}"),
            )));
        }

        let mut responses = Vec::with_capacity(request.requests.len());
        for entry in request.requests {
            if let Some(code) = self
                .scripted
                .lock()
                .unwrap()
                .get_mut(&entry.digest)
                .and_then(|codes| codes.pop_front())
            {
                if !code.is_ok() {
                    responses.push(UploadResponse {
                        digest: entry.digest,
                        status: RpcStatus::new(code, format!("scripted {code}")),
                    });
                    continue;
                }
            }
            let actual = Digest::of_blob(&entry.data);
            if actual != entry.digest {
                responses.push(UploadResponse {
                    digest: entry.digest,
                    status: RpcStatus::new(
                        StatusCode::InvalidArgument,
                        format!("digest mismatch: content is {actual}, request said {}", entry.digest),
                    ),
                });
                continue;
            }
            self.blobs.lock().unwrap().insert(entry.digest, entry.data);
            responses.push(UploadResponse {
                digest: entry.digest,
                status: RpcStatus::ok(),
            });
        }
        Ok(BatchUpdateBlobsResponse { responses })
    }

    fn get_tree(&self, request: GetTreeRequest) -> TreePageStream<'_> {
        self.tree_calls.fetch_add(1, Ordering::SeqCst);

        let mut items: Vec<RpcResult<GetTreeResponse>> = Vec::new();
        if let Err(err) = self.check_instance(&request.instance_name) {
            items.push(Err(err));
            return Box::pin(futures::stream::iter(items));
        }

        let pages = self
            .trees
            .lock()
            .unwrap()
            .get(&request.root_digest)
            .cloned();
        let Some(pages) = pages else {
            items.push(Err(RpcError::Status(RpcStatus::new(
                StatusCode::NotFound,
                format!("no tree rooted at {}", request.root_digest),
            ))));
            return Box::pin(futures::stream::iter(items));
        };

        let start = if request.page_token.is_empty() {
            0
        } else {
            request.page_token.parse::<usize>().unwrap_or(0)
        };
        let fail_midway = self.tree_failure_armed.swap(false, Ordering::SeqCst)
            && pages.len() > start + 1;
        for (index, page) in pages.into_iter().enumerate().skip(start) {
            items.push(Ok(page));
            if fail_midway && index == start {
                items.push(Err(RpcError::Status(RpcStatus::new(
                    StatusCode::Unavailable,
                    "stream broke between pages",
                ))));
                break;
            }
        }
        Box::pin(futures::stream::iter(items))
    }
}

#[async_trait]
impl ByteStreamTransport for InMemoryCas {
    async fn write_bytes(&self, name: &str, data: Bytes) -> RpcResult<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.apply_write_delay().await;

        let (instance, _upload_id, digest) = resource::parse_write_resource(name)
            .map_err(|e| RpcError::Status(RpcStatus::new(StatusCode::InvalidArgument, e.to_string())))?;
        self.check_instance(&instance)?;

        let actual = Digest::of_blob(&data);
        if actual != digest {
            return Err(RpcError::Status(RpcStatus::new(
                StatusCode::InvalidArgument,
                format!("digest mismatch: content is {actual}, resource said {digest}"),
            )));
        }
        self.blobs.lock().unwrap().insert(digest, data);
        Ok(())
    }

    async fn read_streamed(
        &self,
        name: &str,
        offset: u64,
        limit: u64,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> RpcResult<u64> {
        let (instance, digest) = resource::parse_read_resource(name)
            .map_err(|e| RpcError::Status(RpcStatus::new(StatusCode::InvalidArgument, e.to_string())))?;
        self.check_instance(&instance)?;

        let blob = self
            .blobs
            .lock()
            .unwrap()
            .get(&digest)
            .cloned()
            .ok_or_else(|| {
                RpcError::Status(RpcStatus::new(
                    StatusCode::NotFound,
                    format!("no blob with digest {digest}"),
                ))
            })?;

        let start = (offset as usize).min(blob.len());
        let mut window = &blob[start..];
        if limit > 0 {
            window = &window[..(limit as usize).min(window.len())];
        }
        let drop_tail = self.truncate_reads.load(Ordering::SeqCst).min(window.len());
        window = &window[..window.len() - drop_tail];

        sink.write_all(window).await?;
        Ok(window.len() as u64)
    }

    async fn read_to_file(&self, name: &str, path: &Path) -> RpcResult<u64> {
        let mut file = tokio::fs::File::create(path).await?;
        let written = self.read_streamed(name, 0, 0, &mut file).await?;
        file.flush().await?;
        Ok(written)
    }
}
