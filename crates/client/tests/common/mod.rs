pub mod mocks;

use bytes::Bytes;
use mocks::InMemoryCas;
use porter_client::Client;
use porter_core::{CasConfig, Digest};
use std::collections::HashMap;
use std::sync::Arc;

/// Build a client over a shared in-memory CAS with fast test retries.
#[allow(dead_code)]
pub fn test_client(cas: Arc<InMemoryCas>) -> Client {
    test_client_with_config(cas, CasConfig::for_testing())
}

#[allow(dead_code)]
pub fn test_client_with_config(cas: Arc<InMemoryCas>, config: CasConfig) -> Client {
    Client::new(config, cas.clone(), cas).expect("test config must validate")
}

/// Build a `{digest → bytes}` map from raw blob contents.
#[allow(dead_code)]
pub fn blob_map(blobs: &[&[u8]]) -> HashMap<Digest, Bytes> {
    blobs
        .iter()
        .map(|data| (Digest::of_blob(data), Bytes::copy_from_slice(data)))
        .collect()
}
