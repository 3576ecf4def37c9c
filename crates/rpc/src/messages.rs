//! Wire message types for the CAS surface.
//!
//! Plain serde structs standing in for the Remote Execution v2 schema. The
//! transport owns wire-level framing; these types only fix field shapes and
//! the canonical byte encoding used for content-addressed messages.

use bytes::Bytes;
use porter_core::Digest;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::error::RpcResult;
use crate::status::RpcStatus;

/// Encode a message into its canonical byte form.
///
/// Content-addressed messages (Tree blobs, Directory nodes) are stored in the
/// CAS under the digest of exactly these bytes.
pub fn encode<T: Serialize>(message: &T) -> RpcResult<Vec<u8>> {
    Ok(serde_json::to_vec(message)?)
}

/// Decode a message from its canonical byte form.
pub fn decode<T: DeserializeOwned>(data: &[u8]) -> RpcResult<T> {
    Ok(serde_json::from_slice(data)?)
}

// =============================================================================
// CAS RPCs
// =============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FindMissingBlobsRequest {
    pub instance_name: String,
    pub blob_digests: Vec<Digest>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FindMissingBlobsResponse {
    pub missing_blob_digests: Vec<Digest>,
}

/// One entry of a batch update: a digest and the bytes it addresses.
#[derive(Clone, Debug)]
pub struct UploadRequest {
    pub digest: Digest,
    pub data: Bytes,
}

#[derive(Clone, Debug)]
pub struct BatchUpdateBlobsRequest {
    pub instance_name: String,
    pub requests: Vec<UploadRequest>,
}

/// Per-entry outcome of a batch update.
#[derive(Clone, Debug)]
pub struct UploadResponse {
    pub digest: Digest,
    pub status: RpcStatus,
}

#[derive(Clone, Debug, Default)]
pub struct BatchUpdateBlobsResponse {
    pub responses: Vec<UploadResponse>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GetTreeRequest {
    pub instance_name: String,
    pub root_digest: Digest,
    /// Empty for the first page.
    #[serde(default)]
    pub page_token: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GetTreeResponse {
    pub directories: Vec<Directory>,
    /// Empty on the final page.
    #[serde(default)]
    pub next_page_token: String,
}

// =============================================================================
// Directory trees
// =============================================================================

/// A single directory level: leaf files, child directories, and symlinks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Directory {
    #[serde(default)]
    pub files: Vec<FileNode>,
    #[serde(default)]
    pub directories: Vec<DirectoryNode>,
    #[serde(default)]
    pub symlinks: Vec<SymlinkNode>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    pub name: String,
    pub digest: Digest,
    #[serde(default)]
    pub is_executable: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DirectoryNode {
    pub name: String,
    /// Digest of the child Directory message in canonical encoding.
    pub digest: Digest,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SymlinkNode {
    pub name: String,
    pub target: String,
}

/// A directory and all of its transitive children, stored in the CAS as one
/// content-addressed blob.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub root: Directory,
    #[serde(default)]
    pub children: Vec<Directory>,
}

// =============================================================================
// Action results
// =============================================================================

/// The output manifest of a completed remote action.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ActionResult {
    #[serde(default)]
    pub output_files: Vec<OutputFile>,
    #[serde(default)]
    pub output_file_symlinks: Vec<OutputSymlink>,
    #[serde(default)]
    pub output_directory_symlinks: Vec<OutputSymlink>,
    #[serde(default)]
    pub output_directories: Vec<OutputDirectory>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputFile {
    pub path: String,
    pub digest: Digest,
    #[serde(default)]
    pub is_executable: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputSymlink {
    pub path: String,
    pub target: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputDirectory {
    pub path: String,
    /// Digest of the Tree blob describing the directory's contents.
    pub tree_digest: Digest,
}
