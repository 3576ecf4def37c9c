//! Byte-stream resource names.
//!
//! Reads address a blob directly; writes carry a fresh upload identifier so
//! concurrent uploads of the same digest never collide on the wire.

use crate::digest::{ContentHash, Digest};
use uuid::Uuid;

/// Build a read resource name: `{instance}/blobs/{hash}/{size}`.
pub fn read_resource_name(instance: &str, digest: &Digest) -> String {
    format!("{}/blobs/{}/{}", instance, digest.hash, digest.size_bytes)
}

/// Build a write resource name with a fresh upload identifier:
/// `{instance}/uploads/{uuid-v4}/blobs/{hash}/{size}`.
pub fn write_resource_name(instance: &str, digest: &Digest) -> String {
    format!(
        "{}/uploads/{}/blobs/{}/{}",
        instance,
        Uuid::new_v4(),
        digest.hash,
        digest.size_bytes
    )
}

/// Parse a read resource name back into its instance and digest.
pub fn parse_read_resource(name: &str) -> crate::Result<(String, Digest)> {
    let parts: Vec<&str> = name.split('/').collect();
    let bad = || crate::Error::InvalidResource(format!("expected instance/blobs/hash/size: {name}"));
    // The instance prefix may itself contain slashes.
    if parts.len() < 4 || parts[parts.len() - 3] != "blobs" {
        return Err(bad());
    }
    let instance = parts[..parts.len() - 3].join("/");
    let digest = digest_from_parts(parts[parts.len() - 2], parts[parts.len() - 1])?;
    Ok((instance, digest))
}

/// Parse a write resource name into its instance, upload id, and digest.
pub fn parse_write_resource(name: &str) -> crate::Result<(String, Uuid, Digest)> {
    let parts: Vec<&str> = name.split('/').collect();
    let bad = || {
        crate::Error::InvalidResource(format!(
            "expected instance/uploads/uuid/blobs/hash/size: {name}"
        ))
    };
    if parts.len() < 6
        || parts[parts.len() - 5] != "uploads"
        || parts[parts.len() - 3] != "blobs"
    {
        return Err(bad());
    }
    let upload_id = Uuid::parse_str(parts[parts.len() - 4]).map_err(|_| bad())?;
    let instance = parts[..parts.len() - 5].join("/");
    let digest = digest_from_parts(parts[parts.len() - 2], parts[parts.len() - 1])?;
    Ok((instance, upload_id, digest))
}

fn digest_from_parts(hash: &str, size: &str) -> crate::Result<Digest> {
    let size_bytes = size
        .parse::<u64>()
        .map_err(|e| crate::Error::InvalidResource(format!("bad size {size}: {e}")))?;
    Ok(Digest::new(ContentHash::from_hex(hash)?, size_bytes))
}
