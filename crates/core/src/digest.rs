//! Content digests: the (hash, size) pair addressing every blob.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;

/// SHA-256 of a blob's contents, the hash half of a [`Digest`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

impl ContentHash {
    /// Width of the raw hash in bytes.
    pub const LEN: usize = 32;

    /// Hash a blob.
    pub fn of(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Wrap raw hash bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw hash bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse from hex. Either case is accepted.
    pub fn from_hex(hex: &str) -> crate::Result<Self> {
        let raw = hex.as_bytes();
        if raw.len() != 2 * Self::LEN {
            return Err(crate::Error::InvalidHash(format!(
                "hash must be {} hex chars, got {}",
                2 * Self::LEN,
                raw.len()
            )));
        }
        let mut bytes = [0u8; Self::LEN];
        for (byte, pair) in bytes.iter_mut().zip(raw.chunks_exact(2)) {
            *byte = hex_value(pair[0])? << 4 | hex_value(pair[1])?;
        }
        Ok(Self(bytes))
    }

    /// Encode as lowercase hex, the form used in resource names.
    pub fn to_hex(&self) -> String {
        let mut hex = String::with_capacity(2 * Self::LEN);
        for byte in self.0 {
            hex.push(char::from(HEX_DIGITS[usize::from(byte >> 4)]));
            hex.push(char::from(HEX_DIGITS[usize::from(byte & 0x0f)]));
        }
        hex
    }
}

fn hex_value(byte: u8) -> crate::Result<u8> {
    match byte {
        b'0'..=b'9' => Ok(byte - b'0'),
        b'a'..=b'f' => Ok(byte - b'a' + 10),
        b'A'..=b'F' => Ok(byte - b'A' + 10),
        other => Err(crate::Error::InvalidHash(format!(
            "invalid hex byte {other:#04x}"
        ))),
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:.16})", self.to_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A content digest: SHA-256 hash plus blob size in bytes.
///
/// Two digests are equal iff both fields are equal, and a digest uniquely
/// identifies its blob, so `Digest` is directly usable as a map key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest {
    /// SHA-256 of the blob contents.
    pub hash: ContentHash,
    /// Blob size in bytes.
    pub size_bytes: u64,
}

impl Digest {
    /// Create a digest from its parts.
    pub fn new(hash: ContentHash, size_bytes: u64) -> Self {
        Self { hash, size_bytes }
    }

    /// Compute the digest of a blob.
    pub fn of_blob(data: &[u8]) -> Self {
        Self {
            hash: ContentHash::of(data),
            size_bytes: data.len() as u64,
        }
    }

    /// Parse from the canonical `{hash}/{size}` form.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let (hash, size) = s
            .split_once('/')
            .ok_or_else(|| crate::Error::InvalidDigest(format!("expected hash/size, got: {s}")))?;
        let size_bytes = size
            .parse::<u64>()
            .map_err(|e| crate::Error::InvalidDigest(format!("bad size {size}: {e}")))?;
        Ok(Self {
            hash: ContentHash::from_hex(hash)?,
            size_bytes,
        })
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({:.16}/{})", self.hash.to_hex(), self.size_bytes)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.hash, self.size_bytes)
    }
}
