//! # Content Digest
//!
//! SHA-256 content addressing for uploaded assets.
//!
//! ## Integrity Invariant
//!
//! An asset is accepted only when the hex digest of its bytes equals the base
//! name of the filename it is stored under. [`verify()`] fails closed: any
//! difference, including letter case, is a rejection.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A SHA-256 digest of an asset's full byte content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    bytes: [u8; 32],
}

impl ContentDigest {
    /// Wrap a raw 32-byte digest.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Render the digest as a lowercase hex string (64 chars).
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

/// Incremental SHA-256 over a chunked byte stream.
///
/// Feeding the same bytes in any chunking yields the same digest as
/// [`compute_digest()`] over the concatenation.
#[derive(Debug, Clone, Default)]
pub struct Sha256Digester {
    hasher: Sha256,
    len: u64,
}

impl Sha256Digester {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb the next chunk.
    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.len += chunk.len() as u64;
    }

    /// Number of bytes absorbed so far.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Consume the digester and produce the digest.
    pub fn finalize(self) -> ContentDigest {
        let hash = self.hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hash);
        ContentDigest::from_bytes(bytes)
    }
}

/// Compute the SHA-256 digest of a whole buffer as lowercase hex.
pub fn compute_digest(data: &[u8]) -> String {
    let mut digester = Sha256Digester::new();
    digester.update(data);
    digester.finalize().to_hex()
}

/// Check that the base name of `filename` equals `digest`.
///
/// The base name is everything before the first `.`. Filenames containing a
/// path separator never verify.
pub fn verify(filename: &str, digest: &str) -> bool {
    if filename.contains('/') || filename.contains('\\') {
        return false;
    }
    let base = filename.split('.').next().unwrap_or_default();
    !base.is_empty() && base == digest
}
