//! # assetgate-core: Foundational Types
//!
//! The leaf of the workspace dependency graph. Defines the primitives every
//! other crate relies on to keep filename and content bound together:
//!
//! 1. **`ContentDigest` / `Sha256Digester`.** SHA-256 over the full byte
//!    content. The streaming digester and the whole-buffer helper produce the
//!    same digest for any chunking of the same bytes.
//!
//! 2. **`AssetName` newtype.** Every filename that reaches storage has passed
//!    the traversal guard. No bare strings are handed to a backend.
//!
//! 3. **`UploadPolicy`.** The size ceiling and the declared media-type
//!    allow-list, checked before any byte is written.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `assetgate-*` crates.
//! - No I/O. No `unwrap()` outside tests.

pub mod digest;
pub mod error;
pub mod media;
pub mod name;

pub use digest::{compute_digest, verify, ContentDigest, Sha256Digester};
pub use error::{NameError, UploadPolicyError};
pub use media::{
    normalize_media_type, UploadPolicy, DEFAULT_ALLOWED_MEDIA_TYPES, DEFAULT_MAX_UPLOAD_BYTES,
};
pub use name::AssetName;
