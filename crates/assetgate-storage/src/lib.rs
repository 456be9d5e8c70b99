//! # assetgate-storage: Durable Byte Storage
//!
//! Two interchangeable backends behind the closed [`StorageBackend`] enum:
//!
//! - [`LocalStorage`]: a flat directory with atomic write-then-rename saves.
//! - [`RemoteStorage`]: an S3-compatible bucket; reads are served by
//!   redirecting clients to a public base URL.
//!
//! Every method takes a validated [`AssetName`](assetgate_core::AssetName),
//! so no raw request path ever reaches the filesystem or an object key.

pub mod backend;
pub mod error;
pub mod local;
pub mod remote;

pub use backend::StorageBackend;
pub use error::StorageError;
pub use local::LocalStorage;
pub use remote::{RemoteSettings, RemoteStorage};
