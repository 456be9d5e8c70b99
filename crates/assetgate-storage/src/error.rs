//! # Storage Errors

use thiserror::Error;

/// Failures from a storage backend.
///
/// A missing object is never an error: `exists` answers `false` and
/// `delete` answers `Ok(false)`. Everything here is a genuine failure the
/// caller must not mistake for absence.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("filesystem I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("object storage {op} failed for key {key:?}: {message}")]
    Remote {
        op: &'static str,
        key: String,
        message: String,
    },

    #[error("{op} is not supported by the {backend} backend")]
    Unsupported {
        op: &'static str,
        backend: &'static str,
    },
}

impl StorageError {
    pub(crate) fn remote(op: &'static str, key: &str, message: impl Into<String>) -> Self {
        Self::Remote {
            op,
            key: key.to_string(),
            message: message.into(),
        }
    }
}
