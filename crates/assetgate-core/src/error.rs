//! # Error Types
//!
//! Validation errors raised before any storage is touched.

use thiserror::Error;

/// A filename rejected by the traversal guard.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("filename is empty")]
    Empty,

    #[error("filename contains a path separator: {0:?}")]
    PathSeparator(String),

    /// Leading dots cover `.`, `..` and hidden names, which the local
    /// backend reserves for staging files.
    #[error("filename must not start with '.': {0:?}")]
    LeadingDot(String),

    #[error("filename contains a control character")]
    ControlCharacter,

    #[error("filename too long: {0} bytes (max {max})", max = crate::name::MAX_NAME_LEN)]
    TooLong(usize),
}

/// An upload rejected by the size or media-type policy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadPolicyError {
    #[error("payload of {size} bytes exceeds the {max} byte limit")]
    TooLarge { size: u64, max: u64 },

    #[error("media type not allowed: {0}")]
    UnsupportedMediaType(String),

    #[error("media type missing")]
    MissingMediaType,
}
