//! # Upload Policy
//!
//! Size ceiling and declared media-type allow-list applied to every upload.
//! Content is never sniffed: only the media type the client declares is
//! checked.

use serde::{Deserialize, Serialize};

use crate::error::UploadPolicyError;

/// 25 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

pub const DEFAULT_ALLOWED_MEDIA_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "video/mp4",
    "video/webm",
    "audio/mpeg",
    "audio/ogg",
    "audio/wav",
];

/// Strip parameters and whitespace, lowercase the rest.
///
/// `"Image/PNG; charset=binary"` becomes `"image/png"`.
pub fn normalize_media_type(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPolicy {
    pub max_upload_bytes: u64,
    /// Normalized media types.
    pub allowed_media_types: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_media_types: DEFAULT_ALLOWED_MEDIA_TYPES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

impl UploadPolicy {
    /// Build a policy, normalizing and de-duplicating the allow-list.
    pub fn new<I, S>(max_upload_bytes: u64, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut allowed_media_types: Vec<String> = Vec::new();
        for media in allowed {
            let normalized = normalize_media_type(media.as_ref());
            if !normalized.is_empty() && !allowed_media_types.contains(&normalized) {
                allowed_media_types.push(normalized);
            }
        }
        Self {
            max_upload_bytes,
            allowed_media_types,
        }
    }

    /// Reject a size above the ceiling. A size equal to the ceiling passes.
    pub fn check_size(&self, size: u64) -> Result<(), UploadPolicyError> {
        if size > self.max_upload_bytes {
            return Err(UploadPolicyError::TooLarge {
                size,
                max: self.max_upload_bytes,
            });
        }
        Ok(())
    }

    /// Check a declared media type and return its normalized form.
    pub fn check_media_type(&self, declared: Option<&str>) -> Result<String, UploadPolicyError> {
        let normalized = declared
            .map(normalize_media_type)
            .filter(|s| !s.is_empty())
            .ok_or(UploadPolicyError::MissingMediaType)?;
        if self.allowed_media_types.iter().any(|m| *m == normalized) {
            Ok(normalized)
        } else {
            Err(UploadPolicyError::UnsupportedMediaType(normalized))
        }
    }
}
