//! # Configuration
//!
//! Everything is read from environment variables at startup. Tests build an
//! [`AppConfig`] directly or through [`AppConfig::from_lookup`].
//!
//! | Variable | Default |
//! |----------|---------|
//! | `PORT` | `41839` |
//! | `STORAGE_TYPE` | `local` (`remote` / `s3` for object storage) |
//! | `LOCAL_STORAGE_PATH` | `assets` |
//! | `S3_BUCKET_NAME`, `ASSET_URL` | required when remote |
//! | `S3_ENDPOINT_URL`, `S3_ACCESS_KEY_ID`, `S3_SECRET_ACCESS_KEY` | optional |
//! | `S3_REGION` | `auto` |
//! | `DATABASE_URL` | unset: in-memory catalog |
//! | `MAX_FILE_SIZE` | `26214400` |
//! | `ALLOWED_MIME_TYPES` | images, video and audio defaults |
//! | `CLIENT_MARKER_HEADER` | `x-risu-git-flag` |
//! | `READ_COOLDOWN_SECS` | `3600` |
//! | `CACHE_CAPACITY` | `100000` |
//! | `EXISTENCE_CACHE_TTL_SECS` | `86400` |
//! | `PROBE_CHECKS_BACKEND` | `false` |
//! | `RETENTION_DAYS` | `60` |
//! | `SWEEP_INTERVAL_SECS` | `86400` (`0` disables) |
//! | `LOG_FORMAT` | `text` (`json`) |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use assetgate_core::{DEFAULT_ALLOWED_MEDIA_TYPES, DEFAULT_MAX_UPLOAD_BYTES};
use assetgate_storage::RemoteSettings;
use axum::http::HeaderName;
use url::Url;

pub const DEFAULT_PORT: u16 = 41839;
pub const DEFAULT_MARKER_HEADER: &str = "x-risu-git-flag";

/// Where asset bytes live.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    Local { root: PathBuf },
    Remote(RemoteSettings),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Application configuration.
///
/// Custom `Debug` redacts `database_url`, which may embed a password.
/// Object storage credentials are redacted by [`RemoteSettings`] itself.
#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    pub storage: StorageConfig,
    pub database_url: Option<String>,
    pub max_upload_bytes: u64,
    pub allowed_media_types: Vec<String>,
    pub marker_header: HeaderName,
    pub read_cooldown: Duration,
    pub cache_capacity: u64,
    pub existence_cache_ttl: Duration,
    pub probe_checks_backend: bool,
    pub retention_days: u32,
    /// `None` disables the periodic sweep.
    pub sweep_interval: Option<Duration>,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("storage", &self.storage)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("allowed_media_types", &self.allowed_media_types)
            .field("marker_header", &self.marker_header)
            .field("read_cooldown", &self.read_cooldown)
            .field("cache_capacity", &self.cache_capacity)
            .field("existence_cache_ttl", &self.existence_cache_ttl)
            .field("probe_checks_backend", &self.probe_checks_backend)
            .field("retention_days", &self.retention_days)
            .field("sweep_interval", &self.sweep_interval)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            storage: StorageConfig::Local {
                root: PathBuf::from("assets"),
            },
            database_url: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_media_types: DEFAULT_ALLOWED_MEDIA_TYPES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            marker_header: HeaderName::from_static(DEFAULT_MARKER_HEADER),
            read_cooldown: Duration::from_secs(3600),
            cache_capacity: 100_000,
            existence_cache_ttl: Duration::from_secs(86_400),
            probe_checks_backend: false,
            retention_days: 60,
            sweep_interval: Some(Duration::from_secs(86_400)),
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let storage = match get("STORAGE_TYPE")
            .map(|s| s.trim().to_ascii_lowercase())
            .as_deref()
        {
            None | Some("local") => StorageConfig::Local {
                root: get("LOCAL_STORAGE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("assets")),
            },
            Some("remote") | Some("s3") => StorageConfig::Remote(RemoteSettings {
                bucket: get("S3_BUCKET_NAME").ok_or(ConfigError::MissingVar("S3_BUCKET_NAME"))?,
                endpoint_url: get("S3_ENDPOINT_URL")
                    .map(|raw| parse_url("S3_ENDPOINT_URL", &raw).map(|_| raw))
                    .transpose()?,
                region: Some(get("S3_REGION").unwrap_or_else(|| "auto".to_string())),
                access_key_id: get("S3_ACCESS_KEY_ID"),
                secret_access_key: get("S3_SECRET_ACCESS_KEY"),
                public_base_url: {
                    let raw = get("ASSET_URL").ok_or(ConfigError::MissingVar("ASSET_URL"))?;
                    parse_url("ASSET_URL", &raw)?;
                    raw
                },
            }),
            Some(other) => return Err(ConfigError::UnknownStorageType(other.to_string())),
        };

        let marker_header = match get("CLIENT_MARKER_HEADER") {
            Some(raw) => HeaderName::from_str(raw.trim()).map_err(|e| ConfigError::InvalidValue {
                var: "CLIENT_MARKER_HEADER",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => defaults.marker_header,
        };

        let allowed_media_types = match get("ALLOWED_MIME_TYPES") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.allowed_media_types,
        };

        let sweep_secs: u64 = parse_var(&get, "SWEEP_INTERVAL_SECS", 86_400)?;
        let log_format = match get("LOG_FORMAT").map(|s| s.to_ascii_lowercase()).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            port: parse_var(&get, "PORT", DEFAULT_PORT)?,
            storage,
            database_url: get("DATABASE_URL"),
            max_upload_bytes: parse_var(&get, "MAX_FILE_SIZE", DEFAULT_MAX_UPLOAD_BYTES)?,
            allowed_media_types,
            marker_header,
            read_cooldown: Duration::from_secs(parse_var(&get, "READ_COOLDOWN_SECS", 3600)?),
            cache_capacity: parse_var(&get, "CACHE_CAPACITY", 100_000)?,
            existence_cache_ttl: Duration::from_secs(parse_var(
                &get,
                "EXISTENCE_CACHE_TTL_SECS",
                86_400,
            )?),
            probe_checks_backend: parse_bool(&get, "PROBE_CHECKS_BACKEND", false)?,
            retention_days: parse_var(&get, "RETENTION_DAYS", 60)?,
            sweep_interval: (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs)),
            log_format,
        })
    }

    pub fn storage_kind(&self) -> &'static str {
        match self.storage {
            StorageConfig::Local { .. } => "local",
            StorageConfig::Remote(_) => "remote",
        }
    }
}

fn parse_var<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_bool<G>(get: &G, var: &'static str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(var).map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::InvalidValue {
            var,
            value: other.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

fn parse_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    MissingVar(&'static str),
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("unknown STORAGE_TYPE {0:?}: expected local, remote or s3")]
    UnknownStorageType(String),
}
