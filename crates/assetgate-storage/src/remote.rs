//! # Remote Object Storage Backend
//!
//! S3-compatible object storage through `aws-sdk-s3`. Each asset is one
//! object keyed by its [`AssetName`] in a single bucket. Reads are never
//! proxied: clients are redirected to `{public_base_url}/{name}`.
//!
//! Only an explicit not-found answer to `HeadObject` means "absent".
//! Throttling, auth failures and transport errors all propagate.

use assetgate_core::AssetName;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;

use crate::error::StorageError;

/// Connection settings for an S3-compatible endpoint.
#[derive(Clone, Default)]
pub struct RemoteSettings {
    pub bucket: String,
    /// Custom endpoint (R2, MinIO, ...). Enables path-style addressing.
    pub endpoint_url: Option<String>,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Public base URL that serves the bucket's objects.
    pub public_base_url: String,
}

impl std::fmt::Debug for RemoteSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSettings")
            .field("bucket", &self.bucket)
            .field("endpoint_url", &self.endpoint_url)
            .field("region", &self.region)
            .field(
                "access_key_id",
                &self.access_key_id.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct RemoteStorage {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl RemoteStorage {
    /// Build a client from the default AWS config chain, overridden by any
    /// region, static credentials or endpoint in `settings`.
    pub async fn connect(settings: RemoteSettings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let (Some(ak), Some(sk)) = (&settings.access_key_id, &settings.secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                ak.clone(),
                sk.clone(),
                None,
                None,
                "assetgate-static",
            ));
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &settings.endpoint_url {
            builder = builder.endpoint_url(endpoint.clone()).force_path_style(true);
        }

        tracing::info!(
            bucket = %settings.bucket,
            endpoint = settings.endpoint_url.as_deref().unwrap_or("<aws default>"),
            "remote storage configured"
        );
        Self::from_client(
            Client::from_conf(builder.build()),
            settings.bucket,
            settings.public_base_url,
        )
    }

    pub fn from_client(
        client: Client,
        bucket: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Public URL clients are redirected to for `name`.
    pub fn public_url(&self, name: &AssetName) -> String {
        format!(
            "{}/{}",
            self.public_base_url.trim_end_matches('/'),
            name.as_str()
        )
    }

    pub async fn save(
        &self,
        name: &AssetName,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let len = data.len() as i64;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(name.as_str())
            .body(ByteStream::from(data))
            .content_type(content_type)
            .content_length(len)
            .send()
            .await
            .map_err(|e| {
                StorageError::remote("PutObject", name.as_str(), DisplayErrorContext(&e).to_string())
            })?;
        Ok(())
    }

    pub async fn exists(&self, name: &AssetName) -> Result<bool, StorageError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(name.as_str())
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                let not_found = err.as_service_error().is_some_and(|e| e.is_not_found())
                    || err
                        .raw_response()
                        .is_some_and(|r| r.status().as_u16() == 404);
                if not_found {
                    Ok(false)
                } else {
                    Err(StorageError::remote(
                        "HeadObject",
                        name.as_str(),
                        DisplayErrorContext(&err).to_string(),
                    ))
                }
            }
        }
    }

    /// `DeleteObject` is idempotent on S3, so a missing key still reports
    /// `true`.
    pub async fn delete(&self, name: &AssetName) -> Result<bool, StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(name.as_str())
            .send()
            .await
            .map_err(|e| {
                StorageError::remote("DeleteObject", name.as_str(), DisplayErrorContext(&e).to_string())
            })?;
        Ok(true)
    }
}
