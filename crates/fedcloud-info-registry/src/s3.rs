// crates/fedcloud-info-registry/src/s3.rs
// ============================================================================
// Module: S3 Object Store
// Description: S3-compatible backend for published site documents.
// Purpose: List and fetch site documents from a bucket prefix.
// Dependencies: aws-config, aws-sdk-s3, tokio
// ============================================================================

//! ## Overview
//! [`S3ObjectStore`] lists `*.json` keys under a prefix with
//! `ListObjectsV2` and reads them with size-capped `GetObject` calls.
//! Document names are keys relative to the prefix. The last-modified token
//! is `"{secs}.{nanos}"` of the object's modification time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_s3::Client;
use fedcloud_info_core::MAX_DOCUMENT_BYTES;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::object_store::ObjectEntry;
use crate::object_store::ObjectStore;
use crate::object_store::ObjectStoreError;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Connection settings for an S3-compatible bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S3StoreConfig {
    /// Bucket name.
    pub bucket: String,
    /// Optional key prefix.
    pub prefix: Option<String>,
    /// Optional region override.
    pub region: Option<String>,
    /// Optional endpoint override for S3-compatible services.
    pub endpoint: Option<String>,
    /// Use path-style addressing.
    pub force_path_style: bool,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// S3-backed document store.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    /// Underlying S3 client.
    client: Client,
    /// Bucket name.
    bucket: String,
    /// Normalized key prefix, empty or ending in `/`.
    prefix: String,
}

impl S3ObjectStore {
    /// Builds a client from the ambient AWS configuration plus overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::Invalid`] when the bucket or prefix is
    /// invalid.
    pub async fn connect(config: &S3StoreConfig) -> Result<Self, ObjectStoreError> {
        if config.bucket.trim().is_empty() {
            return Err(ObjectStoreError::Invalid("bucket must be set".to_string()));
        }
        let prefix = normalize_prefix(config.prefix.as_deref().unwrap_or(""))?;
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = config.region.clone() {
            loader = loader.region(Region::new(region));
        }
        if let Some(endpoint) = config.endpoint.as_deref() {
            loader = loader.endpoint_url(endpoint);
        }
        let shared_config = loader.load().await;
        let mut s3_builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if config.force_path_style {
            s3_builder = s3_builder.force_path_style(true);
        }
        Ok(Self {
            client: Client::from_conf(s3_builder.build()),
            bucket: config.bucket.trim().to_string(),
            prefix,
        })
    }

    /// Applies the configured prefix to a document name.
    fn prefixed_key(&self, name: &str) -> String {
        if self.prefix.is_empty() { name.to_string() } else { format!("{}{}", self.prefix, name) }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list(&self) -> Result<Vec<ObjectEntry>, ObjectStoreError> {
        let mut entries = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let mut request = self.client.list_objects_v2().bucket(&self.bucket);
            if !self.prefix.is_empty() {
                request = request.prefix(&self.prefix);
            }
            let output = request
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|err| ObjectStoreError::Backend(err.to_string()))?;
            for object in output.contents() {
                let Some(key) = object.key() else {
                    continue;
                };
                let Some(name) = document_name(&self.prefix, key) else {
                    continue;
                };
                let last_modified = object
                    .last_modified()
                    .map(|at| format!("{}.{:09}", at.secs(), at.subsec_nanos()))
                    .unwrap_or_default();
                entries.push(ObjectEntry {
                    name,
                    last_modified,
                });
            }
            match output.next_continuation_token() {
                Some(token) if output.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }
        debug!(bucket = %self.bucket, prefix = %self.prefix, count = entries.len(), "listed site documents");
        Ok(entries)
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let key = self.prefixed_key(name);
        let max_bytes = MAX_DOCUMENT_BYTES;
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key.clone())
            .send()
            .await
            .map_err(|err| ObjectStoreError::Backend(err.to_string()))?;
        if let Some(length) = output.content_length() {
            let actual_bytes = usize::try_from(length).unwrap_or(usize::MAX);
            if actual_bytes > max_bytes {
                return Err(ObjectStoreError::TooLarge {
                    path: key,
                    max_bytes,
                    actual_bytes,
                });
            }
        }
        let mut reader = output.body.into_async_read();
        let mut buffer = Vec::new();
        let mut total_bytes = 0usize;
        let mut chunk = [0u8; 8192];
        loop {
            let read =
                reader.read(&mut chunk).await.map_err(|err| ObjectStoreError::Io(err.to_string()))?;
            if read == 0 {
                break;
            }
            total_bytes = total_bytes
                .checked_add(read)
                .ok_or_else(|| ObjectStoreError::Io("object size overflow".to_string()))?;
            if total_bytes > max_bytes {
                return Err(ObjectStoreError::TooLarge {
                    path: key,
                    max_bytes,
                    actual_bytes: total_bytes,
                });
            }
            buffer.extend_from_slice(&chunk[.. read]);
        }
        Ok(buffer)
    }
}

// ============================================================================
// SECTION: Key Helpers
// ============================================================================

/// Normalizes a configured prefix to empty or `"segment/.../"`.
fn normalize_prefix(raw: &str) -> Result<String, ObjectStoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    if trimmed.starts_with('/') {
        return Err(ObjectStoreError::Invalid(
            "prefix must be relative (no leading slash)".to_string(),
        ));
    }
    let normalized = trimmed.strip_suffix('/').unwrap_or(trimmed);
    if normalized.contains('\\') || normalized.split('/').any(|part| part.is_empty() || part == "..")
    {
        return Err(ObjectStoreError::Invalid(format!("invalid prefix: {raw}")));
    }
    Ok(format!("{normalized}/"))
}

/// Returns the document name of a listed key, skipping non-documents.
fn document_name(prefix: &str, key: &str) -> Option<String> {
    let name = key.strip_prefix(prefix)?;
    if name.is_empty() || name.ends_with('/') || !name.ends_with(".json") {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

    use super::document_name;
    use super::normalize_prefix;

    #[test]
    fn prefixes_are_normalized_to_trailing_slash() {
        assert_eq!(normalize_prefix("").unwrap(), "");
        assert_eq!(normalize_prefix("cloud-info").unwrap(), "cloud-info/");
        assert_eq!(normalize_prefix(" cloud-info/sites/ ").unwrap(), "cloud-info/sites/");
    }

    #[test]
    fn absolute_and_traversing_prefixes_are_rejected() {
        assert!(normalize_prefix("/cloud-info").is_err());
        assert!(normalize_prefix("cloud-info/../other").is_err());
        assert!(normalize_prefix("a//b").is_err());
    }

    #[test]
    fn only_json_documents_under_the_prefix_are_listed() {
        assert_eq!(document_name("info/", "info/BIFI.json").as_deref(), Some("BIFI.json"));
        assert_eq!(document_name("", "nested/IFCA.json").as_deref(), Some("nested/IFCA.json"));
        assert_eq!(document_name("info/", "info/README.md"), None);
        assert_eq!(document_name("info/", "info/dir/"), None);
        assert_eq!(document_name("info/", "other/BIFI.json"), None);
    }
}
