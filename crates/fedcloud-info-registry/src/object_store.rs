// crates/fedcloud-info-registry/src/object_store.rs
// ============================================================================
// Module: Object Store Interface
// Description: Listing and fetching of published site documents.
// Purpose: Give the poll registry one seam over HTTP and S3 backends.
// Dependencies: async-trait, fedcloud-info-catalogs, serde, url
// ============================================================================

//! ## Overview
//! An [`ObjectStore`] lists the documents it holds together with an opaque
//! last-modified token and fetches a document by name. The poll registry
//! compares tokens to skip unchanged documents; an empty token never matches.
//!
//! [`HttpListingStore`] reads a JSON listing `[{"name", "last_modified"}]`
//! from a base URL and fetches documents at `base/name`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use fedcloud_info_catalogs::HttpFetcher;
use fedcloud_info_catalogs::MAX_PAYLOAD_BYTES;
use fedcloud_info_core::lenient;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Object store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectStoreError {
    /// Invalid store configuration or object name.
    #[error("object store invalid: {0}")]
    Invalid(String),
    /// Local read failure.
    #[error("object store io error: {0}")]
    Io(String),
    /// Remote backend failure.
    #[error("object store backend error: {0}")]
    Backend(String),
    /// Object exceeds the size limit.
    #[error("object {path} exceeds size limit ({actual_bytes} > {max_bytes})")]
    TooLarge {
        /// Object key.
        path: String,
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Observed bytes.
        actual_bytes: usize,
    },
}

// ============================================================================
// SECTION: Interface
// ============================================================================

/// One listed document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObjectEntry {
    /// Document name relative to the store root.
    pub name: String,
    /// Opaque modification token; empty when the store publishes none.
    #[serde(default, deserialize_with = "lenient::string_from_scalar")]
    pub last_modified: String,
}

/// Backend holding published site documents.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lists every document currently held.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when the listing cannot be produced.
    async fn list(&self) -> Result<Vec<ObjectEntry>, ObjectStoreError>;

    /// Fetches the bytes of the document `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when the document cannot be read.
    async fn fetch(&self, name: &str) -> Result<Vec<u8>, ObjectStoreError>;
}

// ============================================================================
// SECTION: HTTP Listing Store
// ============================================================================

/// Store served over plain HTTP with a JSON listing at its root.
#[derive(Debug, Clone)]
pub struct HttpListingStore {
    /// Shared HTTP client.
    fetcher: HttpFetcher,
    /// Listing URL and document base.
    base: Url,
}

impl HttpListingStore {
    /// Creates a store rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::Invalid`] when the URL is invalid or cannot
    /// carry document paths.
    pub fn new(fetcher: HttpFetcher, base_url: &str) -> Result<Self, ObjectStoreError> {
        let base = fedcloud_info_catalogs::http::parse_url(base_url)
            .map_err(|err| ObjectStoreError::Invalid(err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ObjectStoreError::Invalid(format!("url cannot carry paths: {base_url}")));
        }
        Ok(Self {
            fetcher,
            base,
        })
    }

    /// Returns the URL of the document `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::Invalid`] for empty names or names that
    /// step outside the store root.
    pub fn document_url(&self, name: &str) -> Result<Url, ObjectStoreError> {
        let segments: Vec<&str> = name.split('/').filter(|segment| !segment.is_empty()).collect();
        if segments.is_empty() || segments.iter().any(|segment| *segment == "." || *segment == "..")
        {
            return Err(ObjectStoreError::Invalid(format!("invalid object name: {name}")));
        }
        let mut url = self.base.clone();
        url.set_query(None);
        url.path_segments_mut()
            .map_err(|()| ObjectStoreError::Invalid(format!("url cannot carry paths: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl ObjectStore for HttpListingStore {
    async fn list(&self) -> Result<Vec<ObjectEntry>, ObjectStoreError> {
        self.fetcher
            .get_json(&self.base, &[("accept", "application/json")])
            .await
            .map_err(|err| ObjectStoreError::Backend(err.to_string()))
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let url = self.document_url(name)?;
        let bytes = self
            .fetcher
            .get_bytes(&url, &[("accept", "application/json")])
            .await
            .map_err(|err| ObjectStoreError::Backend(err.to_string()))?;
        if bytes.len() > MAX_PAYLOAD_BYTES {
            return Err(ObjectStoreError::TooLarge {
                path: name.to_string(),
                max_bytes: MAX_PAYLOAD_BYTES,
                actual_bytes: bytes.len(),
            });
        }
        Ok(bytes)
    }
}
