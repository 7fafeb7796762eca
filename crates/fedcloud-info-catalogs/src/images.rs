// crates/fedcloud-info-catalogs/src/images.rs
// ============================================================================
// Module: Image Enrichment Strategies
// Description: Static table, remote catalog, and embedded-metadata enrichers.
// Purpose: Map image records to catalog identifiers, names, and versions.
// Dependencies: async-trait, serde, serde_json, tokio, tracing, url
// ============================================================================

//! ## Overview
//! One strategy is selected per deployment:
//! - [`StaticTableEnricher`] reads a marketplace URI keyed table once.
//! - [`RemoteCatalogEnricher`] fetches the same table from a URL on first use,
//!   memoizes it, and retries with the record's base marketplace URI when the
//!   primary URI has no entry. After a failed fetch it answers empty
//!   enrichments without fetching again until the retry delay has elapsed.
//! - [`EmbeddedMetadataEnricher`] reads the image reference and tag the site
//!   publishes in `OtherInfo` for images hosted in a known OCI registry
//!   (`registry.egi.eu` by default); other images get no enrichment.
//!
//! The table format maps a marketplace URI to
//! `{"imageVAppCName", "imageVAppName", "version"}`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use fedcloud_info_core::Enrichment;
use fedcloud_info_core::ImageEnricher;
use fedcloud_info_core::ImageRecord;
use fedcloud_info_core::lenient;
use fedcloud_info_core::uri_in_domains;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::error;
use tracing::info;
use url::Url;

use crate::error::CatalogError;
use crate::http::HttpFetcher;
use crate::http::MAX_PAYLOAD_BYTES;
use crate::http::parse_url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `OtherInfo` key carrying the base marketplace URI of an image.
pub const BASE_MARKETPLACE_URI_KEY: &str = "base_mpuri";
/// `OtherInfo` key carrying the registry image reference.
pub const EMBEDDED_IMAGE_REF_KEY: &str = "eu.egi.cloud.image_ref";
/// `OtherInfo` key carrying the registry image tag.
pub const EMBEDDED_TAG_KEY: &str = "eu.egi.cloud.tag";
/// Registries whose images carry embedded catalog metadata by default.
pub const DEFAULT_EMBEDDED_REGISTRIES: &[&str] = &["registry.egi.eu"];
/// Delay before a failed remote catalog fetch is attempted again.
pub const DEFAULT_CATALOG_RETRY_DELAY: Duration = Duration::from_secs(300);

// ============================================================================
// SECTION: Table Format
// ============================================================================

/// One catalog table entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogEntry {
    /// Catalog identifier.
    #[serde(rename = "imageVAppCName", default)]
    pub catalog_id: String,
    /// Catalog display name.
    #[serde(rename = "imageVAppName", default)]
    pub name: String,
    /// Image version.
    #[serde(default, deserialize_with = "lenient::string_from_scalar")]
    pub version: String,
}

impl From<CatalogEntry> for Enrichment {
    fn from(entry: CatalogEntry) -> Self {
        Self {
            catalog_id: entry.catalog_id,
            name: entry.name,
            version: entry.version,
        }
    }
}

/// Parses a marketplace URI keyed catalog table.
///
/// # Errors
///
/// Returns [`CatalogError::Decode`] when the bytes are not a table.
pub fn parse_image_table(bytes: &[u8]) -> Result<HashMap<String, Enrichment>, CatalogError> {
    let table: HashMap<String, CatalogEntry> =
        serde_json::from_slice(bytes).map_err(|err| CatalogError::Decode(err.to_string()))?;
    Ok(table.into_iter().map(|(uri, entry)| (uri, Enrichment::from(entry))).collect())
}

/// Looks up the primary URI, then the base marketplace URI.
fn lookup(table: &HashMap<String, Enrichment>, image: &ImageRecord) -> Enrichment {
    image
        .marketplace_url
        .as_deref()
        .and_then(|uri| table.get(uri))
        .or_else(|| image.other_info_str(BASE_MARKETPLACE_URI_KEY).and_then(|uri| table.get(uri)))
        .cloned()
        .unwrap_or_default()
}

// ============================================================================
// SECTION: Static Table
// ============================================================================

/// Enricher backed by a local table loaded once.
#[derive(Debug, Clone, Default)]
pub struct StaticTableEnricher {
    /// Marketplace URI to enrichment.
    table: HashMap<String, Enrichment>,
}

impl StaticTableEnricher {
    /// Loads the table at `path`; a missing or invalid file yields an empty
    /// table and an error event.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match read_table(path) {
            Ok(table) => {
                info!(path = %path.display(), entries = table.len(), "loaded image table");
                Self {
                    table,
                }
            }
            Err(err) => {
                error!(path = %path.display(), error = %err, "unable to load image table");
                Self::default()
            }
        }
    }

    /// Creates an enricher from an in-memory table.
    #[must_use]
    pub const fn from_table(table: HashMap<String, Enrichment>) -> Self {
        Self {
            table,
        }
    }

    /// Returns the number of table entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns true when the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Reads and parses a table file within the payload limit.
fn read_table(path: &Path) -> Result<HashMap<String, Enrichment>, CatalogError> {
    let bytes = fs::read(path).map_err(|err| CatalogError::Io(err.to_string()))?;
    if bytes.len() > MAX_PAYLOAD_BYTES {
        return Err(CatalogError::Io(format!(
            "table of {} bytes exceeds limit of {MAX_PAYLOAD_BYTES}",
            bytes.len()
        )));
    }
    parse_image_table(&bytes)
}

#[async_trait]
impl ImageEnricher for StaticTableEnricher {
    async fn enrich(&self, image: &ImageRecord) -> Enrichment {
        image
            .marketplace_url
            .as_deref()
            .and_then(|uri| self.table.get(uri))
            .cloned()
            .unwrap_or_default()
    }
}

// ============================================================================
// SECTION: Remote Catalog
// ============================================================================

/// Enricher backed by a remote table fetched once per process.
#[derive(Debug)]
pub struct RemoteCatalogEnricher {
    /// Shared HTTP client.
    fetcher: HttpFetcher,
    /// Catalog table URL.
    url: Url,
    /// Memoized table; only successful fetches are stored.
    table: OnceCell<HashMap<String, Enrichment>>,
    /// Time of the last failed fetch; held while a fetch is in flight.
    last_failure: Mutex<Option<Instant>>,
    /// Delay before fetching again after a failure.
    retry_delay: Duration,
}

impl RemoteCatalogEnricher {
    /// Creates an enricher reading the table at `catalog_url`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Http`] when the URL is invalid.
    pub fn new(fetcher: HttpFetcher, catalog_url: &str) -> Result<Self, CatalogError> {
        Ok(Self {
            fetcher,
            url: parse_url(catalog_url)?,
            table: OnceCell::new(),
            last_failure: Mutex::new(None),
            retry_delay: DEFAULT_CATALOG_RETRY_DELAY,
        })
    }

    /// Overrides the delay before a failed fetch is retried.
    #[must_use]
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Returns the table, fetching it unless a recent fetch failed.
    async fn table(&self) -> Option<&HashMap<String, Enrichment>> {
        if let Some(table) = self.table.get() {
            return Some(table);
        }
        let mut last_failure = self.last_failure.lock().await;
        if let Some(table) = self.table.get() {
            return Some(table);
        }
        if last_failure.is_some_and(|failed_at| failed_at.elapsed() < self.retry_delay) {
            return None;
        }
        match self.fetch().await {
            Ok(table) => {
                *last_failure = None;
                Some(self.table.get_or_init(|| async { table }).await)
            }
            Err(err) => {
                error!(url = %self.url, error = %err, "unable to load image catalog");
                *last_failure = Some(Instant::now());
                None
            }
        }
    }

    /// Fetches the remote table.
    async fn fetch(&self) -> Result<HashMap<String, Enrichment>, CatalogError> {
        let bytes = self.fetcher.get_bytes(&self.url, &[("accept", "application/json")]).await?;
        let table = parse_image_table(&bytes)?;
        info!(url = %self.url, entries = table.len(), "loaded image catalog");
        Ok(table)
    }
}

#[async_trait]
impl ImageEnricher for RemoteCatalogEnricher {
    async fn enrich(&self, image: &ImageRecord) -> Enrichment {
        self.table().await.map(|table| lookup(table, image)).unwrap_or_default()
    }
}

// ============================================================================
// SECTION: Embedded Metadata
// ============================================================================

/// Enricher reading registry metadata published inside the image record.
#[derive(Debug, Clone)]
pub struct EmbeddedMetadataEnricher {
    /// Registry domains whose images carry embedded metadata.
    registries: Vec<String>,
}

impl EmbeddedMetadataEnricher {
    /// Creates an enricher for images hosted under `registries`.
    #[must_use]
    pub const fn new(registries: Vec<String>) -> Self {
        Self {
            registries,
        }
    }
}

impl Default for EmbeddedMetadataEnricher {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDED_REGISTRIES.iter().map(ToString::to_string).collect())
    }
}

#[async_trait]
impl ImageEnricher for EmbeddedMetadataEnricher {
    async fn enrich(&self, image: &ImageRecord) -> Enrichment {
        let Some(uri) = image.marketplace_url.as_deref() else {
            return Enrichment::default();
        };
        if !uri_in_domains(uri, &self.registries) {
            return Enrichment::default();
        }
        let catalog_id = image
            .other_info_str(EMBEDDED_IMAGE_REF_KEY)
            .unwrap_or(uri)
            .to_string();
        Enrichment {
            catalog_id,
            name: String::new(),
            version: image.other_info_str(EMBEDDED_TAG_KEY).unwrap_or_default().to_string(),
        }
    }
}
