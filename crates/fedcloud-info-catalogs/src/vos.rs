// crates/fedcloud-info-catalogs/src/vos.rs
// ============================================================================
// Module: VO Catalog
// Description: Operations-portal client and the periodically refreshed VO list.
// Purpose: Answer "which virtual organizations exist" without blocking reads.
// Dependencies: arc-swap, async-trait, serde, tokio, tracing, url
// ============================================================================

//! ## Overview
//! [`VoCatalog`] keeps the current VO list behind an [`ArcSwap`]. Reads load
//! the list once; the first read on an empty list triggers a fetch. A failed
//! fetch publishes an empty list rather than keeping the previous one.
//! [`VoCatalog::run`] refreshes forever on a fixed interval.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use fedcloud_info_core::Vo;
use serde::Deserialize;
use tracing::debug;
use tracing::error;
use tracing::info;
use url::Url;

use crate::error::CatalogError;
use crate::http::HttpFetcher;
use crate::http::parse_url;

// ============================================================================
// SECTION: Fetcher Interface
// ============================================================================

/// Source of the VO list.
#[async_trait]
pub trait VoFetcher: Send + Sync {
    /// Fetches the complete VO list.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the list cannot be fetched or decoded.
    async fn fetch_vos(&self) -> Result<Vec<Vo>, CatalogError>;
}

// ============================================================================
// SECTION: Operations Portal
// ============================================================================

/// Operations portal response envelope.
#[derive(Debug, Deserialize)]
struct PortalResponse {
    /// VO entries; extra fields are ignored.
    data: Vec<Vo>,
}

/// Parses an operations portal VO list payload.
///
/// # Errors
///
/// Returns [`CatalogError::Decode`] when the payload is malformed.
pub fn parse_vo_list(bytes: &[u8]) -> Result<Vec<Vo>, CatalogError> {
    let response: PortalResponse =
        serde_json::from_slice(bytes).map_err(|err| CatalogError::Decode(err.to_string()))?;
    Ok(response.data)
}

/// Operations portal VO list client.
#[derive(Debug, Clone)]
pub struct OpsPortalClient {
    /// Shared HTTP client.
    fetcher: HttpFetcher,
    /// VO list URL.
    url: Url,
    /// API token sent as `X-API-Key`.
    token: String,
}

impl OpsPortalClient {
    /// Creates a client for the VO list at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Http`] when the URL is invalid.
    pub fn new(fetcher: HttpFetcher, url: &str, token: Option<&str>) -> Result<Self, CatalogError> {
        Ok(Self {
            fetcher,
            url: parse_url(url)?,
            token: token.unwrap_or_default().to_string(),
        })
    }
}

#[async_trait]
impl VoFetcher for OpsPortalClient {
    async fn fetch_vos(&self) -> Result<Vec<Vo>, CatalogError> {
        let headers = [("accept", "application/json"), ("X-API-Key", self.token.as_str())];
        let bytes = self.fetcher.get_bytes(&self.url, &headers).await?;
        parse_vo_list(&bytes)
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Refreshing VO list.
pub struct VoCatalog {
    /// List source; `None` keeps the catalog permanently empty.
    fetcher: Option<Arc<dyn VoFetcher>>,
    /// Current list.
    vos: ArcSwap<Vec<Vo>>,
    /// Delay between periodic refreshes.
    interval: Duration,
}

impl VoCatalog {
    /// Creates a catalog refreshing from `fetcher` every `interval`.
    #[must_use]
    pub fn new(fetcher: Arc<dyn VoFetcher>, interval: Duration) -> Self {
        Self {
            fetcher: Some(fetcher),
            vos: ArcSwap::from_pointee(Vec::new()),
            interval,
        }
    }

    /// Creates a catalog without a source; every read answers an empty list.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            fetcher: None,
            vos: ArcSwap::from_pointee(Vec::new()),
            interval: Duration::MAX,
        }
    }

    /// Returns the current list, fetching first when it is empty.
    pub async fn all_vos(&self) -> Arc<Vec<Vo>> {
        let current = self.vos.load_full();
        if current.is_empty() { self.refresh().await } else { current }
    }

    /// Fetches and publishes a new list; failures publish an empty list.
    pub async fn refresh(&self) -> Arc<Vec<Vo>> {
        let Some(fetcher) = &self.fetcher else {
            debug!("vo catalog has no source");
            return self.vos.load_full();
        };
        let vos = match fetcher.fetch_vos().await {
            Ok(vos) => {
                info!(count = vos.len(), "loaded vos");
                vos
            }
            Err(err) => {
                error!(error = %err, "unable to load vos");
                Vec::new()
            }
        };
        let vos = Arc::new(vos);
        self.vos.store(Arc::clone(&vos));
        vos
    }

    /// Refreshes forever, sleeping `interval` between passes.
    pub async fn run(self: Arc<Self>) {
        if self.fetcher.is_none() {
            return;
        }
        loop {
            self.refresh().await;
            tokio::time::sleep(self.interval).await;
        }
    }
}
