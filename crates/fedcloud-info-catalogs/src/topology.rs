// crates/fedcloud-info-catalogs/src/topology.rs
// ============================================================================
// Module: Topology Resolver
// Description: GOCDB-backed external id to hostname lookup.
// Purpose: Attach the compute endpoint hostname to each normalized site.
// Dependencies: async-trait, quick-xml, serde, tokio, tracing, url
// ============================================================================

//! ## Overview
//! [`GocdbResolver`] issues one bulk `get_service` query on first use and
//! keeps the resulting id to hostname map for the lifetime of the process.
//! A failed query is logged and memoized as an empty map, so every later
//! lookup answers "" until restart.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;

use async_trait::async_trait;
use fedcloud_info_core::HostnameResolver;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::error;
use tracing::info;
use url::Url;

use crate::error::CatalogError;
use crate::http::HttpFetcher;
use crate::http::parse_url;

// ============================================================================
// SECTION: Wire Format
// ============================================================================

/// `<results>` root of a GOCDB public API response.
#[derive(Debug, Default, Deserialize)]
struct GocdbResults {
    /// Endpoint records; a single record decodes as a one-element list.
    #[serde(rename = "SERVICE_ENDPOINT", default)]
    endpoints: Vec<GocdbServiceEndpoint>,
}

/// One `<SERVICE_ENDPOINT>` record.
#[derive(Debug, Deserialize)]
struct GocdbServiceEndpoint {
    /// Registry identifier (attribute).
    #[serde(rename = "@PRIMARY_KEY")]
    primary_key: String,
    /// Endpoint hostname.
    #[serde(rename = "HOSTNAME", default)]
    hostname: String,
}

/// Parses a GOCDB `get_service` payload into an id to hostname map.
///
/// # Errors
///
/// Returns [`CatalogError::Decode`] when the payload is not the expected XML.
pub fn parse_service_endpoints(xml: &str) -> Result<HashMap<String, String>, CatalogError> {
    let results: GocdbResults =
        quick_xml::de::from_str(xml.trim()).map_err(|err| CatalogError::Decode(err.to_string()))?;
    Ok(results
        .endpoints
        .into_iter()
        .map(|endpoint| (endpoint.primary_key.trim().to_string(), endpoint.hostname.trim().to_string()))
        .collect())
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Hostname resolver backed by the GOCDB public API.
#[derive(Debug)]
pub struct GocdbResolver {
    /// Shared HTTP client.
    fetcher: HttpFetcher,
    /// Fully built query URL.
    url: Url,
    /// Memoized id to hostname map.
    hostnames: OnceCell<HashMap<String, String>>,
}

impl GocdbResolver {
    /// Creates a resolver querying `service_type` endpoints under `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Http`] when the base URL is invalid.
    pub fn new(
        fetcher: HttpFetcher,
        base_url: &str,
        service_type: &str,
    ) -> Result<Self, CatalogError> {
        let mut base = parse_url(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let mut url = base
            .join("gocdbpi/public/")
            .map_err(|err| CatalogError::Http(format!("invalid url {base_url}: {err}")))?;
        url.query_pairs_mut()
            .append_pair("method", "get_service")
            .append_pair("service_type", service_type);
        Ok(Self {
            fetcher,
            url,
            hostnames: OnceCell::new(),
        })
    }

    /// Returns the bulk query URL.
    #[must_use]
    pub const fn query_url(&self) -> &Url {
        &self.url
    }

    /// Fetches the bulk listing, degrading to an empty map on failure.
    async fn load(&self) -> HashMap<String, String> {
        let result = async {
            let bytes = self.fetcher.get_bytes(&self.url, &[]).await?;
            let text = String::from_utf8(bytes)
                .map_err(|err| CatalogError::Decode(format!("topology payload: {err}")))?;
            parse_service_endpoints(&text)
        }
        .await;
        match result {
            Ok(hostnames) => {
                info!(url = %self.url, endpoints = hostnames.len(), "loaded topology");
                hostnames
            }
            Err(err) => {
                error!(url = %self.url, error = %err, "unable to load topology");
                HashMap::new()
            }
        }
    }
}

#[async_trait]
impl HostnameResolver for GocdbResolver {
    async fn hostname_for(&self, external_id: &str) -> String {
        self.hostnames
            .get_or_init(|| self.load())
            .await
            .get(external_id)
            .cloned()
            .unwrap_or_default()
    }
}
