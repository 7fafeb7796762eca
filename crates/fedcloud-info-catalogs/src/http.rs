// crates/fedcloud-info-catalogs/src/http.rs
// ============================================================================
// Module: Catalog HTTP Fetcher
// Description: Bounded single-shot HTTP GET for catalog payloads.
// Purpose: Share one client, timeout, and size cap across catalog clients.
// Dependencies: reqwest, serde_json, url
// ============================================================================

//! ## Overview
//! [`HttpFetcher`] issues one GET per call with no retries.
//! Invariants:
//! - Non-success status codes fail closed.
//! - Payload bytes are capped at [`MAX_PAYLOAD_BYTES`], checked against the
//!   declared length first and the streamed length second.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use fedcloud_info_core::MAX_DOCUMENT_BYTES;
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::CatalogError;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum accepted payload size for catalog responses.
pub const MAX_PAYLOAD_BYTES: usize = MAX_DOCUMENT_BYTES;

// ============================================================================
// SECTION: Fetcher
// ============================================================================

/// Shared HTTP client for catalog requests.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    /// Underlying client carrying timeout and user agent.
    client: Client,
}

impl HttpFetcher {
    /// Builds a fetcher with the given timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Http`] when the client cannot be constructed.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|err| CatalogError::Http(err.to_string()))?;
        Ok(Self {
            client,
        })
    }

    /// Creates a fetcher over a preconfigured client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self {
            client,
        }
    }

    /// Fetches the body of `url`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Http`] on transport failure or oversized
    /// payloads and [`CatalogError::Status`] on non-success responses.
    pub async fn get_bytes(
        &self,
        url: &Url,
        headers: &[(&str, &str)],
    ) -> Result<Vec<u8>, CatalogError> {
        let mut request = self.client.get(url.clone());
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let mut response =
            request.send().await.map_err(|err| CatalogError::Http(format!("{url}: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(format!("{url}: http status {status}")));
        }
        let max_bytes = u64::try_from(MAX_PAYLOAD_BYTES)
            .map_err(|_| CatalogError::Http("payload limit overflow".to_string()))?;
        if let Some(length) = response.content_length()
            && length > max_bytes
        {
            return Err(CatalogError::Http(format!(
                "{url}: payload of {length} bytes exceeds limit of {MAX_PAYLOAD_BYTES}"
            )));
        }
        let mut bytes = Vec::new();
        while let Some(chunk) =
            response.chunk().await.map_err(|err| CatalogError::Http(format!("{url}: {err}")))?
        {
            if bytes.len().saturating_add(chunk.len()) > MAX_PAYLOAD_BYTES {
                return Err(CatalogError::Http(format!(
                    "{url}: payload exceeds limit of {MAX_PAYLOAD_BYTES} bytes"
                )));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }

    /// Fetches and decodes a JSON body.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`HttpFetcher::get_bytes`] and
    /// [`CatalogError::Decode`] when the body is not the expected JSON.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        headers: &[(&str, &str)],
    ) -> Result<T, CatalogError> {
        let bytes = self.get_bytes(url, headers).await?;
        serde_json::from_slice(&bytes).map_err(|err| CatalogError::Decode(format!("{url}: {err}")))
    }
}

/// Parses a configured URL.
///
/// # Errors
///
/// Returns [`CatalogError::Http`] when the URL is invalid.
pub fn parse_url(raw: &str) -> Result<Url, CatalogError> {
    Url::parse(raw.trim()).map_err(|err| CatalogError::Http(format!("invalid url {raw}: {err}")))
}
