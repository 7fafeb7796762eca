// crates/fedcloud-info-core/src/interfaces/mod.rs
// ============================================================================
// Module: Normalization Interfaces
// Description: Backend-agnostic seams for image enrichment and host lookup.
// Purpose: Let the normalizer consult external catalogs without knowing them.
// Dependencies: async-trait
// ============================================================================

//! ## Overview
//! The normalizer depends on two collaborators: an [`ImageEnricher`] that maps
//! a document image record to catalog metadata, and a [`HostnameResolver`]
//! that maps a site's external identifier to its endpoint hostname. Both are
//! infallible by contract: implementations log their own failures and answer
//! with empty values so a single catalog outage never drops a site.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;

use crate::glue::ImageRecord;

// ============================================================================
// SECTION: Image Enrichment
// ============================================================================

/// Catalog metadata for one image; empty strings mean "unknown".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    /// Catalog identifier.
    pub catalog_id: String,
    /// Catalog display name.
    pub name: String,
    /// Catalog image version.
    pub version: String,
}

impl Enrichment {
    /// Returns true when no field carries a value.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.catalog_id.is_empty() && self.name.is_empty() && self.version.is_empty()
    }
}

/// Maps image records to catalog metadata.
#[async_trait]
pub trait ImageEnricher: Send + Sync {
    /// Returns the catalog metadata for `image`, or an empty [`Enrichment`].
    async fn enrich(&self, image: &ImageRecord) -> Enrichment;
}

/// Enricher that never recognizes an image.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEnrichment;

#[async_trait]
impl ImageEnricher for NoEnrichment {
    async fn enrich(&self, _image: &ImageRecord) -> Enrichment {
        Enrichment::default()
    }
}

// ============================================================================
// SECTION: Hostname Resolution
// ============================================================================

/// Maps a site's external identifier to the hostname of its compute endpoint.
#[async_trait]
pub trait HostnameResolver: Send + Sync {
    /// Returns the hostname, or an empty string when unknown.
    async fn hostname_for(&self, external_id: &str) -> String;
}

/// Resolver that knows no hostnames.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHostnames;

#[async_trait]
impl HostnameResolver for NoHostnames {
    async fn hostname_for(&self, _external_id: &str) -> String {
        String::new()
    }
}
