// crates/fedcloud-info-catalogs/src/lib.rs
// ============================================================================
// Module: FedCloud Info Catalogs Library
// Description: Clients for the topology registry, image catalogs, and VO portal.
// Purpose: Supply enrichment, hostname, and VO data to the service.
// Dependencies: arc-swap, async-trait, fedcloud-info-core, quick-xml, reqwest
// ============================================================================

//! ## Overview
//! Each external catalog is reached through one bounded HTTP GET per refresh
//! with no retries. Failures are logged and degrade to empty answers so the
//! normalizer and the HTTP API keep serving what they have:
//! - [`GocdbResolver`] memoizes one bulk topology query.
//! - The image enrichers implement one strategy each behind
//!   [`fedcloud_info_core::ImageEnricher`].
//! - [`VoCatalog`] holds the VO list and refreshes it on a timer.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod error;
pub mod http;
pub mod images;
pub mod topology;
pub mod vos;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::CatalogError;
pub use http::HttpFetcher;
pub use http::MAX_PAYLOAD_BYTES;
pub use images::BASE_MARKETPLACE_URI_KEY;
pub use images::CatalogEntry;
pub use images::DEFAULT_CATALOG_RETRY_DELAY;
pub use images::DEFAULT_EMBEDDED_REGISTRIES;
pub use images::EMBEDDED_IMAGE_REF_KEY;
pub use images::EMBEDDED_TAG_KEY;
pub use images::EmbeddedMetadataEnricher;
pub use images::RemoteCatalogEnricher;
pub use images::StaticTableEnricher;
pub use images::parse_image_table;
pub use topology::GocdbResolver;
pub use topology::parse_service_endpoints;
pub use vos::OpsPortalClient;
pub use vos::VoCatalog;
pub use vos::VoFetcher;
pub use vos::parse_vo_list;
