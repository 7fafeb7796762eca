// crates/fedcloud-info-core/src/lib.rs
// ============================================================================
// Module: FedCloud Info Core Library
// Description: Site model, document normalization, and registry snapshots.
// Purpose: Turn published site documents into a query-ready in-memory model.
// Dependencies: async-trait, serde, serde_json, time, tracing, url
// ============================================================================

//! ## Overview
//! `fedcloud-info-core` owns the typed model for federated cloud sites and
//! virtual organizations, the canonical shape of the published site documents,
//! and the [`Normalizer`] that resolves a document into a [`Site`].
//! Registry backends publish immutable [`SiteSnapshot`] values that HTTP
//! handlers read once per request.
//!
//! Invariants:
//! - `Site::supports_vo(v)` holds iff some share of the site has `vo == v`.
//! - Snapshots are replaced wholesale; no site is mutated in place.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod freshness;
pub mod glue;
pub mod interfaces;
pub mod lenient;
pub mod model;
pub mod normalize;
pub mod snapshot;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use freshness::check_freshness;
pub use freshness::parse_creation_time;
pub use glue::GlueDocument;
pub use glue::ImageRecord;
pub use glue::OneOrMany;
pub use interfaces::Enrichment;
pub use interfaces::HostnameResolver;
pub use interfaces::ImageEnricher;
pub use interfaces::NoEnrichment;
pub use interfaces::NoHostnames;
pub use model::Accelerator;
pub use model::Image;
pub use model::InstanceType;
pub use model::Project;
pub use model::Share;
pub use model::Site;
pub use model::SiteSummary;
pub use model::Vo;
pub use normalize::DEFAULT_CATALOG_DOMAINS;
pub use normalize::EXTERNAL_ID_KEY;
pub use normalize::MAX_DOCUMENT_BYTES;
pub use normalize::NormalizeError;
pub use normalize::Normalizer;
pub use normalize::NormalizerOptions;
pub use normalize::clean_image_name;
pub use normalize::uri_in_domains;
pub use snapshot::SiteSnapshot;
