// crates/fedcloud-info-registry/src/lib.rs
// ============================================================================
// Module: FedCloud Info Registry Library
// Description: Continuously refreshed site registries.
// Purpose: Keep the published site snapshot in sync with document sources.
// Dependencies: arc-swap, aws-sdk-s3, notify, tokio, walkdir
// ============================================================================

//! ## Overview
//! A [`SiteRegistry`] owns the current [`fedcloud_info_core::SiteSnapshot`]
//! and a background task that rebuilds it:
//! - [`DirectoryRegistry`] scans a directory tree of documents and reacts to
//!   filesystem change notifications.
//! - [`PollRegistry`] re-lists an [`ObjectStore`] on a fixed interval and
//!   reuses sites whose object has not changed.
//!
//! Both publish through [`SnapshotCell`], a single atomic pointer swap.
//! Readers never observe a partially rebuilt snapshot. A document that fails
//! to load on a pass is absent from that pass's snapshot in both backends.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod directory;
pub mod error;
pub mod object_store;
pub mod poll;
pub mod registry;
pub mod s3;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use directory::DirectoryRegistry;
pub use error::RegistryError;
pub use object_store::HttpListingStore;
pub use object_store::ObjectEntry;
pub use object_store::ObjectStore;
pub use object_store::ObjectStoreError;
pub use poll::DEFAULT_POLL_INTERVAL;
pub use poll::PollRegistry;
pub use registry::SiteRegistry;
pub use registry::SnapshotCell;
pub use registry::StaticRegistry;
pub use s3::S3ObjectStore;
pub use s3::S3StoreConfig;
