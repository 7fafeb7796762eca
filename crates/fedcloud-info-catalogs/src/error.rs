// crates/fedcloud-info-catalogs/src/error.rs
// ============================================================================
// Module: Catalog Errors
// Description: Error type shared by the external catalog clients.
// Purpose: Classify remote fetch failures for logging.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`CatalogError`] is never surfaced to API consumers; callers log it and
//! fall back to an empty result.

use thiserror::Error;

/// Remote catalog failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Transport failure, invalid URL, or oversized payload.
    #[error("catalog http error: {0}")]
    Http(String),
    /// Non-success HTTP status.
    #[error("catalog status error: {0}")]
    Status(String),
    /// Payload could not be decoded.
    #[error("catalog decode error: {0}")]
    Decode(String),
    /// Local file could not be read.
    #[error("catalog io error: {0}")]
    Io(String),
}
