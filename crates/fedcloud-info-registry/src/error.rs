// crates/fedcloud-info-registry/src/error.rs
// ============================================================================
// Module: Registry Errors
// Description: Failures of registry background tasks.
// Purpose: Report conditions that stop or skip a whole refresh pass.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Per-document failures are logged and never reach this type; a
//! [`RegistryError`] means a pass (or the task itself) could not proceed.

use thiserror::Error;

/// Registry task errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Filesystem failure outside a single document.
    #[error("registry io error: {0}")]
    Io(String),
    /// Filesystem watcher failure.
    #[error("registry watch error: {0}")]
    Watch(String),
    /// Object store listing failure.
    #[error("registry store error: {0}")]
    Store(String),
}
