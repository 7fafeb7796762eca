// crates/fedcloud-info-server/src/error.rs
// ============================================================================
// Module: Server Errors
// Description: Startup and transport failures.
// Purpose: Report why the service could not start or stopped serving.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Startup and transport failures reported by [`ServerError`].

use thiserror::Error;

/// Server lifecycle errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}
