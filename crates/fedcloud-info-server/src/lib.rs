// crates/fedcloud-info-server/src/lib.rs
// ============================================================================
// Module: FedCloud Info Server Library
// Description: HTTP API over the site registry and VO catalog.
// Purpose: Wire configuration into running services and serve queries.
// Dependencies: axum, fedcloud-info-registry, tracing-subscriber
// ============================================================================

//! ## Overview
//! [`AppContext`] is the single value handlers read from: the site registry
//! and the VO catalog, constructed once at process start. [`Server`] builds
//! the context from configuration, spawns the background refresh tasks, and
//! serves [`api::router`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod api;
pub mod context;
pub mod error;
pub mod server;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use api::ApiError;
pub use api::router;
pub use context::AppContext;
pub use context::build_normalizer;
pub use error::ServerError;
pub use server::Server;
pub use telemetry::init_logging;
