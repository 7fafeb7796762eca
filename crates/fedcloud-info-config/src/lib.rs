// crates/fedcloud-info-config/src/lib.rs
// ============================================================================
// Module: FedCloud Info Config Library
// Description: Configuration model and loader for the site info service.
// Purpose: Resolve, parse, and validate the service TOML configuration.
// Dependencies: fedcloud-info-core, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! `fedcloud-info-config` owns [`FedCloudInfoConfig`], the single TOML
//! document that selects the site registry backend, the image enrichment
//! strategy, and the external catalog endpoints. Loading is fail-closed:
//! unknown keys, oversized files, and incomplete backend sections are
//! rejected before any task starts.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::CONFIG_ENV_VAR;
pub use config::ConfigError;
pub use config::DEFAULT_CONFIG_NAME;
pub use config::DirectorySitesConfig;
pub use config::FedCloudInfoConfig;
pub use config::HttpConfig;
pub use config::ImageStrategy;
pub use config::ImagesConfig;
pub use config::LogFormat;
pub use config::LoggingConfig;
pub use config::NormalizerConfig;
pub use config::PollProvider;
pub use config::PollSitesConfig;
pub use config::ServerConfig;
pub use config::SitesBackend;
pub use config::SitesConfig;
pub use config::TopologyConfig;
pub use config::VO_TOKEN_ENV_VAR;
pub use config::VosConfig;
