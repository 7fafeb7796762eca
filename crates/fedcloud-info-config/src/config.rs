// crates/fedcloud-info-config/src/config.rs
// ============================================================================
// Module: Service Config
// Description: TOML configuration model, loader, and validation.
// Purpose: Select registry backend, enrichment strategy, and catalog URLs.
// Dependencies: fedcloud-info-core, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! The configuration path is resolved from an explicit argument, then the
//! `FEDCLOUD_INFO_CONFIG` environment variable, then `fedcloud-info.toml` in
//! the working directory. Every section has defaults; a deployment only
//! states what differs. Validation rejects combinations a backend cannot run
//! with (a poll backend without a listing source, a static image strategy
//! without a table, and so on).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use fedcloud_info_core::DEFAULT_CATALOG_DOMAINS;
use fedcloud_info_core::NormalizerOptions;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default config filename.
pub const DEFAULT_CONFIG_NAME: &str = "fedcloud-info.toml";
/// Environment variable override for the config path.
pub const CONFIG_ENV_VAR: &str = "FEDCLOUD_INFO_CONFIG";
/// Environment variable supplying the VO portal token.
pub const VO_TOKEN_ENV_VAR: &str = "FEDCLOUD_INFO_VO_TOKEN";
/// Maximum allowed config file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum total path length for config-related paths.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Default HTTP bind address.
const DEFAULT_BIND: &str = "127.0.0.1:8000";
/// Default outbound request timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Default poll interval in seconds.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 600;
/// Default VO refresh interval in seconds.
const DEFAULT_VO_REFRESH_SECS: u64 = 7_200;
/// Default GOCDB service type for compute endpoints.
const DEFAULT_SERVICE_TYPE: &str = "org.openstack.nova";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Config loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error.
    #[error("config io error: {0}")]
    Io(String),
    /// Parse error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration.
    #[error("config invalid: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Service configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FedCloudInfoConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Outbound HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,
    /// Document normalization settings.
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    /// Site registry backend selection.
    #[serde(default)]
    pub sites: SitesConfig,
    /// Image enrichment strategy.
    #[serde(default)]
    pub images: ImagesConfig,
    /// Topology registry settings.
    #[serde(default)]
    pub topology: TopologyConfig,
    /// VO portal settings.
    #[serde(default)]
    pub vos: VosConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FedCloudInfoConfig {
    /// Loads configuration from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        Self::load_file(&resolved)
    }

    /// Loads configuration, falling back to defaults when no path was given
    /// and the default file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an existing file fails to load.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path.is_some() || env::var_os(CONFIG_ENV_VAR).is_some();
        let resolved = resolve_path(path)?;
        if !explicit && !resolved.exists() {
            let mut config = Self::default();
            config.apply_env();
            config.validate()?;
            return Ok(config);
        }
        Self::load_file(&resolved)
    }

    /// Parses and validates configuration text, applying no environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates one config file.
    fn load_file(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        let bytes = fs::read(path)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_vo_token(env::var(VO_TOKEN_ENV_VAR).ok());
    }

    /// Fills the VO token from an override when the file leaves it unset.
    pub fn apply_vo_token(&mut self, token: Option<String>) {
        if self.vos.token.is_none() {
            self.vos.token = token.filter(|value| !value.trim().is_empty());
        }
    }

    /// Validates configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.bind_addr()?;
        if self.http.timeout_ms == 0 {
            return Err(ConfigError::Invalid("http.timeout_ms must be positive".to_string()));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("http.user_agent must not be empty".to_string()));
        }
        if self.normalizer.catalog_domains.iter().any(|domain| domain.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "normalizer.catalog_domains must not contain empty entries".to_string(),
            ));
        }
        self.sites.validate()?;
        self.images.validate()?;
        if let Some(url) = &self.topology.url {
            validate_http_url("topology.url", url)?;
        }
        if self.topology.service_type.trim().is_empty() {
            return Err(ConfigError::Invalid("topology.service_type must not be empty".to_string()));
        }
        if let Some(url) = &self.vos.url {
            validate_http_url("vos.url", url)?;
        }
        if self.vos.refresh_secs == 0 {
            return Err(ConfigError::Invalid("vos.refresh_secs must be positive".to_string()));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.level must not be empty".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Server and HTTP
// ============================================================================

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address (`host:port`).
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl ServerConfig {
    /// Parses the bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid server.bind: {}", self.bind)))
    }
}

/// Outbound HTTP client configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl HttpConfig {
    /// Returns the request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ============================================================================
// SECTION: Normalizer
// ============================================================================

/// Document normalization settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormalizerConfig {
    /// Reject documents past their validity window.
    #[serde(default = "default_true")]
    pub check_validity: bool,
    /// Marketplace hosts recognized as image catalogs.
    #[serde(default = "default_catalog_domains")]
    pub catalog_domains: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            check_validity: true,
            catalog_domains: default_catalog_domains(),
        }
    }
}

impl NormalizerConfig {
    /// Converts to normalizer options.
    #[must_use]
    pub fn options(&self) -> NormalizerOptions {
        NormalizerOptions {
            check_validity: self.check_validity,
            catalog_domains: self.catalog_domains.clone(),
        }
    }
}

// ============================================================================
// SECTION: Sites
// ============================================================================

/// Site registry backend kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SitesBackend {
    /// Watched directory of documents.
    #[default]
    Directory,
    /// Periodically polled object store.
    Poll,
}

/// Site registry configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SitesConfig {
    /// Selected backend.
    #[serde(default)]
    pub backend: SitesBackend,
    /// Directory backend settings.
    #[serde(default)]
    pub directory: DirectorySitesConfig,
    /// Poll backend settings.
    #[serde(default)]
    pub poll: PollSitesConfig,
}

impl SitesConfig {
    /// Validates the selected backend section.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.backend {
            SitesBackend::Directory => {
                if self.directory.path.as_os_str().is_empty() {
                    return Err(ConfigError::Invalid(
                        "sites.directory.path is required".to_string(),
                    ));
                }
                validate_store_path(&self.directory.path)
            }
            SitesBackend::Poll => self.poll.validate(),
        }
    }
}

/// Directory backend settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectorySitesConfig {
    /// Root directory scanned recursively for `*.json` documents.
    #[serde(default = "default_sites_dir")]
    pub path: PathBuf,
}

impl Default for DirectorySitesConfig {
    fn default() -> Self {
        Self {
            path: default_sites_dir(),
        }
    }
}

/// Object store provider for the poll backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollProvider {
    /// HTTP JSON listing with documents at `<url>/<name>`.
    #[default]
    Http,
    /// S3 bucket listing.
    S3,
}

/// Poll backend settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollSitesConfig {
    /// Listing provider.
    #[serde(default)]
    pub provider: PollProvider,
    /// HTTP listing URL.
    #[serde(default)]
    pub url: Option<String>,
    /// S3 bucket name.
    #[serde(default)]
    pub bucket: Option<String>,
    /// Optional S3 key prefix.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Optional S3 region.
    #[serde(default)]
    pub region: Option<String>,
    /// Optional S3-compatible endpoint.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Use path-style S3 addressing.
    #[serde(default)]
    pub force_path_style: bool,
    /// Seconds between polls.
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,
}

impl Default for PollSitesConfig {
    fn default() -> Self {
        Self {
            provider: PollProvider::Http,
            url: None,
            bucket: None,
            prefix: None,
            region: None,
            endpoint: None,
            force_path_style: false,
            interval_secs: default_poll_interval_secs(),
        }
    }
}

impl PollSitesConfig {
    /// Returns the poll interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Validates the provider-specific fields.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::Invalid("sites.poll.interval_secs must be positive".to_string()));
        }
        match self.provider {
            PollProvider::Http => {
                let url = self.url.as_deref().ok_or_else(|| {
                    ConfigError::Invalid("sites.poll.url is required for http provider".to_string())
                })?;
                validate_http_url("sites.poll.url", url)
            }
            PollProvider::S3 => {
                let bucket = self.bucket.as_deref().unwrap_or_default();
                if bucket.trim().is_empty() {
                    return Err(ConfigError::Invalid(
                        "sites.poll.bucket is required for s3 provider".to_string(),
                    ));
                }
                if let Some(endpoint) = &self.endpoint {
                    validate_http_url("sites.poll.endpoint", endpoint)?;
                }
                Ok(())
            }
        }
    }
}

// ============================================================================
// SECTION: Images
// ============================================================================

/// Image enrichment strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStrategy {
    /// No enrichment; raw document fields only.
    #[default]
    None,
    /// Local lookup table keyed by marketplace URI.
    Static,
    /// Remote catalog with base-URI fallback.
    Remote,
    /// Metadata embedded in the image record.
    Embedded,
}

/// Image enrichment settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImagesConfig {
    /// Selected strategy.
    #[serde(default)]
    pub strategy: ImageStrategy,
    /// Lookup table path (static strategy).
    #[serde(default)]
    pub table_path: Option<PathBuf>,
    /// Catalog URL (remote strategy).
    #[serde(default)]
    pub catalog_url: Option<String>,
}

impl ImagesConfig {
    /// Validates the strategy-specific fields.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.strategy {
            ImageStrategy::Static => {
                let path = self.table_path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("images.table_path is required for static strategy".to_string())
                })?;
                validate_store_path(path)
            }
            ImageStrategy::Remote => {
                let url = self.catalog_url.as_deref().ok_or_else(|| {
                    ConfigError::Invalid(
                        "images.catalog_url is required for remote strategy".to_string(),
                    )
                })?;
                validate_http_url("images.catalog_url", url)
            }
            ImageStrategy::None | ImageStrategy::Embedded => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Topology and VOs
// ============================================================================

/// Topology registry settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopologyConfig {
    /// GOCDB base URL; hostnames stay empty when unset.
    #[serde(default)]
    pub url: Option<String>,
    /// Service type queried from the registry.
    #[serde(default = "default_service_type")]
    pub service_type: String,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            url: None,
            service_type: default_service_type(),
        }
    }
}

/// VO portal settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VosConfig {
    /// Portal URL; the VO list stays empty when unset.
    #[serde(default)]
    pub url: Option<String>,
    /// API token sent as `X-API-Key`.
    #[serde(default)]
    pub token: Option<String>,
    /// Seconds between refreshes.
    #[serde(default = "default_vo_refresh_secs")]
    pub refresh_secs: u64,
}

impl Default for VosConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            refresh_secs: default_vo_refresh_secs(),
        }
    }
}

impl VosConfig {
    /// Returns the refresh interval.
    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }
}

// ============================================================================
// SECTION: Logging
// ============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default request timeout.
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Default user agent.
fn default_user_agent() -> String {
    format!("fedcloud-info/{}", env!("CARGO_PKG_VERSION"))
}

/// Serde helper for `true` defaults.
const fn default_true() -> bool {
    true
}

/// Default catalog domains.
fn default_catalog_domains() -> Vec<String> {
    DEFAULT_CATALOG_DOMAINS.iter().map(ToString::to_string).collect()
}

/// Default documents directory.
fn default_sites_dir() -> PathBuf {
    PathBuf::from("cloud-info")
}

/// Default poll interval.
const fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

/// Default GOCDB service type.
fn default_service_type() -> String {
    DEFAULT_SERVICE_TYPE.to_string()
}

/// Default VO refresh interval.
const fn default_vo_refresh_secs() -> u64 {
    DEFAULT_VO_REFRESH_SECS
}

/// Default log level.
fn default_log_level() -> String {
    "info".to_string()
}

// ============================================================================
// SECTION: Path and URL Validation
// ============================================================================

/// Resolves the config path from explicit input or environment.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the config file path length and components.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates data paths referenced by the config.
fn validate_store_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("path exceeds max length: {text}")));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("path component too long: {text}")));
        }
    }
    Ok(())
}

/// Validates that a URL uses an HTTP scheme.
fn validate_http_url(field: &str, url: &str) -> Result<(), ConfigError> {
    let trimmed = url.trim();
    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .ok_or_else(|| ConfigError::Invalid(format!("{field} must be an http(s) url")))?;
    if rest.is_empty() || rest.starts_with('/') {
        return Err(ConfigError::Invalid(format!("{field} is missing a host")));
    }
    Ok(())
}
