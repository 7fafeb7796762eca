// crates/fedcloud-info-server/src/context.rs
// ============================================================================
// Module: Application Context
// Description: Explicit dependency object shared by HTTP handlers.
// Purpose: Build the registry, VO catalog, and normalizer from configuration.
// Dependencies: fedcloud-info-catalogs, fedcloud-info-config, fedcloud-info-registry
// ============================================================================

//! ## Overview
//! Everything handlers need lives in [`AppContext`]; there is no process-wide
//! state. Tests construct a context directly from fixed collaborators.
//!
//! The image enrichment strategy is chosen once per deployment by
//! `images.strategy`. Hostnames resolve through GOCDB only when
//! `topology.url` is set.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use fedcloud_info_catalogs::EmbeddedMetadataEnricher;
use fedcloud_info_catalogs::GocdbResolver;
use fedcloud_info_catalogs::HttpFetcher;
use fedcloud_info_catalogs::OpsPortalClient;
use fedcloud_info_catalogs::RemoteCatalogEnricher;
use fedcloud_info_catalogs::StaticTableEnricher;
use fedcloud_info_catalogs::VoCatalog;
use fedcloud_info_config::FedCloudInfoConfig;
use fedcloud_info_config::ImageStrategy;
use fedcloud_info_config::PollProvider;
use fedcloud_info_config::SitesBackend;
use fedcloud_info_core::HostnameResolver;
use fedcloud_info_core::ImageEnricher;
use fedcloud_info_core::NoEnrichment;
use fedcloud_info_core::NoHostnames;
use fedcloud_info_core::Normalizer;
use fedcloud_info_registry::DirectoryRegistry;
use fedcloud_info_registry::HttpListingStore;
use fedcloud_info_registry::ObjectStore;
use fedcloud_info_registry::PollRegistry;
use fedcloud_info_registry::S3ObjectStore;
use fedcloud_info_registry::S3StoreConfig;
use fedcloud_info_registry::SiteRegistry;
use tracing::info;

use crate::error::ServerError;

// ============================================================================
// SECTION: Context
// ============================================================================

/// Collaborators shared by every request.
#[derive(Clone)]
pub struct AppContext {
    /// Site registry.
    pub sites: Arc<dyn SiteRegistry>,
    /// VO catalog.
    pub vos: Arc<VoCatalog>,
}

impl AppContext {
    /// Creates a context over existing collaborators.
    #[must_use]
    pub fn new(sites: Arc<dyn SiteRegistry>, vos: Arc<VoCatalog>) -> Self {
        Self {
            sites,
            vos,
        }
    }

    /// Builds every collaborator described by `config`.
    ///
    /// Background tasks are not started.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Init`] when a client cannot be constructed.
    pub async fn from_config(config: &FedCloudInfoConfig) -> Result<Self, ServerError> {
        let fetcher = HttpFetcher::new(config.http.timeout(), &config.http.user_agent)
            .map_err(|err| ServerError::Init(err.to_string()))?;
        let normalizer = build_normalizer(config, &fetcher)?;
        let sites = build_registry(config, &fetcher, normalizer).await?;
        let vos = build_vo_catalog(config, &fetcher)?;
        Ok(Self::new(sites, Arc::new(vos)))
    }
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Builds the normalizer with the configured enrichment and topology lookup.
///
/// # Errors
///
/// Returns [`ServerError::Config`] when strategy settings are missing and
/// [`ServerError::Init`] when a catalog client cannot be constructed.
pub fn build_normalizer(
    config: &FedCloudInfoConfig,
    fetcher: &HttpFetcher,
) -> Result<Normalizer, ServerError> {
    let enricher: Arc<dyn ImageEnricher> = match config.images.strategy {
        ImageStrategy::None => Arc::new(NoEnrichment),
        ImageStrategy::Static => {
            let path = config.images.table_path.as_deref().ok_or_else(|| {
                ServerError::Config("images.table_path is required for static strategy".to_string())
            })?;
            Arc::new(StaticTableEnricher::load(path))
        }
        ImageStrategy::Remote => {
            let url = config.images.catalog_url.as_deref().ok_or_else(|| {
                ServerError::Config("images.catalog_url is required for remote strategy".to_string())
            })?;
            Arc::new(
                RemoteCatalogEnricher::new(fetcher.clone(), url)
                    .map_err(|err| ServerError::Init(err.to_string()))?,
            )
        }
        ImageStrategy::Embedded => Arc::new(EmbeddedMetadataEnricher::default()),
    };
    let hostnames: Arc<dyn HostnameResolver> = match config.topology.url.as_deref() {
        Some(url) => Arc::new(
            GocdbResolver::new(fetcher.clone(), url, &config.topology.service_type)
                .map_err(|err| ServerError::Init(err.to_string()))?,
        ),
        None => Arc::new(NoHostnames),
    };
    Ok(Normalizer::new(config.normalizer.options(), enricher, hostnames))
}

/// Builds the configured site registry backend.
async fn build_registry(
    config: &FedCloudInfoConfig,
    fetcher: &HttpFetcher,
    normalizer: Normalizer,
) -> Result<Arc<dyn SiteRegistry>, ServerError> {
    match config.sites.backend {
        SitesBackend::Directory => {
            let path = config.sites.directory.path.clone();
            info!(path = %path.display(), "using directory site registry");
            Ok(Arc::new(DirectoryRegistry::new(path, normalizer)))
        }
        SitesBackend::Poll => {
            let poll = &config.sites.poll;
            let store: Arc<dyn ObjectStore> = match poll.provider {
                PollProvider::Http => {
                    let url = poll.url.as_deref().ok_or_else(|| {
                        ServerError::Config("sites.poll.url is required for http provider".to_string())
                    })?;
                    info!(url = %url, "using http poll site registry");
                    Arc::new(
                        HttpListingStore::new(fetcher.clone(), url)
                            .map_err(|err| ServerError::Init(err.to_string()))?,
                    )
                }
                PollProvider::S3 => {
                    let store_config = S3StoreConfig {
                        bucket: poll.bucket.clone().unwrap_or_default(),
                        prefix: poll.prefix.clone(),
                        region: poll.region.clone(),
                        endpoint: poll.endpoint.clone(),
                        force_path_style: poll.force_path_style,
                    };
                    info!(bucket = %store_config.bucket, "using s3 poll site registry");
                    Arc::new(
                        S3ObjectStore::connect(&store_config)
                            .await
                            .map_err(|err| ServerError::Init(err.to_string()))?,
                    )
                }
            };
            Ok(Arc::new(PollRegistry::new(store, normalizer, poll.interval())))
        }
    }
}

/// Builds the VO catalog; without a portal URL the catalog stays empty.
fn build_vo_catalog(
    config: &FedCloudInfoConfig,
    fetcher: &HttpFetcher,
) -> Result<VoCatalog, ServerError> {
    let Some(url) = config.vos.url.as_deref() else {
        info!("no vo portal configured");
        return Ok(VoCatalog::disabled());
    };
    let client = OpsPortalClient::new(fetcher.clone(), url, config.vos.token.as_deref())
        .map_err(|err| ServerError::Init(err.to_string()))?;
    Ok(VoCatalog::new(Arc::new(client), config.vos.refresh_interval()))
}
