// crates/fedcloud-info-registry/src/poll.rs
// ============================================================================
// Module: Poll Registry
// Description: Interval-driven registry over an object store.
// Purpose: Mirror a remote document listing into the site snapshot.
// Dependencies: async-trait, fedcloud-info-core, tokio, tracing
// ============================================================================

//! ## Overview
//! Every interval the [`PollRegistry`] lists its [`ObjectStore`] and builds a
//! new snapshot from the listed documents only:
//! - A document whose modification token equals the one seen last pass keeps
//!   its previously normalized site and is not fetched.
//! - Any other document is fetched and normalized; failures drop it from the
//!   new snapshot.
//! - A failed listing publishes nothing and keeps the current snapshot.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fedcloud_info_core::Normalizer;
use fedcloud_info_core::Site;
use fedcloud_info_core::SiteSnapshot;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::error;
use tracing::info;

use crate::error::RegistryError;
use crate::object_store::ObjectEntry;
use crate::object_store::ObjectStore;
use crate::registry::SiteRegistry;
use crate::registry::SnapshotCell;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default delay between listing passes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(600);

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Site loaded on a previous pass.
#[derive(Debug, Clone)]
struct PolledSite {
    /// Token observed when the site was loaded.
    last_modified: String,
    /// Normalized site.
    site: Arc<Site>,
}

/// Registry refreshed by periodically listing an object store.
pub struct PollRegistry {
    /// Document source.
    store: Arc<dyn ObjectStore>,
    /// Document normalizer.
    normalizer: Normalizer,
    /// Delay between passes.
    interval: Duration,
    /// Sites of the last successful pass, by document name.
    known: Mutex<HashMap<String, PolledSite>>,
    /// Published snapshot.
    cell: SnapshotCell,
}

impl PollRegistry {
    /// Creates a registry polling `store` every `interval`.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, normalizer: Normalizer, interval: Duration) -> Self {
        Self {
            store,
            normalizer,
            interval,
            known: Mutex::new(HashMap::new()),
            cell: SnapshotCell::new(),
        }
    }

    /// Runs one listing pass and publishes its snapshot.
    ///
    /// Returns the number of sites published.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Store`] when the listing fails; the current
    /// snapshot is left in place.
    pub async fn refresh(&self) -> Result<usize, RegistryError> {
        let entries =
            self.store.list().await.map_err(|err| RegistryError::Store(err.to_string()))?;
        let mut known = self.known.lock().await;
        let mut next: HashMap<String, PolledSite> = HashMap::with_capacity(entries.len());
        for entry in entries {
            if let Some(previous) = reusable(&known, &entry) {
                debug!(document = %entry.name, "site document unchanged");
                next.insert(entry.name, previous);
                continue;
            }
            if let Some(site) = self.load(&entry.name).await {
                next.insert(
                    entry.name,
                    PolledSite {
                        last_modified: entry.last_modified,
                        site,
                    },
                );
            }
        }
        let snapshot = SiteSnapshot::from_sources(
            next.iter().map(|(name, polled)| (name.as_str(), Arc::clone(&polled.site))),
        );
        let count = snapshot.len();
        *known = next;
        self.cell.publish(snapshot);
        info!(sites = count, "reloaded site documents");
        Ok(count)
    }

    /// Fetches and normalizes one document, logging failures.
    async fn load(&self, name: &str) -> Option<Arc<Site>> {
        let bytes = match self.store.fetch(name).await {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(document = %name, error = %err, "unable to fetch site document");
                return None;
            }
        };
        match self.normalizer.normalize_bytes(&bytes).await {
            Ok(site) => {
                info!(document = %name, site = %site.name, "loaded site document");
                Some(Arc::new(site))
            }
            Err(err) => {
                error!(document = %name, error = %err, "unable to load site document");
                None
            }
        }
    }
}

/// Returns the previous site when the entry's token is unchanged.
fn reusable(known: &HashMap<String, PolledSite>, entry: &ObjectEntry) -> Option<PolledSite> {
    if entry.last_modified.is_empty() {
        return None;
    }
    known
        .get(&entry.name)
        .filter(|previous| previous.last_modified == entry.last_modified)
        .cloned()
}

#[async_trait]
impl SiteRegistry for PollRegistry {
    fn snapshot(&self) -> Arc<SiteSnapshot> {
        self.cell.load()
    }

    async fn start(self: Arc<Self>) -> Result<(), RegistryError> {
        loop {
            if let Err(err) = self.refresh().await {
                error!(error = %err, "unable to list site documents");
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}
