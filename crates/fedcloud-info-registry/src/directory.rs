// crates/fedcloud-info-registry/src/directory.rs
// ============================================================================
// Module: Directory Registry
// Description: Registry over a watched directory tree of site documents.
// Purpose: Keep the snapshot in sync with `*.json` files on local disk.
// Dependencies: notify, tokio, tracing, walkdir
// ============================================================================

//! ## Overview
//! [`DirectoryRegistry`] scans the tree once at start, then applies batched
//! filesystem notifications. Each changed path is reconciled on its own:
//! - an existing document is reloaded and replaced, or dropped when it no
//!   longer loads;
//! - an existing directory is rescanned;
//! - a vanished path drops every document at or below it.
//!
//! Every batch publishes one complete snapshot. Documents are keyed by their
//! canonical path, which also fixes the name-collision order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fedcloud_info_core::MAX_DOCUMENT_BYTES;
use fedcloud_info_core::Normalizer;
use fedcloud_info_core::Site;
use fedcloud_info_core::SiteSnapshot;
use notify::Event;
use notify::EventKind;
use notify::RecursiveMode;
use notify::Watcher;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;
use walkdir::WalkDir;

use crate::error::RegistryError;
use crate::registry::SiteRegistry;
use crate::registry::SnapshotCell;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Quiet period collecting notifications into one batch.
const DEBOUNCE: Duration = Duration::from_millis(250);
/// Extension of site documents.
const DOCUMENT_EXTENSION: &str = "json";

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Registry backed by a watched directory.
pub struct DirectoryRegistry {
    /// Configured root directory.
    root: PathBuf,
    /// Document normalizer.
    normalizer: Normalizer,
    /// Loaded sites by canonical document path.
    sites: Mutex<BTreeMap<PathBuf, Arc<Site>>>,
    /// Published snapshot.
    cell: SnapshotCell,
}

impl DirectoryRegistry {
    /// Creates a registry over `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, normalizer: Normalizer) -> Self {
        Self {
            root: root.into(),
            normalizer,
            sites: Mutex::new(BTreeMap::new()),
            cell: SnapshotCell::new(),
        }
    }

    /// Returns the configured root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves the root to its canonical form, or `None` when it is absent.
    async fn canonical_root(&self) -> Option<PathBuf> {
        tokio::fs::canonicalize(&self.root).await.ok()
    }

    /// Rescans the whole tree and publishes the result.
    ///
    /// Returns the number of sites published. An absent root publishes an
    /// empty snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Io`] when the scan task fails.
    pub async fn load_all(&self) -> Result<usize, RegistryError> {
        let mut loaded = BTreeMap::new();
        if let Some(root) = self.canonical_root().await {
            for path in scan_documents(root).await? {
                if let Some(site) = self.load_file(&path).await {
                    loaded.insert(path, site);
                }
            }
        } else {
            warn!(root = %self.root.display(), "site directory does not exist");
        }
        let mut sites = self.sites.lock().await;
        *sites = loaded;
        let count = self.publish(&sites);
        info!(root = %self.root.display(), sites = count, "reloaded site directory");
        Ok(count)
    }

    /// Reconciles the given changed paths and publishes the result.
    ///
    /// Returns the number of sites published. A directory whose rescan fails
    /// keeps its previously loaded documents.
    pub async fn apply_changes(&self, paths: &[PathBuf]) -> usize {
        let mut sites = self.sites.lock().await;
        for path in paths {
            match tokio::fs::metadata(path).await {
                Ok(metadata) if metadata.is_dir() => {
                    let documents = match scan_documents(path.clone()).await {
                        Ok(documents) => documents,
                        Err(err) => {
                            error!(
                                path = %path.display(),
                                error = %err,
                                "unable to rescan directory; keeping previous sites"
                            );
                            continue;
                        }
                    };
                    sites.retain(|key, _| !key.starts_with(path));
                    for document in documents {
                        if let Some(site) = self.load_file(&document).await {
                            sites.insert(document, site);
                        }
                    }
                }
                Ok(_) if is_document(path) => {
                    if let Some(site) = self.load_file(path).await {
                        sites.insert(path.clone(), site);
                    } else {
                        sites.remove(path);
                    }
                }
                Ok(_) => {}
                Err(_) => {
                    let before = sites.len();
                    sites.retain(|key, _| !key.starts_with(path));
                    if sites.len() != before {
                        info!(path = %path.display(), "removed site documents");
                    }
                }
            }
        }
        let count = self.publish(&sites);
        debug!(changes = paths.len(), sites = count, "applied site directory changes");
        count
    }

    /// Reads and normalizes one document, logging failures.
    async fn load_file(&self, path: &Path) -> Option<Arc<Site>> {
        let result = async {
            let metadata = tokio::fs::metadata(path).await.map_err(|err| err.to_string())?;
            if metadata.len() > u64::try_from(MAX_DOCUMENT_BYTES).unwrap_or(u64::MAX) {
                return Err(format!(
                    "document exceeds size limit: {} bytes (max {MAX_DOCUMENT_BYTES})",
                    metadata.len()
                ));
            }
            let bytes = tokio::fs::read(path).await.map_err(|err| err.to_string())?;
            self.normalizer.normalize_bytes(&bytes).await.map_err(|err| err.to_string())
        }
        .await;
        match result {
            Ok(site) => {
                debug!(path = %path.display(), site = %site.name, "loaded site document");
                Some(Arc::new(site))
            }
            Err(err) => {
                error!(path = %path.display(), error = %err, "unable to load site document");
                None
            }
        }
    }

    /// Publishes a snapshot of `sites`, returning its size.
    fn publish(&self, sites: &BTreeMap<PathBuf, Arc<Site>>) -> usize {
        let snapshot = SiteSnapshot::from_sources(
            sites.iter().map(|(path, site)| (path.to_string_lossy().into_owned(), Arc::clone(site))),
        );
        let count = snapshot.len();
        self.cell.publish(snapshot);
        count
    }
}

#[async_trait]
impl SiteRegistry for DirectoryRegistry {
    fn snapshot(&self) -> Arc<SiteSnapshot> {
        self.cell.load()
    }

    async fn start(self: Arc<Self>) -> Result<(), RegistryError> {
        self.load_all().await?;
        let Some(root) = self.canonical_root().await else {
            return Ok(());
        };

        let (sender, mut receiver) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
            if sender.send(event).is_err() {
                debug!("site directory watch receiver dropped; discarding event");
            }
        })
        .map_err(|err| RegistryError::Watch(err.to_string()))?;
        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|err| RegistryError::Watch(err.to_string()))?;
        info!(root = %root.display(), "watching site directory");

        while let Some(first) = receiver.recv().await {
            let mut changed = BTreeSet::new();
            collect_paths(first, &mut changed);
            tokio::time::sleep(DEBOUNCE).await;
            while let Ok(event) = receiver.try_recv() {
                collect_paths(event, &mut changed);
            }
            if changed.is_empty() {
                continue;
            }
            let paths: Vec<PathBuf> = changed.into_iter().collect();
            self.apply_changes(&paths).await;
        }
        drop(watcher);
        Err(RegistryError::Watch("watch channel closed".to_string()))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Adds the paths of a relevant notification to `changed`.
fn collect_paths(event: notify::Result<Event>, changed: &mut BTreeSet<PathBuf>) {
    match event {
        Ok(event) => {
            if matches!(event.kind, EventKind::Access(_)) {
                return;
            }
            changed.extend(event.paths);
        }
        Err(err) => warn!(error = %err, "site directory watch error"),
    }
}

/// Returns true for paths carrying the document extension.
fn is_document(path: &Path) -> bool {
    path.extension().is_some_and(|extension| extension == DOCUMENT_EXTENSION)
}

/// Lists every document file below `root`, sorted.
async fn scan_documents(root: PathBuf) -> Result<Vec<PathBuf>, RegistryError> {
    tokio::task::spawn_blocking(move || {
        let mut documents = Vec::new();
        for entry in WalkDir::new(&root).follow_links(true) {
            match entry {
                Ok(entry) if entry.file_type().is_file() && is_document(entry.path()) => {
                    documents.push(entry.into_path());
                }
                Ok(_) => {}
                Err(err) => warn!(root = %root.display(), error = %err, "unable to scan entry"),
            }
        }
        documents.sort();
        documents
    })
    .await
    .map_err(|err| RegistryError::Io(err.to_string()))
}
