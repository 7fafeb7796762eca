// crates/fedcloud-info-registry/src/registry.rs
// ============================================================================
// Module: Site Registry Interface
// Description: Registry trait and the atomic snapshot cell.
// Purpose: Decouple HTTP readers from the refresh strategy.
// Dependencies: arc-swap, async-trait, fedcloud-info-core
// ============================================================================

//! ## Overview
//! Handlers call [`SiteRegistry::snapshot`] once per request and answer from
//! that value only. Backends build a complete replacement and hand it to
//! [`SnapshotCell::publish`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use fedcloud_info_core::SiteSnapshot;

use crate::error::RegistryError;

// ============================================================================
// SECTION: Registry Trait
// ============================================================================

/// Holder of the current site snapshot.
#[async_trait]
pub trait SiteRegistry: Send + Sync {
    /// Returns the most recently published snapshot.
    fn snapshot(&self) -> Arc<SiteSnapshot>;

    /// Performs the initial load and keeps refreshing until the process exits.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the refresh task cannot continue.
    async fn start(self: Arc<Self>) -> Result<(), RegistryError>;
}

// ============================================================================
// SECTION: Snapshot Cell
// ============================================================================

/// Single publish point for a registry's snapshot.
#[derive(Debug)]
pub struct SnapshotCell {
    /// Current snapshot.
    current: ArcSwap<SiteSnapshot>,
}

impl SnapshotCell {
    /// Creates a cell holding an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(SiteSnapshot::empty()),
        }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn load(&self) -> Arc<SiteSnapshot> {
        self.current.load_full()
    }

    /// Replaces the current snapshot.
    pub fn publish(&self, snapshot: SiteSnapshot) {
        self.current.store(Arc::new(snapshot));
    }
}

impl Default for SnapshotCell {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SECTION: Static Registry
// ============================================================================

/// Registry over a fixed snapshot, with no refresh task.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    /// Fixed snapshot.
    cell: SnapshotCell,
}

impl StaticRegistry {
    /// Creates a registry serving `snapshot` forever.
    #[must_use]
    pub fn new(snapshot: SiteSnapshot) -> Self {
        let cell = SnapshotCell::new();
        cell.publish(snapshot);
        Self {
            cell,
        }
    }
}

#[async_trait]
impl SiteRegistry for StaticRegistry {
    fn snapshot(&self) -> Arc<SiteSnapshot> {
        self.cell.load()
    }

    async fn start(self: Arc<Self>) -> Result<(), RegistryError> {
        Ok(())
    }
}
