// crates/fedcloud-info-core/src/snapshot.rs
// ============================================================================
// Module: Site Snapshot
// Description: Immutable, query-ready view of every loaded site.
// Purpose: Give readers one consistent registry state per request.
// Dependencies: tracing
// ============================================================================

//! ## Overview
//! A [`SiteSnapshot`] is assembled from `(source key, site)` pairs in one pass
//! and never mutated afterwards. Registry backends publish a new snapshot per
//! refresh; handlers load the current one exactly once per request.
//!
//! Sites are ordered by source key. When two sources yield the same site name
//! with different external identifiers, the later one is exposed as
//! `"{name}-{external_id}"` so both stay reachable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use tracing::warn;

use crate::model::Image;
use crate::model::Site;
use crate::model::SiteSummary;

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// Immutable set of sites with name and external-id indexes.
#[derive(Debug, Clone, Default)]
pub struct SiteSnapshot {
    /// Sites in source-key order, names disambiguated.
    sites: Vec<Arc<Site>>,
    /// Position of each site by name.
    by_name: HashMap<String, usize>,
}

impl SiteSnapshot {
    /// Returns an empty snapshot.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a snapshot from keyed sites.
    ///
    /// Sources are processed in key order. A site whose name is taken by a
    /// site with a different external id is renamed `"{name}-{external_id}"`,
    /// with a numeric suffix added while that name is also taken. An exact
    /// duplicate (same name and id) is dropped with a warning.
    #[must_use]
    pub fn from_sources<I, K>(sources: I) -> Self
    where
        I: IntoIterator<Item = (K, Arc<Site>)>,
        K: AsRef<str>,
    {
        let mut keyed: Vec<(K, Arc<Site>)> = sources.into_iter().collect();
        keyed.sort_by(|left, right| left.0.as_ref().cmp(right.0.as_ref()));

        let mut sites: Vec<Arc<Site>> = Vec::with_capacity(keyed.len());
        let mut by_name: HashMap<String, usize> = HashMap::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        for (key, site) in keyed {
            if !seen.insert((site.name.clone(), site.external_id.clone())) {
                warn!(
                    source = key.as_ref(),
                    site = %site.name,
                    external_id = %site.external_id,
                    "duplicate site document; skipping"
                );
                continue;
            }
            let site = if by_name.contains_key(&site.name) {
                let renamed = unique_name(&by_name, &site);
                warn!(
                    source = key.as_ref(),
                    site = %site.name,
                    renamed = %renamed,
                    "site name collision; disambiguating"
                );
                let mut unique = Site::clone(&site);
                unique.name = renamed;
                Arc::new(unique)
            } else {
                site
            };
            by_name.insert(site.name.clone(), sites.len());
            sites.push(site);
        }
        Self {
            sites,
            by_name,
        }
    }

    /// Returns the number of sites.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Returns true when no site is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Returns every site, optionally restricted to those supporting a VO.
    #[must_use]
    pub fn all_sites(&self, vo: Option<&str>) -> Vec<Arc<Site>> {
        self.sites
            .iter()
            .filter(|site| vo.is_none_or(|vo| site.supports_vo(vo)))
            .cloned()
            .collect()
    }

    /// Returns the first site with the given external id.
    #[must_use]
    pub fn site_by_external_id(&self, external_id: &str) -> Option<Arc<Site>> {
        self.sites.iter().find(|site| site.external_id == external_id).cloned()
    }

    /// Returns the site with the given (disambiguated) name.
    #[must_use]
    pub fn site_by_name(&self, name: &str) -> Option<Arc<Site>> {
        self.by_name.get(name).and_then(|&index| self.sites.get(index)).cloned()
    }

    /// Resolves a site by name, falling back to its external id.
    #[must_use]
    pub fn site(&self, key: &str) -> Option<Arc<Site>> {
        self.site_by_name(key).or_else(|| self.site_by_external_id(key))
    }

    /// Returns summaries of every site, optionally restricted to a VO.
    #[must_use]
    pub fn summaries(&self, vo: Option<&str>, include_projects: bool) -> Vec<SiteSummary> {
        self.sites
            .iter()
            .filter(|site| vo.is_none_or(|vo| site.supports_vo(vo)))
            .map(|site| site.summary(include_projects))
            .collect()
    }

    /// Returns `(site, image)` pairs across all sites, optionally for one VO.
    pub fn images<'a>(
        &'a self,
        vo: Option<&'a str>,
    ) -> impl Iterator<Item = (&'a Site, &'a Image)> + 'a {
        self.sites.iter().flat_map(move |site| {
            site.images()
                .filter(move |image| vo.is_none_or(|vo| image.vo == vo))
                .map(move |image| (site.as_ref(), image))
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the first free name among `"{name}-{external_id}"` and its
/// numbered variants.
fn unique_name(taken: &HashMap<String, usize>, site: &Site) -> String {
    let base = format!("{}-{}", site.name, site.external_id);
    std::iter::once(base.clone())
        .chain((2_u32 ..).map(|attempt| format!("{base}-{attempt}")))
        .find(|candidate| !taken.contains_key(candidate))
        .unwrap_or(base)
}
