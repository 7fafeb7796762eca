// crates/fedcloud-info-core/src/model.rs
// ============================================================================
// Module: Site Model
// Description: Typed aggregates for sites, shares, images, and VOs.
// Purpose: Provide the query-ready model produced by the normalizer.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The model is a tree of immutable values: a [`Site`] owns its [`Share`]s,
//! and each share owns the [`Image`]s and [`InstanceType`]s offered to exactly
//! one virtual organization. Aggregates are rebuilt from scratch on every
//! refresh and never patched field by field.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::lenient;

// ============================================================================
// SECTION: Virtual Organizations
// ============================================================================

/// A virtual organization published by the VO portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vo {
    /// Portal serial number (published as a string or an integer).
    #[serde(deserialize_with = "lenient::u64_from_scalar")]
    pub serial: u64,
    /// VO name.
    pub name: String,
}

// ============================================================================
// SECTION: Images and Instance Types
// ============================================================================

/// A virtual machine image offered to one VO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Image identifier at the site.
    pub id: String,
    /// Display name (catalog name when known, cleaned document name otherwise).
    pub name: String,
    /// Catalog identifier; empty when the image is not catalog-recognized.
    pub catalog_id: String,
    /// Marketplace URI published by the site.
    pub marketplace_uri: String,
    /// Image version; empty when unknown.
    pub version: String,
    /// VO the owning share belongs to.
    pub vo: String,
}

impl Image {
    /// Returns true when the image was matched to a catalog entry.
    #[must_use]
    pub const fn is_catalog_image(&self) -> bool {
        !self.catalog_id.is_empty()
    }
}

/// Virtual accelerator metadata attached to an instance type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accelerator {
    /// Accelerator record identifier.
    pub id: String,
    /// Optional accelerator name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Accelerator kind (for example `GPU`).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub accelerator_type: Option<String>,
    /// Hardware vendor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    /// Hardware model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Number of accelerators attached per instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u64>,
    /// Accelerator memory in MiB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
}

/// A flavor offered to one VO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceType {
    /// Flavor name.
    pub name: String,
    /// Accelerator metadata when the flavor references one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accelerator: Option<Accelerator>,
}

impl InstanceType {
    /// Builds an instance type without accelerator metadata.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            accelerator: None,
        }
    }
}

// ============================================================================
// SECTION: Shares and Projects
// ============================================================================

/// Project view of a share: the cloud project a VO maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Cloud project identifier.
    pub id: String,
    /// VO name.
    pub name: String,
}

/// One VO's allocation within a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    /// Share name from the document.
    pub name: String,
    /// VO resolved through the mapping policies.
    pub vo: String,
    /// Cloud project identifier.
    pub project_id: String,
    /// Images offered through the share, in document order.
    pub images: Vec<Image>,
    /// Instance types offered through the share, in document order.
    pub instance_types: Vec<InstanceType>,
}

impl Share {
    /// Returns the project view of this share.
    #[must_use]
    pub fn project(&self) -> Project {
        Project {
            id: self.project_id.clone(),
            name: self.vo.clone(),
        }
    }
}

// ============================================================================
// SECTION: Sites
// ============================================================================

/// A federated cloud site assembled from one published document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    /// Administrative domain name (disambiguated inside a snapshot).
    pub name: String,
    /// Public endpoint URL.
    pub url: String,
    /// Hostname resolved through the topology registry; empty if unknown.
    pub hostname: String,
    /// Identifier assigned by the topology registry.
    pub external_id: String,
    /// Shares in document order.
    pub shares: Vec<Share>,
}

impl Site {
    /// Returns true when some share belongs to the VO.
    #[must_use]
    pub fn supports_vo(&self, vo: &str) -> bool {
        self.shares.iter().any(|share| share.vo == vo)
    }

    /// Returns the first share belonging to the VO.
    #[must_use]
    pub fn vo_share(&self, vo: &str) -> Option<&Share> {
        self.shares.iter().find(|share| share.vo == vo)
    }

    /// Iterates over all images across shares.
    pub fn images(&self) -> impl Iterator<Item = &Image> {
        self.shares.iter().flat_map(|share| share.images.iter())
    }

    /// Returns the project view of every share.
    #[must_use]
    pub fn projects(&self) -> Vec<Project> {
        self.shares.iter().map(Share::project).collect()
    }

    /// Builds the summary record exposed by the HTTP API.
    #[must_use]
    pub fn summary(&self, include_projects: bool) -> SiteSummary {
        SiteSummary {
            id: self.external_id.clone(),
            name: self.name.clone(),
            url: self.url.clone(),
            state: String::new(),
            hostname: self.hostname.clone(),
            projects: include_projects.then(|| self.projects()),
        }
    }
}

/// Summary record for a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSummary {
    /// External identifier.
    pub id: String,
    /// Site name.
    pub name: String,
    /// Public endpoint URL.
    pub url: String,
    /// Site state; not published by the documents and always empty.
    pub state: String,
    /// Resolved hostname.
    pub hostname: String,
    /// Projects, only when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<Project>>,
}
