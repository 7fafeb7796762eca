// crates/fedcloud-info-core/src/glue.rs
// ============================================================================
// Module: Site Document Shape
// Description: Canonical serde model of a published site document.
// Purpose: Absorb schema-revision variance at the ingestion boundary.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Site documents are JSON exports of the federated-cloud information schema.
//! Across schema revisions the same association may be a single identifier or
//! a list, sections may be a single object or a list, and the marketplace
//! field is spelled `MarketplaceURL` or `MarketPlaceURL`. Decoding into the
//! types below folds every variant into one canonical shape, so the
//! normalizer never special-cases document revisions.
//!
//! Identifiers and the associations referencing them may be published as
//! numbers; they are decoded as strings.
//!
//! Unknown fields are ignored; the documents carry many attributes the
//! service does not expose.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Deserializer;
use serde::de::Error;
use serde_json::Map;
use serde_json::Value;

use crate::lenient;

// ============================================================================
// SECTION: One-Or-Many
// ============================================================================

/// A value published either as a single item or as a list of items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneOrMany<T>(pub Vec<T>);

impl<T> OneOrMany<T> {
    /// Returns the first item, if any.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.0.first()
    }

    /// Iterates over the items.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    /// Returns true when no items are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T: PartialEq> OneOrMany<T> {
    /// Returns true when `item` is one of the values.
    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.0.contains(item)
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<'de, T> Deserialize<'de> for OneOrMany<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        /// Wire shapes accepted for a one-or-many value.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Shape<T> {
            /// A JSON list.
            Many(Vec<T>),
            /// A single item.
            One(T),
            /// An explicit `null`.
            Null(()),
        }

        Ok(match Shape::deserialize(deserializer)? {
            Shape::Many(items) => Self(items),
            Shape::One(item) => Self(vec![item]),
            Shape::Null(()) => Self(Vec::new()),
        })
    }
}

/// Decodes associated identifiers published as strings or numbers.
fn scalar_ids<'de, D>(deserializer: D) -> Result<OneOrMany<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = OneOrMany::<Value>::deserialize(deserializer)?;
    values
        .0
        .iter()
        .filter(|value| !value.is_null())
        .map(|value| {
            lenient::scalar_to_string(value)
                .ok_or_else(|| D::Error::custom(format!("expected identifier, got {value}")))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(OneOrMany)
}

// ============================================================================
// SECTION: Document
// ============================================================================

/// A site document in canonical shape.
///
/// Sections the normalizer requires are kept as `Option` so their absence can
/// be reported precisely; the remaining sections default to empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlueDocument {
    /// Cloud computing service records (only the first is used).
    #[serde(rename = "CloudComputingService", default)]
    pub services: Option<OneOrMany<ServiceRecord>>,
    /// Cloud computing endpoint records (only the first is used).
    #[serde(rename = "CloudComputingEndpoint", default)]
    pub endpoints: Option<OneOrMany<EndpointRecord>>,
    /// Manager records, kept opaque.
    #[serde(rename = "CloudComputingManager", default)]
    pub managers: OneOrMany<Value>,
    /// Share records.
    #[serde(rename = "Share", default)]
    pub shares: Option<OneOrMany<ShareRecord>>,
    /// Mapping policies associating shares with VOs.
    #[serde(rename = "MappingPolicy", default)]
    pub policies: Option<OneOrMany<MappingPolicyRecord>>,
    /// Image records.
    #[serde(rename = "CloudComputingImage", default)]
    pub images: OneOrMany<ImageRecord>,
    /// Instance type records.
    #[serde(rename = "CloudComputingInstanceType", default)]
    pub instance_types: OneOrMany<InstanceTypeRecord>,
    /// Virtual accelerator records.
    #[serde(rename = "CloudComputingVirtualAccelerator", default)]
    pub accelerators: OneOrMany<AcceleratorRecord>,
}

impl GlueDocument {
    /// Decodes a document from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when the bytes are not a valid document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Service record: validity window, admin domain, and vendor metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceRecord {
    /// Service identifier.
    #[serde(rename = "ID", default, deserialize_with = "lenient::string_from_scalar")]
    pub id: String,
    /// Service name.
    #[serde(rename = "Name", default)]
    pub name: String,
    /// Validity window in seconds.
    #[serde(rename = "Validity", default, deserialize_with = "lenient::opt_u64_from_scalar")]
    pub validity: Option<u64>,
    /// Creation timestamp (ISO 8601, timezone optional).
    #[serde(rename = "CreationTime", default)]
    pub creation_time: Option<String>,
    /// Associations of the service.
    #[serde(rename = "Associations", default)]
    pub associations: ServiceAssociations,
    /// Vendor-specific metadata.
    #[serde(rename = "OtherInfo", default)]
    pub other_info: Map<String, Value>,
}

/// Associations of a service record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceAssociations {
    /// Administrative domain names.
    #[serde(rename = "AdminDomain", default)]
    pub admin_domain: OneOrMany<String>,
}

/// Endpoint record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointRecord {
    /// Endpoint identifier.
    #[serde(rename = "ID", default, deserialize_with = "lenient::string_from_scalar")]
    pub id: String,
    /// Endpoint URL.
    #[serde(rename = "URL", default)]
    pub url: Option<String>,
}

/// Share record.
#[derive(Debug, Clone, Deserialize)]
pub struct ShareRecord {
    /// Share identifier, referenced by policies, images, and instance types.
    #[serde(rename = "ID", deserialize_with = "lenient::string_from_scalar")]
    pub id: String,
    /// Share name.
    #[serde(rename = "Name", default)]
    pub name: String,
    /// Cloud project identifier.
    #[serde(rename = "ProjectID", default, deserialize_with = "lenient::string_from_scalar")]
    pub project_id: String,
}

/// Mapping policy record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MappingPolicyRecord {
    /// Policy identifier.
    #[serde(rename = "ID", default, deserialize_with = "lenient::string_from_scalar")]
    pub id: String,
    /// Share and user-domain associations.
    #[serde(rename = "Associations", default)]
    pub associations: PolicyAssociations,
}

/// Associations of a mapping policy.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyAssociations {
    /// Shares the policy applies to.
    #[serde(rename = "Share", default, deserialize_with = "scalar_ids")]
    pub share: OneOrMany<String>,
    /// VO names the policy grants.
    #[serde(rename = "PolicyUserDomain", default)]
    pub policy_user_domain: OneOrMany<String>,
}

/// Image record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageRecord {
    /// Image identifier.
    #[serde(rename = "ID", deserialize_with = "lenient::string_from_scalar")]
    pub id: String,
    /// Image name as published by the site.
    #[serde(rename = "Name", default)]
    pub name: String,
    /// Image version, when published.
    #[serde(rename = "Version", default)]
    pub version: Option<String>,
    /// Marketplace URI.
    #[serde(rename = "MarketplaceURL", alias = "MarketPlaceURL", default)]
    pub marketplace_url: Option<String>,
    /// Share associations.
    #[serde(rename = "Associations", default)]
    pub associations: ShareAssociations,
    /// Vendor-specific metadata.
    #[serde(rename = "OtherInfo", default)]
    pub other_info: Map<String, Value>,
}

impl ImageRecord {
    /// Returns a string entry from `OtherInfo`.
    #[must_use]
    pub fn other_info_str(&self, key: &str) -> Option<&str> {
        self.other_info.get(key).and_then(Value::as_str).filter(|value| !value.is_empty())
    }
}

/// Share associations carried by images.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShareAssociations {
    /// Shares the record belongs to.
    #[serde(rename = "Share", default, deserialize_with = "scalar_ids")]
    pub share: OneOrMany<String>,
}

/// Instance type record.
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceTypeRecord {
    /// Instance type identifier.
    #[serde(rename = "ID", default, deserialize_with = "lenient::string_from_scalar")]
    pub id: String,
    /// Flavor name.
    #[serde(rename = "Name")]
    pub name: String,
    /// Share and accelerator associations.
    #[serde(rename = "Associations", default)]
    pub associations: InstanceTypeAssociations,
}

/// Associations of an instance type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstanceTypeAssociations {
    /// Shares the record belongs to.
    #[serde(rename = "Share", default, deserialize_with = "scalar_ids")]
    pub share: OneOrMany<String>,
    /// Referenced accelerator (only the first is used).
    #[serde(rename = "CloudComputingVirtualAccelerator", default, deserialize_with = "scalar_ids")]
    pub accelerator: OneOrMany<String>,
}

/// Virtual accelerator record.
#[derive(Debug, Clone, Deserialize)]
pub struct AcceleratorRecord {
    /// Accelerator identifier.
    #[serde(rename = "ID", deserialize_with = "lenient::string_from_scalar")]
    pub id: String,
    /// Accelerator name.
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    /// Accelerator kind.
    #[serde(rename = "Type", default)]
    pub accelerator_type: Option<String>,
    /// Hardware vendor.
    #[serde(rename = "Vendor", default)]
    pub vendor: Option<String>,
    /// Hardware model.
    #[serde(rename = "Model", default)]
    pub model: Option<String>,
    /// Accelerators per instance.
    #[serde(rename = "Number", default, deserialize_with = "lenient::opt_u64_from_scalar")]
    pub number: Option<u64>,
    /// Accelerator memory.
    #[serde(rename = "Memory", default, deserialize_with = "lenient::opt_u64_from_scalar")]
    pub memory: Option<u64>,
}
