// crates/fedcloud-info-core/src/normalize.rs
// ============================================================================
// Module: Document Normalizer
// Description: Resolves one site document into a typed Site aggregate.
// Purpose: Join shares, policies, images, and instance types by identifier.
// Dependencies: serde_json, thiserror, time, tracing, url
// ============================================================================

//! ## Overview
//! [`Normalizer`] turns a [`GlueDocument`] into a [`Site`]:
//! 1. Take the first service and endpoint record.
//! 2. Optionally reject the document when its validity window has elapsed.
//! 3. Resolve each share's VO through the first mapping policy naming it;
//!    shares without a policy are skipped with a warning.
//! 4. Attach the images and instance types associated with each share, in
//!    document order, enriching catalog images through the [`ImageEnricher`].
//! 5. Read the external identifier from the service metadata and resolve the
//!    hostname through the [`HostnameResolver`].
//!
//! Identifier indexes are built once per document so the joins stay linear.
//! Enrichment and hostname lookups never fail a document; they degrade to
//! empty fields.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;
use tracing::warn;
use url::Url;

use crate::freshness::check_freshness;
use crate::glue::AcceleratorRecord;
use crate::glue::GlueDocument;
use crate::glue::ImageRecord;
use crate::glue::InstanceTypeRecord;
use crate::glue::OneOrMany;
use crate::interfaces::Enrichment;
use crate::interfaces::HostnameResolver;
use crate::interfaces::ImageEnricher;
use crate::lenient::scalar_to_string;
use crate::model::Accelerator;
use crate::model::Image;
use crate::model::InstanceType;
use crate::model::Share;
use crate::model::Site;

// ============================================================================
// SECTION: Limits and Defaults
// ============================================================================

/// Maximum accepted size of one site document.
pub const MAX_DOCUMENT_BYTES: usize = 8 * 1024 * 1024;

/// `OtherInfo` key on the service record holding the topology registry id.
pub const EXTERNAL_ID_KEY: &str = "gocdb_id";

/// Marketplace domains recognized as image catalogs by default.
pub const DEFAULT_CATALOG_DOMAINS: [&str; 2] = ["appdb.egi.eu", "registry.egi.eu"];

/// Prefix stripped from raw image names.
const IMAGE_NAME_PREFIX: &str = "Image for ";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Reasons a document is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// The payload is not a decodable document.
    #[error("document parse error: {0}")]
    Parse(String),
    /// A required section or field is missing or malformed.
    #[error("document validation error: {0}")]
    Validation(String),
    /// The validity window has elapsed; carries the expiry instant.
    #[error("document was valid until {0}")]
    Stale(String),
}

// ============================================================================
// SECTION: Options
// ============================================================================

/// Normalizer behavior switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizerOptions {
    /// Reject documents past their validity window.
    pub check_validity: bool,
    /// Marketplace hosts whose images are enriched.
    pub catalog_domains: Vec<String>,
}

impl Default for NormalizerOptions {
    fn default() -> Self {
        Self {
            check_validity: true,
            catalog_domains: DEFAULT_CATALOG_DOMAINS.iter().map(ToString::to_string).collect(),
        }
    }
}

// ============================================================================
// SECTION: Normalizer
// ============================================================================

/// Builds [`Site`] aggregates from site documents.
#[derive(Clone)]
pub struct Normalizer {
    /// Behavior switches.
    options: NormalizerOptions,
    /// Image catalog strategy.
    enricher: Arc<dyn ImageEnricher>,
    /// Topology lookup.
    hostnames: Arc<dyn HostnameResolver>,
}

impl Normalizer {
    /// Creates a normalizer over the given collaborators.
    #[must_use]
    pub fn new(
        options: NormalizerOptions,
        enricher: Arc<dyn ImageEnricher>,
        hostnames: Arc<dyn HostnameResolver>,
    ) -> Self {
        Self {
            options,
            enricher,
            hostnames,
        }
    }

    /// Returns the configured options.
    #[must_use]
    pub const fn options(&self) -> &NormalizerOptions {
        &self.options
    }

    /// Decodes and normalizes a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::Parse`] for oversized or undecodable input,
    /// otherwise the errors of [`Normalizer::normalize`].
    pub async fn normalize_bytes(&self, bytes: &[u8]) -> Result<Site, NormalizeError> {
        if bytes.len() > MAX_DOCUMENT_BYTES {
            return Err(NormalizeError::Parse(format!(
                "document exceeds size limit: {} bytes (max {MAX_DOCUMENT_BYTES})",
                bytes.len()
            )));
        }
        let document =
            GlueDocument::from_slice(bytes).map_err(|err| NormalizeError::Parse(err.to_string()))?;
        self.normalize(&document).await
    }

    /// Normalizes a decoded document against the current time.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::Validation`] when a required section is
    /// absent and [`NormalizeError::Stale`] when freshness checking rejects it.
    pub async fn normalize(&self, document: &GlueDocument) -> Result<Site, NormalizeError> {
        self.normalize_at(document, OffsetDateTime::now_utc()).await
    }

    /// Normalizes a decoded document, evaluating freshness at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::Validation`] when a required section is
    /// absent and [`NormalizeError::Stale`] when freshness checking rejects it.
    pub async fn normalize_at(
        &self,
        document: &GlueDocument,
        now: OffsetDateTime,
    ) -> Result<Site, NormalizeError> {
        let service = required_first(document.services.as_ref(), "CloudComputingService")?;
        let endpoint = required_first(document.endpoints.as_ref(), "CloudComputingEndpoint")?;
        let share_records = required(document.shares.as_ref(), "Share")?;
        let policies = required(document.policies.as_ref(), "MappingPolicy")?;

        if self.options.check_validity {
            check_freshness(service, now)?;
        }

        let name = service.associations.admin_domain.first().cloned().ok_or_else(|| {
            NormalizeError::Validation("service has no AdminDomain association".to_string())
        })?;
        let url = endpoint.url.clone().ok_or_else(|| {
            NormalizeError::Validation("endpoint has no URL".to_string())
        })?;
        let external_id = service
            .other_info
            .get(EXTERNAL_ID_KEY)
            .and_then(scalar_to_string)
            .ok_or_else(|| {
                NormalizeError::Validation(format!("service OtherInfo has no {EXTERNAL_ID_KEY}"))
            })?;

        let mut vo_by_share: HashMap<&str, &str> = HashMap::new();
        for policy in policies.iter() {
            let Some(vo) = policy.associations.policy_user_domain.first() else {
                continue;
            };
            for share_id in policy.associations.share.iter() {
                vo_by_share.entry(share_id.as_str()).or_insert(vo.as_str());
            }
        }
        let images_by_share = index_by_share(&document.images, |image| &image.associations.share);
        let instances_by_share =
            index_by_share(&document.instance_types, |instance| &instance.associations.share);
        let mut accelerators: HashMap<&str, &AcceleratorRecord> = HashMap::new();
        for accelerator in document.accelerators.iter() {
            accelerators.entry(accelerator.id.as_str()).or_insert(accelerator);
        }

        let mut enrichments: HashMap<usize, Enrichment> = HashMap::new();
        let mut shares = Vec::with_capacity(share_records.0.len());
        for share_record in share_records.iter() {
            let Some(vo) = vo_by_share.get(share_record.id.as_str()).copied() else {
                warn!(site = %name, share = %share_record.id, "share has no mapping policy; skipping");
                continue;
            };
            let mut images = Vec::new();
            for &index in images_by_share.get(share_record.id.as_str()).into_iter().flatten() {
                let record = &document.images.0[index];
                if !enrichments.contains_key(&index) {
                    let enrichment = self.enrichment_for(record).await;
                    enrichments.insert(index, enrichment);
                }
                let enrichment = enrichments.get(&index).cloned().unwrap_or_default();
                images.push(build_image(record, enrichment, vo));
            }
            let instance_types = instances_by_share
                .get(share_record.id.as_str())
                .into_iter()
                .flatten()
                .map(|&index| build_instance_type(&document.instance_types.0[index], &accelerators))
                .collect();
            shares.push(Share {
                name: share_record.name.clone(),
                vo: vo.to_string(),
                project_id: share_record.project_id.clone(),
                images,
                instance_types,
            });
        }

        let hostname = self.hostnames.hostname_for(&external_id).await;
        debug!(site = %name, external_id = %external_id, shares = shares.len(), "normalized site");
        Ok(Site {
            name,
            url,
            hostname,
            external_id,
            shares,
        })
    }

    /// Returns true when the URI points into a recognized image catalog.
    #[must_use]
    pub fn is_catalog_uri(&self, uri: &str) -> bool {
        uri_in_domains(uri, &self.options.catalog_domains)
    }

    /// Consults the enricher for catalog images only.
    async fn enrichment_for(&self, record: &ImageRecord) -> Enrichment {
        match record.marketplace_url.as_deref() {
            Some(uri) if self.is_catalog_uri(uri) => self.enricher.enrich(record).await,
            _ => Enrichment::default(),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns a required section, rejecting an absent one.
fn required<'a, T>(
    section: Option<&'a OneOrMany<T>>,
    label: &str,
) -> Result<&'a OneOrMany<T>, NormalizeError> {
    section.ok_or_else(|| NormalizeError::Validation(format!("missing {label} section")))
}

/// Returns the first record of a required section.
fn required_first<'a, T>(
    section: Option<&'a OneOrMany<T>>,
    label: &str,
) -> Result<&'a T, NormalizeError> {
    required(section, label)?
        .first()
        .ok_or_else(|| NormalizeError::Validation(format!("empty {label} section")))
}

/// Maps share identifiers to record positions, in document order.
fn index_by_share<'a, T, F>(records: &'a OneOrMany<T>, shares_of: F) -> HashMap<&'a str, Vec<usize>>
where
    F: Fn(&'a T) -> &'a OneOrMany<String>,
{
    let mut index: HashMap<&str, Vec<usize>> = HashMap::new();
    for (position, record) in records.iter().enumerate() {
        let mut seen = HashSet::new();
        for share_id in shares_of(record).iter() {
            if seen.insert(share_id.as_str()) {
                index.entry(share_id.as_str()).or_default().push(position);
            }
        }
    }
    index
}

/// Returns true when the host of a marketplace URI or OCI reference is one
/// of `domains` or a subdomain of one.
#[must_use]
pub fn uri_in_domains<S: AsRef<str>>(uri: &str, domains: &[S]) -> bool {
    marketplace_host(uri).is_some_and(|host| {
        domains.iter().map(AsRef::as_ref).any(|domain| {
            host == domain || host.strip_suffix(domain).is_some_and(|rest| rest.ends_with('.'))
        })
    })
}

/// Extracts the host of a marketplace URI or OCI reference.
fn marketplace_host(uri: &str) -> Option<String> {
    if let Ok(parsed) = Url::parse(uri)
        && let Some(host) = parsed.host_str()
    {
        return Some(host.to_ascii_lowercase());
    }
    let authority = uri.split('/').next()?;
    let host = authority.split(':').next()?.trim();
    (!host.is_empty()).then(|| host.to_ascii_lowercase())
}

/// Strips the "Image for " prefix and any bracketed suffix from a raw name.
#[must_use]
pub fn clean_image_name(raw: &str) -> String {
    let name = raw.strip_prefix(IMAGE_NAME_PREFIX).unwrap_or(raw);
    name.split('[').next().unwrap_or(name).trim().to_string()
}

/// Builds an image value, preferring catalog metadata over raw fields.
fn build_image(record: &ImageRecord, enrichment: Enrichment, vo: &str) -> Image {
    let name = if enrichment.name.is_empty() {
        clean_image_name(&record.name)
    } else {
        enrichment.name
    };
    let version = if enrichment.version.is_empty() {
        record.version.clone().unwrap_or_default()
    } else {
        enrichment.version
    };
    Image {
        id: record.id.clone(),
        name,
        catalog_id: enrichment.catalog_id,
        marketplace_uri: record.marketplace_url.clone().unwrap_or_default(),
        version,
        vo: vo.to_string(),
    }
}

/// Builds an instance type, merging its referenced accelerator if present.
fn build_instance_type(
    record: &InstanceTypeRecord,
    accelerators: &HashMap<&str, &AcceleratorRecord>,
) -> InstanceType {
    let accelerator = record.associations.accelerator.first().and_then(|id| {
        let found = accelerators.get(id.as_str()).copied();
        if found.is_none() {
            warn!(instance_type = %record.name, accelerator = %id, "unknown accelerator reference");
        }
        found
    });
    InstanceType {
        name: record.name.clone(),
        accelerator: accelerator.map(|acc| Accelerator {
            id: acc.id.clone(),
            name: acc.name.clone(),
            accelerator_type: acc.accelerator_type.clone(),
            vendor: acc.vendor.clone(),
            model: acc.model.clone(),
            number: acc.number,
            memory: acc.memory,
        }),
    }
}
