// crates/fedcloud-info-registry/tests/common/mod.rs
// ============================================================================
// Module: Registry Test Helpers
// Description: Shared normalizer and document builders.
// Purpose: Produce valid and invalid site documents for registry tests.
// Dependencies: fedcloud-info-core, serde_json
// ============================================================================

//! ## Overview
//! Documents are derived from the BIFI fixture owned by the core crate by
//! rewriting the admin domain and the external id.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(clippy::unwrap_used, reason = "Test helpers use unwrap on deterministic fixtures.")]

use std::sync::Arc;

use fedcloud_info_core::NoEnrichment;
use fedcloud_info_core::NoHostnames;
use fedcloud_info_core::Normalizer;
use fedcloud_info_core::NormalizerOptions;
use serde_json::Value;
use serde_json::json;

/// BIFI site document.
pub const BIFI: &[u8] = include_bytes!("../../../fedcloud-info-core/tests/fixtures/site_bifi.json");

/// Bytes that never normalize.
pub const MALFORMED: &[u8] = b"{\"CloudComputingService\": [";

/// Normalizer without validity checks or external lookups.
pub fn normalizer() -> Normalizer {
    let options = NormalizerOptions {
        check_validity: false,
        ..NormalizerOptions::default()
    };
    Normalizer::new(options, Arc::new(NoEnrichment), Arc::new(NoHostnames))
}

/// Returns the BIFI document renamed to `name` with external id `external_id`.
pub fn site_document(name: &str, external_id: &str) -> Vec<u8> {
    let mut document: Value = serde_json::from_slice(BIFI).unwrap();
    let service = &mut document["CloudComputingService"][0];
    service["Associations"]["AdminDomain"] = json!([name]);
    service["OtherInfo"]["gocdb_id"] = json!(external_id);
    serde_json::to_vec(&document).unwrap()
}
