// crates/fedcloud-info-catalogs/tests/remote_catalogs.rs
// ============================================================================
// Module: Remote Catalog Integration Tests
// Description: Catalog clients against tiny_http stub servers.
// Purpose: Validate memoization and degradation of remote lookups.
// Dependencies: fedcloud-info-catalogs, fedcloud-info-core, tiny_http, tokio
// ============================================================================

//! ## Overview
//! Each test starts a local stub standing in for the VO portal, the topology
//! registry, or the image catalog, and asserts on both the answers and the
//! number of requests the client made.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions use unwrap for clarity."
)]

mod common;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use fedcloud_info_catalogs::GocdbResolver;
use fedcloud_info_catalogs::HttpFetcher;
use fedcloud_info_catalogs::OpsPortalClient;
use fedcloud_info_catalogs::RemoteCatalogEnricher;
use fedcloud_info_catalogs::VoCatalog;
use fedcloud_info_catalogs::VoFetcher;
use fedcloud_info_core::HostnameResolver;
use fedcloud_info_core::ImageEnricher;
use fedcloud_info_core::ImageRecord;
use serde_json::json;

use crate::common::StubServer;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// GOCDB payload with one endpoint.
const GOCDB: &[u8] = include_bytes!("fixtures/gocdb_services.xml");
/// Operations portal payload with two VOs.
const VOS: &[u8] = include_bytes!("fixtures/ops_portal_vos.json");
/// Image catalog table.
const IMAGES: &[u8] = include_bytes!("fixtures/image_catalog.json");

/// Marketplace URI present in the image catalog fixture.
const KNOWN_URI: &str =
    "https://appdb.egi.eu/store/vo/image/63fcad1c-b737-5091-9668-1342b6d4f84c:15705/";

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(Duration::from_secs(5), "fedcloud-info-tests").unwrap()
}

fn image(value: serde_json::Value) -> ImageRecord {
    serde_json::from_value(value).unwrap()
}

// ============================================================================
// SECTION: VO Portal
// ============================================================================

#[tokio::test]
async fn vo_portal_sends_token_and_parses_list() {
    let server = StubServer::start(|_| (200, VOS.to_vec()));
    let client = OpsPortalClient::new(fetcher(), &server.url("/api/vo-list/json"), Some("secret"))
        .unwrap();
    let vos = client.fetch_vos().await.unwrap();
    let names: Vec<&str> = vos.iter().map(|vo| vo.name.as_str()).collect();
    assert_eq!(names, vec!["alice", "vo.epos-eric.eu"]);
    assert_eq!(server.requests()[0].api_key.as_deref(), Some("secret"));
}

#[tokio::test]
async fn vo_catalog_degrades_to_empty_on_forbidden() {
    let server = StubServer::start(|_| (403, b"forbidden".to_vec()));
    let client = OpsPortalClient::new(fetcher(), &server.url("/vos"), None).unwrap();
    let catalog = VoCatalog::new(Arc::new(client), Duration::from_secs(3600));
    assert!(catalog.all_vos().await.is_empty());
}

// ============================================================================
// SECTION: Topology
// ============================================================================

#[tokio::test]
async fn topology_is_fetched_once_in_bulk() {
    let server = StubServer::start(|_| (200, GOCDB.to_vec()));
    let resolver = GocdbResolver::new(fetcher(), server.base(), "org.openstack.nova").unwrap();
    assert_eq!(resolver.hostname_for("7513G0").await, "api.cloud.ifca.es");
    assert_eq!(resolver.hostname_for("unknown").await, "");

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].url,
        "/gocdbpi/public/?method=get_service&service_type=org.openstack.nova"
    );
}

#[tokio::test]
async fn topology_failure_is_memoized_as_empty() {
    let server = StubServer::start(|_| (500, Vec::new()));
    let resolver = GocdbResolver::new(fetcher(), &server.url("/"), "org.openstack.nova").unwrap();
    assert_eq!(resolver.hostname_for("7513G0").await, "");
    assert_eq!(resolver.hostname_for("7513G0").await, "");
    assert_eq!(server.requests().len(), 1);
}

// ============================================================================
// SECTION: Image Catalog
// ============================================================================

#[tokio::test]
async fn remote_catalog_is_memoized_and_uses_base_uri_fallback() {
    let server = StubServer::start(|_| (200, IMAGES.to_vec()));
    let enricher = RemoteCatalogEnricher::new(fetcher(), &server.url("/images.json")).unwrap();

    let direct = enricher.enrich(&image(json!({"ID": "a", "MarketplaceURL": KNOWN_URI}))).await;
    assert_eq!(direct.catalog_id, "egi.small.ubuntu.16.04.for.monitoring");

    let fallback = enricher
        .enrich(&image(json!({
            "ID": "b",
            "MarketplaceURL": "https://appdb.egi.eu/store/vo/image/other:1/",
            "OtherInfo": {"base_mpuri": KNOWN_URI}
        })))
        .await;
    assert_eq!(fallback.version, "2024.11.18");

    let missing =
        enricher.enrich(&image(json!({"ID": "c", "MarketplaceURL": "https://appdb.egi.eu/x"}))).await;
    assert!(missing.is_empty());
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn unavailable_catalog_is_not_refetched_per_image() {
    let server = StubServer::start(|_| (503, Vec::new()));
    let enricher = RemoteCatalogEnricher::new(fetcher(), &server.url("/images.json")).unwrap();
    for index in 0 .. 25 {
        let record = image(json!({"ID": format!("img-{index}"), "MarketplaceURL": KNOWN_URI}));
        assert!(enricher.enrich(&record).await.is_empty());
    }
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn catalog_is_retried_once_the_delay_elapses() {
    let healthy = Arc::new(AtomicBool::new(false));
    let server = {
        let healthy = Arc::clone(&healthy);
        StubServer::start(move |_| {
            if healthy.load(Ordering::SeqCst) { (200, IMAGES.to_vec()) } else { (503, Vec::new()) }
        })
    };
    let enricher = RemoteCatalogEnricher::new(fetcher(), &server.url("/images.json"))
        .unwrap()
        .with_retry_delay(Duration::ZERO);
    let record = image(json!({"ID": "a", "MarketplaceURL": KNOWN_URI}));
    assert!(enricher.enrich(&record).await.is_empty());

    healthy.store(true, Ordering::SeqCst);
    let recovered = enricher.enrich(&record).await;
    assert_eq!(recovered.catalog_id, "egi.small.ubuntu.16.04.for.monitoring");
    assert_eq!(enricher.enrich(&record).await, recovered);
    assert_eq!(server.requests().len(), 2);
}
