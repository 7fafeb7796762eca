// crates/fedcloud-info-registry/tests/poll_registry.rs
// ============================================================================
// Module: Poll Registry Integration Tests
// Description: Listing passes over in-memory and HTTP object stores.
// Purpose: Validate change detection, eviction, and failure handling.
// Dependencies: fedcloud-info-catalogs, fedcloud-info-registry, tiny_http, tokio
// ============================================================================

//! ## Overview
//! [`MemoryStore`] scripts listings and counts fetches so tests can assert
//! that unchanged documents are not downloaded again. One test drives the
//! HTTP listing store against a tiny_http stub.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions use unwrap for clarity."
)]

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use fedcloud_info_catalogs::HttpFetcher;
use fedcloud_info_registry::HttpListingStore;
use fedcloud_info_registry::ObjectEntry;
use fedcloud_info_registry::ObjectStore;
use fedcloud_info_registry::ObjectStoreError;
use fedcloud_info_registry::PollRegistry;
use fedcloud_info_registry::RegistryError;
use fedcloud_info_registry::SiteRegistry;
use tiny_http::Response;
use tiny_http::Server;
use tiny_http::StatusCode;

use crate::common::BIFI;
use crate::common::MALFORMED;
use crate::common::normalizer;
use crate::common::site_document;

// ============================================================================
// SECTION: Memory Store
// ============================================================================

/// Scripted object store.
#[derive(Default)]
struct MemoryStore {
    /// Documents by name with their modification token.
    objects: Mutex<BTreeMap<String, (String, Vec<u8>)>>,
    /// Fail the next listings.
    fail_listing: AtomicBool,
    /// Number of fetches so far.
    fetches: AtomicUsize,
}

impl MemoryStore {
    fn put(&self, name: &str, token: &str, bytes: &[u8]) {
        self.objects.lock().unwrap().insert(name.to_string(), (token.to_string(), bytes.to_vec()));
    }

    fn remove(&self, name: &str) {
        self.objects.lock().unwrap().remove(name);
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list(&self) -> Result<Vec<ObjectEntry>, ObjectStoreError> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Backend("listing unavailable".to_string()));
        }
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .map(|(name, (token, _))| ObjectEntry {
                name: name.clone(),
                last_modified: token.clone(),
            })
            .collect())
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>, ObjectStoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.objects
            .lock()
            .unwrap()
            .get(name)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| ObjectStoreError::Backend(format!("no such object: {name}")))
    }
}

fn registry(store: &Arc<MemoryStore>) -> PollRegistry {
    PollRegistry::new(
        Arc::clone(store) as Arc<dyn ObjectStore>,
        normalizer(),
        Duration::from_secs(600),
    )
}

fn names(registry: &PollRegistry) -> Vec<String> {
    registry.snapshot().all_sites(None).iter().map(|site| site.name.clone()).collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn unchanged_documents_are_not_fetched_again() {
    let store = Arc::new(MemoryStore::default());
    store.put("bifi.json", "100.0", BIFI);
    store.put("ifca.json", "100.0", &site_document("IFCA-LCG2", "7513G0"));
    let registry = registry(&store);

    assert_eq!(registry.refresh().await.unwrap(), 2);
    assert_eq!(store.fetches(), 2);
    assert_eq!(registry.refresh().await.unwrap(), 2);
    assert_eq!(store.fetches(), 2);

    store.put("ifca.json", "200.0", &site_document("IFCA", "7513G0"));
    registry.refresh().await.unwrap();
    assert_eq!(store.fetches(), 3);
    assert_eq!(names(&registry), vec!["BIFI", "IFCA"]);
}

#[tokio::test]
async fn documents_without_tokens_are_always_fetched() {
    let store = Arc::new(MemoryStore::default());
    store.put("bifi.json", "", BIFI);
    let registry = registry(&store);
    registry.refresh().await.unwrap();
    registry.refresh().await.unwrap();
    assert_eq!(store.fetches(), 2);
}

#[tokio::test]
async fn unlisted_and_broken_documents_are_evicted() {
    let store = Arc::new(MemoryStore::default());
    store.put("bifi.json", "1", BIFI);
    store.put("ifca.json", "1", &site_document("IFCA-LCG2", "7513G0"));
    let registry = registry(&store);
    registry.refresh().await.unwrap();

    store.remove("bifi.json");
    store.put("ifca.json", "2", MALFORMED);
    assert_eq!(registry.refresh().await.unwrap(), 0);
    assert!(registry.snapshot().is_empty());
}

#[tokio::test]
async fn listing_failure_keeps_the_previous_snapshot() {
    let store = Arc::new(MemoryStore::default());
    store.put("bifi.json", "1", BIFI);
    let registry = registry(&store);
    registry.refresh().await.unwrap();

    store.fail_listing.store(true, Ordering::SeqCst);
    let err = registry.refresh().await.unwrap_err();
    assert!(matches!(err, RegistryError::Store(_)));
    assert_eq!(names(&registry), vec!["BIFI"]);

    store.fail_listing.store(false, Ordering::SeqCst);
    registry.refresh().await.unwrap();
    assert_eq!(store.fetches(), 1);
}

#[tokio::test]
async fn http_listing_store_feeds_the_registry() {
    let server = Server::http("127.0.0.1:0").unwrap();
    let base = format!("http://{}/site-info/", server.server_addr().to_ip().unwrap());
    let handle = thread::spawn(move || {
        for _ in 0 .. 2 {
            let request = server.recv().unwrap();
            let (status, body) = match request.url() {
                "/site-info/" => {
                    (200, br#"[{"name": "bifi.json", "last_modified": 1.5}]"#.to_vec())
                }
                "/site-info/bifi.json" => (200, BIFI.to_vec()),
                _ => (404, Vec::new()),
            };
            request.respond(Response::from_data(body).with_status_code(StatusCode(status))).unwrap();
        }
    });

    let fetcher = HttpFetcher::new(Duration::from_secs(5), "fedcloud-info-tests").unwrap();
    let store = HttpListingStore::new(fetcher, &base).unwrap();
    let registry = PollRegistry::new(Arc::new(store), normalizer(), Duration::from_secs(600));
    assert_eq!(registry.refresh().await.unwrap(), 1);
    assert_eq!(names(&registry), vec!["BIFI"]);
    handle.join().unwrap();
}
