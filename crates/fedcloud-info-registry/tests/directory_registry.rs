// crates/fedcloud-info-registry/tests/directory_registry.rs
// ============================================================================
// Module: Directory Registry Integration Tests
// Description: Scans and change reconciliation over temporary directories.
// Purpose: Validate load, eviction, and collision behavior on real files.
// Dependencies: fedcloud-info-registry, tempfile, tokio
// ============================================================================

//! ## Overview
//! Each test builds a site tree in a temporary directory and drives the
//! registry through `load_all`, `apply_changes`, or the watcher task.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions use unwrap for clarity."
)]

mod common;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use fedcloud_info_registry::DirectoryRegistry;
use fedcloud_info_registry::SiteRegistry;
use tempfile::TempDir;

use crate::common::BIFI;
use crate::common::MALFORMED;
use crate::common::normalizer;
use crate::common::site_document;

/// Temporary tree with its canonical root.
fn tree() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    (dir, root)
}

fn names(registry: &DirectoryRegistry) -> Vec<String> {
    registry.snapshot().all_sites(None).iter().map(|site| site.name.clone()).collect()
}

/// Polls until the registry lists `expected`, rewriting `write` periodically.
async fn wait_for(
    registry: &DirectoryRegistry,
    expected: &[&str],
    write: Option<(&PathBuf, &[u8])>,
) {
    let mut attempts = 0;
    while names(registry) != expected {
        if let Some((path, bytes)) = write
            && attempts % 20 == 0
        {
            fs::write(path, bytes).unwrap();
        }
        assert!(attempts < 200, "registry never listed {expected:?}");
        attempts += 1;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn malformed_documents_are_skipped() {
    let (_dir, root) = tree();
    fs::write(root.join("bifi.json"), BIFI).unwrap();
    fs::create_dir(root.join("nested")).unwrap();
    fs::write(root.join("nested/ifca.json"), site_document("IFCA-LCG2", "7513G0")).unwrap();
    fs::write(root.join("broken.json"), MALFORMED).unwrap();
    fs::write(root.join("notes.txt"), b"not a document").unwrap();

    let registry = DirectoryRegistry::new(&root, normalizer());
    assert_eq!(registry.load_all().await.unwrap(), 2);
    assert_eq!(names(&registry), vec!["BIFI", "IFCA-LCG2"]);
}

#[tokio::test]
async fn missing_root_publishes_empty_snapshot() {
    let (_dir, root) = tree();
    let registry = DirectoryRegistry::new(root.join("absent"), normalizer());
    assert_eq!(registry.load_all().await.unwrap(), 0);
    assert!(registry.snapshot().is_empty());
}

#[tokio::test]
async fn name_collisions_are_disambiguated_by_external_id() {
    let (_dir, root) = tree();
    fs::write(root.join("a.json"), BIFI).unwrap();
    fs::write(root.join("b.json"), site_document("BIFI", "999G0")).unwrap();
    fs::write(root.join("c.json"), BIFI).unwrap();

    let registry = DirectoryRegistry::new(&root, normalizer());
    registry.load_all().await.unwrap();
    assert_eq!(names(&registry), vec!["BIFI", "BIFI-999G0"]);
    assert_eq!(registry.snapshot().site("BIFI-999G0").unwrap().external_id, "999G0");
}

#[tokio::test]
async fn deleted_and_corrupted_documents_are_evicted() {
    let (_dir, root) = tree();
    let bifi = root.join("bifi.json");
    let ifca = root.join("ifca.json");
    fs::write(&bifi, BIFI).unwrap();
    fs::write(&ifca, site_document("IFCA-LCG2", "7513G0")).unwrap();
    let registry = DirectoryRegistry::new(&root, normalizer());
    registry.load_all().await.unwrap();

    fs::remove_file(&bifi).unwrap();
    assert_eq!(registry.apply_changes(&[bifi]).await, 1);
    assert_eq!(names(&registry), vec!["IFCA-LCG2"]);

    fs::write(&ifca, MALFORMED).unwrap();
    assert_eq!(registry.apply_changes(&[ifca]).await, 0);
}

#[tokio::test]
async fn changed_documents_replace_previous_sites() {
    let (_dir, root) = tree();
    let path = root.join("site.json");
    fs::write(&path, BIFI).unwrap();
    let registry = DirectoryRegistry::new(&root, normalizer());
    registry.load_all().await.unwrap();

    fs::write(&path, site_document("BIFI-NEW", "12249G0")).unwrap();
    registry.apply_changes(&[path]).await;
    assert_eq!(names(&registry), vec!["BIFI-NEW"]);
}

#[tokio::test]
async fn removed_directories_evict_their_subtree() {
    let (_dir, root) = tree();
    let nested = root.join("nested");
    fs::create_dir_all(nested.join("deeper")).unwrap();
    fs::write(root.join("bifi.json"), BIFI).unwrap();
    fs::write(nested.join("ifca.json"), site_document("IFCA-LCG2", "7513G0")).unwrap();
    fs::write(nested.join("deeper/cesga.json"), site_document("CESGA", "1G0")).unwrap();
    let registry = DirectoryRegistry::new(&root, normalizer());
    assert_eq!(registry.load_all().await.unwrap(), 3);

    fs::remove_dir_all(&nested).unwrap();
    assert_eq!(registry.apply_changes(&[nested]).await, 1);
    assert_eq!(names(&registry), vec!["BIFI"]);
}

#[tokio::test]
async fn new_directories_are_scanned() {
    let (_dir, root) = tree();
    let registry = DirectoryRegistry::new(&root, normalizer());
    registry.load_all().await.unwrap();

    let nested = root.join("nested");
    fs::create_dir(&nested).unwrap();
    fs::write(nested.join("bifi.json"), BIFI).unwrap();
    assert_eq!(registry.apply_changes(&[nested]).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn watcher_picks_up_new_documents() {
    let (_dir, root) = tree();
    let registry = Arc::new(DirectoryRegistry::new(&root, normalizer()));
    let task = tokio::spawn(Arc::clone(&registry).start());

    let mut attempts = 0;
    while registry.snapshot().is_empty() {
        if attempts % 20 == 0 {
            fs::write(root.join("bifi.json"), BIFI).unwrap();
        }
        assert!(attempts < 200, "watcher never published the new document");
        attempts += 1;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(names(&registry), vec!["BIFI"]);
    task.abort();
}

#[tokio::test]
async fn one_batch_mixes_vanished_directories_and_new_documents() {
    let (_dir, root) = tree();
    let nested = root.join("nested");
    fs::create_dir(&nested).unwrap();
    fs::write(nested.join("ifca.json"), site_document("IFCA-LCG2", "7513G0")).unwrap();
    let registry = DirectoryRegistry::new(&root, normalizer());
    registry.load_all().await.unwrap();

    fs::remove_dir_all(&nested).unwrap();
    let bifi = root.join("bifi.json");
    fs::write(&bifi, BIFI).unwrap();
    assert_eq!(registry.apply_changes(&[nested, root.join("gone"), bifi]).await, 1);
    assert_eq!(names(&registry), vec!["BIFI"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn watcher_keeps_running_after_subtree_removal() {
    let (_dir, root) = tree();
    let nested = root.join("nested");
    fs::create_dir(&nested).unwrap();
    fs::write(nested.join("ifca.json"), site_document("IFCA-LCG2", "7513G0")).unwrap();
    let registry = Arc::new(DirectoryRegistry::new(&root, normalizer()));
    let task = tokio::spawn(Arc::clone(&registry).start());

    wait_for(&registry, &["IFCA-LCG2"], None).await;
    let cesga_path = root.join("cesga.json");
    let cesga = site_document("CESGA", "1G0");
    wait_for(&registry, &["CESGA", "IFCA-LCG2"], Some((&cesga_path, cesga.as_slice()))).await;

    fs::remove_dir_all(&nested).unwrap();
    wait_for(&registry, &["CESGA"], None).await;
    let bifi_path = root.join("bifi.json");
    wait_for(&registry, &["BIFI", "CESGA"], Some((&bifi_path, BIFI))).await;
    assert!(!task.is_finished());
    task.abort();
}
