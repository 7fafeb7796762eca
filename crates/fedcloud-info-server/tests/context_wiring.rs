// crates/fedcloud-info-server/tests/context_wiring.rs
// ============================================================================
// Module: Context Wiring Integration Tests
// Description: Configuration to running collaborators.
// Purpose: Validate backend and strategy selection from TOML.
// Dependencies: fedcloud-info-config, fedcloud-info-server, tempfile, tokio
// ============================================================================

//! ## Overview
//! Builds contexts from configuration text and checks what they serve.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::use_debug,
    reason = "Test-only assertions use unwrap for clarity."
)]

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use fedcloud_info_catalogs::HttpFetcher;
use fedcloud_info_config::FedCloudInfoConfig;
use fedcloud_info_server::AppContext;
use fedcloud_info_server::Server;
use fedcloud_info_server::build_normalizer;
use tempfile::TempDir;

/// BIFI site document.
const BIFI: &[u8] = include_bytes!("../../fedcloud-info-core/tests/fixtures/site_bifi.json");

fn directory_config(dir: &TempDir, extra: &str) -> FedCloudInfoConfig {
    let text = format!(
        "[normalizer]\ncheck_validity = false\n\n[sites]\nbackend = \"directory\"\n\n\
         [sites.directory]\npath = {:?}\n{extra}",
        dir.path().display().to_string()
    );
    FedCloudInfoConfig::from_toml_str(&text).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn directory_backend_serves_loaded_documents() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bifi.json"), BIFI).unwrap();
    let config = directory_config(&dir, "");
    let context = AppContext::from_config(&config).await.unwrap();
    assert!(context.sites.snapshot().is_empty());

    let task = tokio::spawn(Arc::clone(&context.sites).start());
    let mut attempts = 0;
    while context.sites.snapshot().is_empty() {
        assert!(attempts < 100, "registry never loaded the directory");
        attempts += 1;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(context.sites.snapshot().site("BIFI").unwrap().external_id, "12249G0");
    task.abort();
}

#[tokio::test]
async fn missing_vo_portal_yields_empty_catalog() {
    let dir = TempDir::new().unwrap();
    let context = AppContext::from_config(&directory_config(&dir, "")).await.unwrap();
    assert!(context.vos.all_vos().await.is_empty());
}

#[tokio::test]
async fn static_strategy_with_missing_table_still_builds() {
    let dir = TempDir::new().unwrap();
    let extra = format!(
        "\n[images]\nstrategy = \"static\"\ntable_path = {:?}\n",
        dir.path().join("absent.json").display().to_string()
    );
    let config = directory_config(&dir, &extra);
    let fetcher = HttpFetcher::new(Duration::from_secs(1), "fedcloud-info-tests").unwrap();
    let normalizer = build_normalizer(&config, &fetcher).unwrap();
    let site = normalizer.normalize_bytes(BIFI).await.unwrap();
    assert!(site.images().all(|image| image.catalog_id.is_empty()));
}

#[tokio::test]
async fn server_rejects_invalid_bind_address() {
    let dir = TempDir::new().unwrap();
    let mut config = directory_config(&dir, "");
    config.server.bind = "not-an-address".to_string();
    assert!(Server::from_config(&config).await.is_err());
}
