// crates/fedcloud-info-config/tests/load_validation.rs
// ============================================================================
// Module: Config File Loading Tests
// Description: Load deployment files from disk and check the resulting config.
// Purpose: Cover file-level limits and section rules applied at load time.
// Dependencies: fedcloud-info-config, tempfile
// ============================================================================

//! ## Overview
//! Each test writes a deployment file into a temp file and loads it through
//! [`FedCloudInfoConfig::load`], which applies environment overrides and
//! validation on top of parsing.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::use_debug,
    reason = "Test-only assertions use unwrap and panic for clarity."
)]

use std::io::Write;
use std::path::Path;

use fedcloud_info_config::ConfigError;
use fedcloud_info_config::FedCloudInfoConfig;
use fedcloud_info_config::ImageStrategy;
use fedcloud_info_config::PollProvider;
use fedcloud_info_config::SitesBackend;
use tempfile::NamedTempFile;

/// Writes `content` to a fresh temp file.
fn deployment_file(content: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content).unwrap();
    file
}

/// Loads `content` and returns the invalid-config message.
fn rejection(content: &[u8]) -> String {
    let file = deployment_file(content);
    match FedCloudInfoConfig::load(Some(file.path())) {
        Err(ConfigError::Invalid(message)) => message,
        other => panic!("expected invalid config, got {other:?}"),
    }
}

#[test]
fn directory_backend_file_loads() {
    let file = deployment_file(b"[sites.directory]\npath = \"/srv/cloud-info\"\n");
    let config = FedCloudInfoConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.sites.backend, SitesBackend::Directory);
    assert_eq!(config.sites.directory.path, Path::new("/srv/cloud-info"));
}

#[test]
fn s3_poll_deployment_loads_with_file_token() {
    let file = deployment_file(
        br#"
[sites]
backend = "poll"

[sites.poll]
provider = "s3"
bucket = "cloud-info"
endpoint = "http://minio.local:9000"
force_path_style = true

[images]
strategy = "remote"
catalog_url = "https://catalog.example/images.json"

[vos]
url = "https://operations-portal.example/api/vo-list/json"
token = "from-file"
"#,
    );
    let config = FedCloudInfoConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.sites.poll.provider, PollProvider::S3);
    assert_eq!(config.images.strategy, ImageStrategy::Remote);
    assert_eq!(config.vos.token.as_deref(), Some("from-file"));
}

#[test]
fn poll_backend_without_source_is_rejected_on_load() {
    let message = rejection(b"[sites]\nbackend = \"poll\"\n[sites.poll]\nprovider = \"s3\"\n");
    assert!(message.contains("sites.poll.bucket is required"), "{message}");
}

#[test]
fn non_http_catalog_url_is_rejected_on_load() {
    let message = rejection(
        b"[images]\nstrategy = \"remote\"\ncatalog_url = \"file:///srv/images.json\"\n",
    );
    assert!(message.contains("images.catalog_url must be an http(s) url"), "{message}");
}

#[test]
fn overlong_sites_directory_component_is_rejected() {
    let content = format!("[sites.directory]\npath = \"/srv/{}\"\n", "d".repeat(300));
    let message = rejection(content.as_bytes());
    assert!(message.contains("path component too long"), "{message}");
}

#[test]
fn padded_deployment_beyond_limit_is_rejected() {
    let mut content = b"[sites.directory]\npath = \"/srv/cloud-info\"\n".to_vec();
    let padding = b"# retired site entry kept for reference\n";
    while content.len() <= 1024 * 1024 {
        content.extend_from_slice(padding);
    }
    assert_eq!(rejection(&content), "config file exceeds size limit");
}

#[test]
fn missing_explicit_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fedcloud-info.toml");
    let result = FedCloudInfoConfig::load_or_default(Some(&path));
    assert!(matches!(result, Err(ConfigError::Io(_))), "{result:?}");
}
