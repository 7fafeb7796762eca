// crates/fedcloud-info-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Argument parsing, bounded reads, and config summaries.
// Purpose: Pin the command surface and input limits of the binary.
// Dependencies: clap, tempfile
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::use_debug,
    reason = "Test-only assertions use unwrap for clarity."
)]

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use fedcloud_info_config::FedCloudInfoConfig;
use tempfile::TempDir;

use super::Cli;
use super::Commands;
use super::ConfigCommand;
use super::ReadLimitError;
use super::config_summary;
use super::read_bytes_with_limit;

#[test]
fn normalize_accepts_global_config_and_validity_flag() {
    let cli = Cli::try_parse_from([
        "fedcloud-info",
        "normalize",
        "site.json",
        "--no-validity",
        "--config",
        "custom.toml",
    ])
    .unwrap();
    assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    let Commands::Normalize(command) = cli.command else {
        panic!("expected normalize command");
    };
    assert_eq!(command.file, PathBuf::from("site.json"));
    assert!(command.no_validity);
}

#[test]
fn config_check_and_serve_parse() {
    let cli = Cli::try_parse_from(["fedcloud-info", "config", "check"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Config {
            command: ConfigCommand::Check
        }
    ));
    let cli = Cli::try_parse_from(["fedcloud-info", "--config", "a.toml", "serve"]).unwrap();
    assert!(matches!(cli.command, Commands::Serve));
}

#[test]
fn normalize_requires_a_file() {
    assert!(Cli::try_parse_from(["fedcloud-info", "normalize"]).is_err());
}

#[test]
fn bounded_read_rejects_oversized_files() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("site.json");
    fs::write(&path, b"0123456789").unwrap();
    assert_eq!(read_bytes_with_limit(&path, 10).unwrap().len(), 10);
    let err = read_bytes_with_limit(&path, 4).unwrap_err();
    assert!(matches!(
        err,
        ReadLimitError::TooLarge {
            size: 10,
            limit: 4
        }
    ));
}

#[test]
fn bounded_read_reports_missing_files() {
    let dir = TempDir::new().unwrap();
    let err = read_bytes_with_limit(&dir.path().join("absent.json"), 10).unwrap_err();
    assert!(matches!(err, ReadLimitError::Io(_)));
}

#[test]
fn config_summary_names_the_backend() {
    let config = FedCloudInfoConfig::from_toml_str(
        "[sites]\nbackend = \"poll\"\n\n[sites.poll]\nurl = \"https://objects.example/info/\"\n",
    )
    .unwrap();
    assert_eq!(config_summary(&config), "config ok: bind 127.0.0.1:8000, sites poll every 600s");
}
