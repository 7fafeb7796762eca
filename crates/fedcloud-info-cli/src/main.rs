// crates/fedcloud-info-cli/src/main.rs
// ============================================================================
// Module: FedCloud Info CLI Entry Point
// Description: Command dispatcher for serving and offline normalization.
// Purpose: Run the API service and inspect site documents locally.
// Dependencies: clap, fedcloud-info-config, fedcloud-info-server, tokio
// ============================================================================

//! ## Overview
//! `fedcloud-info serve` starts the background refresh tasks and the HTTP
//! API. `fedcloud-info normalize <file>` prints the normalized site of one
//! document as JSON using the configured enrichment and topology lookup.
//! `fedcloud-info config check` loads and validates the configuration.
//!
//! The configuration is resolved from `--config`, then
//! `FEDCLOUD_INFO_CONFIG`, then `fedcloud-info.toml`; built-in defaults apply
//! when none of these exist.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use fedcloud_info_catalogs::HttpFetcher;
use fedcloud_info_config::FedCloudInfoConfig;
use fedcloud_info_config::SitesBackend;
use fedcloud_info_core::MAX_DOCUMENT_BYTES;
use fedcloud_info_server::Server;
use fedcloud_info_server::build_normalizer;
use fedcloud_info_server::init_logging;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "fedcloud-info", version, about = "Federated cloud site information service")]
struct Cli {
    /// Optional config file path (defaults to fedcloud-info.toml or env override).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected command.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP API and background refresh tasks.
    Serve,
    /// Normalize one site document and print it as JSON.
    Normalize(NormalizeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `normalize`.
#[derive(Args, Debug)]
struct NormalizeCommand {
    /// Site document to normalize.
    #[arg(value_name = "FILE")]
    file: PathBuf,
    /// Accept documents past their validity window.
    #[arg(long, action = ArgAction::SetTrue)]
    no_validity: bool,
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate the configuration.
    Check,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve => command_serve(config_path).await,
        Commands::Normalize(command) => command_normalize(config_path, &command).await,
        Commands::Config {
            command: ConfigCommand::Check,
        } => command_config_check(config_path),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Loads configuration, falling back to defaults when no file exists.
fn load_config(path: Option<&Path>) -> CliResult<FedCloudInfoConfig> {
    FedCloudInfoConfig::load_or_default(path)
        .map_err(|err| CliError::new(format!("unable to load config: {err}")))
}

/// Executes the `serve` command.
async fn command_serve(config_path: Option<&Path>) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    init_logging(&config.logging).map_err(|err| CliError::new(err.to_string()))?;
    let server = Server::from_config(&config)
        .await
        .map_err(|err| CliError::new(format!("unable to start server: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `normalize` command.
async fn command_normalize(
    config_path: Option<&Path>,
    command: &NormalizeCommand,
) -> CliResult<ExitCode> {
    let mut config = load_config(config_path)?;
    if command.no_validity {
        config.normalizer.check_validity = false;
    }
    init_logging(&config.logging).map_err(|err| CliError::new(err.to_string()))?;
    let bytes = read_bytes_with_limit(&command.file, MAX_DOCUMENT_BYTES).map_err(|err| {
        CliError::new(format!("unable to read {}: {err}", command.file.display()))
    })?;
    let fetcher = HttpFetcher::new(config.http.timeout(), &config.http.user_agent)
        .map_err(|err| CliError::new(err.to_string()))?;
    let normalizer =
        build_normalizer(&config, &fetcher).map_err(|err| CliError::new(err.to_string()))?;
    let site = normalizer.normalize_bytes(&bytes).await.map_err(|err| {
        CliError::new(format!("unable to normalize {}: {err}", command.file.display()))
    })?;
    let json = serde_json::to_string_pretty(&site)
        .map_err(|err| CliError::new(format!("unable to encode site: {err}")))?;
    write_stdout_line(&json).map_err(|err| CliError::new(output_error(&err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `config check` command.
fn command_config_check(config_path: Option<&Path>) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    write_stdout_line(&config_summary(&config)).map_err(|err| CliError::new(output_error(&err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Describes a valid configuration in one line.
fn config_summary(config: &FedCloudInfoConfig) -> String {
    let backend = match config.sites.backend {
        SitesBackend::Directory => {
            format!("directory {}", config.sites.directory.path.display())
        }
        SitesBackend::Poll => format!("poll every {}s", config.sites.poll.interval_secs),
    };
    format!("config ok: bind {}, sites {backend}", config.server.bind)
}

// ============================================================================
// SECTION: Input and Output
// ============================================================================

/// Bounded file read errors.
#[derive(Debug, Error)]
enum ReadLimitError {
    /// File I/O failure.
    #[error("{0}")]
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    #[error("file of {size} bytes exceeds limit of {limit}")]
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    let mut limited = file.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output failure.
fn output_error(error: &std::io::Error) -> String {
    format!("unable to write output: {error}")
}

/// Reports an error on stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
