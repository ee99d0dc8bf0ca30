//! CLI command implementations
//!
//! `serve` follows a fixed boot order: load and validate the config, apply
//! the log level, build the library, seed counters, then bind the listener.
//! Any failure before the listener is up ends the process.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::http::HeaderValue;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::http_server::{HttpServer, HttpServerConfig};
use crate::library::Library;
use crate::observability::{log_event, log_event_with_fields, Event, Logger, Severity};
use crate::records::EntityKind;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::write_response;

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Listener, CORS and body limit settings
    #[serde(flatten)]
    pub server: HttpServerConfig,

    /// Minimum log severity (default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Counter floors by collection name, applied at boot
    #[serde(default)]
    pub counters: BTreeMap<String, u64>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: HttpServerConfig::default(),
            log_level: default_log_level(),
            counters: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.server.body_limit_bytes == 0 {
            return Err(CliError::config_error("body_limit_bytes must be > 0"));
        }

        for origin in &self.server.cors_origins {
            HeaderValue::from_str(origin).map_err(|_| {
                CliError::config_error(format!("Invalid CORS origin: '{}'", origin))
            })?;
        }

        self.severity()?;
        self.counter_seeds()?;

        Ok(())
    }

    pub fn severity(&self) -> CliResult<Severity> {
        self.log_level
            .parse::<Severity>()
            .map_err(CliError::config_error)
    }

    /// Counter floors keyed by kind
    pub fn counter_seeds(&self) -> CliResult<Vec<(EntityKind, u64)>> {
        self.counters
            .iter()
            .map(|(name, floor)| {
                name.parse::<EntityKind>()
                    .map(|kind| (kind, *floor))
                    .map_err(|e| CliError::config_error(format!("Invalid counters entry: {}", e)))
            })
            .collect()
    }
}

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Init { config, force } => init(&config, force),
        Command::Serve { config, port } => serve(&config, port),
        Command::Check { config } => check(&config),
    }
}

/// Write a default configuration file
pub fn init(config_path: &Path, force: bool) -> CliResult<()> {
    if config_path.exists() && !force {
        return Err(CliError::already_initialized(config_path));
    }

    let config = Config::default();
    let content = serde_json::to_string_pretty(&config)?;
    fs::write(config_path, content)?;

    write_response(json!({
        "message": "Configuration written",
        "config": config_path.display().to_string(),
    }))
}

/// Validate a configuration file and print the effective settings
pub fn check(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    write_response(serde_json::to_value(&config)?)
}

/// Boot the library and serve the HTTP API until Ctrl-C
pub fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    log_event(Event::BootStart);

    let mut config = Config::load(config_path)?;
    if let Some(port) = port {
        config.server.port = port;
    }
    Logger::set_min_severity(config.severity()?);

    let config_display = config_path.display().to_string();
    log_event_with_fields(
        Event::ConfigLoaded,
        &[
            ("config", config_display.as_str()),
            ("port", &config.server.port.to_string()),
        ],
    );

    let library = Arc::new(Library::in_memory());
    library
        .seed_counters(&config.counter_seeds()?)
        .map_err(|e| CliError::boot_failed(format!("Failed to seed counters: {}", e)))?;

    let server = HttpServer::with_config(config.server, library);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })?;

    Ok(())
}
