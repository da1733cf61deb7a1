//! Main application configuration
//!
//! This module defines the primary configuration structures for the elo-board
//! voting service, including environment variable loading, TOML file loading
//! and validation.

use crate::config::rating::RatingConfig;
use crate::ranking::TieBreak;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub storage: StorageSettings,
    pub aggregation: AggregationSettings,
    pub rating: RatingConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Interface the HTTP server binds to
    pub http_host: String,
    /// Port for the HTTP API, health and metrics endpoints
    pub http_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
    /// Origins allowed to submit votes from a browser
    pub allowed_origins: Vec<String>,
}

/// Locations of the catalog, vote log and ranking cache
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// JSON array of `{ "id", "name" }` entries
    pub catalog_path: PathBuf,
    /// Append-only JSON-lines vote log
    pub vote_log_path: PathBuf,
    /// Published ranking snapshot
    pub ranking_cache_path: PathBuf,
}

/// Aggregation schedule and ranking settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationSettings {
    /// Seconds between scheduled aggregation runs
    pub interval_seconds: u64,
    /// Run one aggregation immediately at startup
    pub run_on_startup: bool,
    /// Order of entries with equal ratings
    pub tie_break: TieBreak,
    /// Reject votes for ids missing from the catalog at submission time
    pub validate_entry_ids: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "elo-board".to_string(),
            log_level: "info".to_string(),
            http_host: "0.0.0.0".to_string(),
            http_port: 8080,
            shutdown_timeout_seconds: 30,
            allowed_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("data/entries.json"),
            vote_log_path: PathBuf::from("data/votes.jsonl"),
            ranking_cache_path: PathBuf::from("data/ranking.json"),
        }
    }
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            interval_seconds: 300, // 5 minutes
            run_on_startup: true,
            tie_break: TieBreak::CatalogOrder,
            validate_entry_ids: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env_overrides()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Parse configuration from TOML text; missing sections take defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| anyhow!("Invalid TOML configuration: {}", e))
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Ok(host) = env::var("HTTP_HOST") {
            self.service.http_host = host;
        }
        if let Ok(port) = env::var("HTTP_PORT") {
            self.service.http_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid HTTP_PORT value: {}", port))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            self.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }
        if let Ok(origins) = env::var("ALLOWED_ORIGINS") {
            self.service.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect();
        }

        // Storage settings
        if let Ok(path) = env::var("CATALOG_PATH") {
            self.storage.catalog_path = PathBuf::from(path);
        }
        if let Ok(path) = env::var("VOTE_LOG_PATH") {
            self.storage.vote_log_path = PathBuf::from(path);
        }
        if let Ok(path) = env::var("RANKING_CACHE_PATH") {
            self.storage.ranking_cache_path = PathBuf::from(path);
        }

        // Aggregation settings
        if let Ok(interval) = env::var("AGGREGATION_INTERVAL_SECONDS") {
            self.aggregation.interval_seconds = interval
                .parse()
                .map_err(|_| anyhow!("Invalid AGGREGATION_INTERVAL_SECONDS value: {}", interval))?;
        }
        if let Ok(run_on_startup) = env::var("RUN_ON_STARTUP") {
            self.aggregation.run_on_startup = run_on_startup
                .parse()
                .map_err(|_| anyhow!("Invalid RUN_ON_STARTUP value: {}", run_on_startup))?;
        }
        if let Ok(tie_break) = env::var("TIE_BREAK") {
            self.aggregation.tie_break = tie_break.parse()?;
        }
        if let Ok(validate) = env::var("VALIDATE_ENTRY_IDS") {
            self.aggregation.validate_entry_ids = validate
                .parse()
                .map_err(|_| anyhow!("Invalid VALIDATE_ENTRY_IDS value: {}", validate))?;
        }

        // Rating settings
        if let Ok(initial) = env::var("INITIAL_RATING") {
            self.rating.initial_rating = initial
                .parse()
                .map_err(|_| anyhow!("Invalid INITIAL_RATING value: {}", initial))?;
        }
        if let Ok(k_factor) = env::var("K_FACTOR") {
            self.rating.k_factor = k_factor
                .parse()
                .map_err(|_| anyhow!("Invalid K_FACTOR value: {}", k_factor))?;
        }

        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get aggregation interval as Duration
    pub fn aggregation_interval(&self) -> Duration {
        Duration::from_secs(self.aggregation.interval_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    // Validate ports
    if config.service.http_port == 0 {
        return Err(anyhow!("HTTP port cannot be 0"));
    }

    // Validate timeouts
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }
    if config.aggregation.interval_seconds == 0 {
        return Err(anyhow!("Aggregation interval must be greater than 0"));
    }

    // Validate storage settings
    if config.storage.catalog_path.as_os_str().is_empty() {
        return Err(anyhow!("Catalog path cannot be empty"));
    }
    if config.storage.vote_log_path.as_os_str().is_empty() {
        return Err(anyhow!("Vote log path cannot be empty"));
    }
    if config.storage.ranking_cache_path.as_os_str().is_empty() {
        return Err(anyhow!("Ranking cache path cannot be empty"));
    }

    config.rating.validate()?;

    Ok(())
}
