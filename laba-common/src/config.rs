//! Configuration management for Laba services.
//!
//! The stock service reads a single configuration file at `~/.laba/config.json`.
//! Every field has a default, so a missing file yields a runnable local setup.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (LABA_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `LABA_HOST` → server.host
//! - `LABA_PORT` → server.port
//! - `LABA_CACHE_BACKEND` → cache.backend (memory, redis)
//! - `LABA_REDIS_URL` → cache.redis_url
//! - `LABA_CACHE_TTL_SECS` → cache.ttl_secs
//! - `LABA_PYTHON` → upstream.runtime
//! - `LABA_SCRIPTS_DIR` → upstream.scripts_dir
//! - `LABA_FORECAST_URL` → upstream.forecast_base_url
//! - `LABA_UPSTREAM_TIMEOUT_SECS` → upstream.timeout_secs
//! - `LABA_GRAHAM_CSV` → datasets.graham_csv
//! - `LABA_VALUATION_CSV` → datasets.valuation_csv
//! - `LABA_LOG_LEVEL` → observability.log_level
//! - `LABA_LOG_FORMAT` → observability.log_format

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".laba"),
        |dirs| dirs.home_dir().join(".laba"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Server Configuration
// ============================================================================

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address. Default "127.0.0.1" (local only)
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    3000
}

// ============================================================================
// Cache Configuration
// ============================================================================

/// Which cache store backs the query orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Process-local map with per-entry expiry
    #[default]
    Memory,
    /// Shared Redis instance (`SETEX` / `GET`)
    Redis,
}

impl CacheBackend {
    /// Parse from a case-insensitive name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "redis" => Some(Self::Redis),
            _ => None,
        }
    }
}

impl std::fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Redis => write!(f, "redis"),
        }
    }
}

/// Cache store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Backend type
    #[serde(default)]
    pub backend: CacheBackend,

    /// Redis URL (redis://host:port), used when backend = redis
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// TTL applied to every orchestrator-managed entry
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            redis_url: default_redis_url(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".into()
}

fn default_cache_ttl() -> u64 {
    3600
}

// ============================================================================
// Upstream Configuration
// ============================================================================

/// External collaborator configuration (extractor scripts + forecast API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Interpreter used to launch extractor scripts
    #[serde(default = "default_runtime", alias = "python")]
    pub runtime: String,

    /// Directory containing the extractor scripts
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,

    /// Base URL of the forecast API; the symbol is appended as a path segment
    #[serde(default = "default_forecast_base_url")]
    pub forecast_base_url: String,

    /// User-Agent sent to the forecast API
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-call timeout for scripts and HTTP requests
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            runtime: default_runtime(),
            scripts_dir: default_scripts_dir(),
            forecast_base_url: default_forecast_base_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_upstream_timeout(),
        }
    }
}

fn default_runtime() -> String {
    "python3".into()
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from("../dataExtractor/stocks")
}

fn default_forecast_base_url() -> String {
    "https://production.dataviz.cnn.io/quote/forecast".into()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/58.0.3029.110 Safari/537.3"
        .into()
}

fn default_upstream_timeout() -> u64 {
    30
}

// ============================================================================
// Dataset Configuration
// ============================================================================

/// Locations of the CSV snapshots used by the screening endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetsConfig {
    /// Benjamin Graham criteria snapshot
    #[serde(default = "default_graham_csv")]
    pub graham_csv: PathBuf,

    /// Intrinsic value snapshot
    #[serde(default = "default_valuation_csv")]
    pub valuation_csv: PathBuf,
}

impl Default for DatasetsConfig {
    fn default() -> Self {
        Self {
            graham_csv: default_graham_csv(),
            valuation_csv: default_valuation_csv(),
        }
    }
}

fn default_graham_csv() -> PathBuf {
    PathBuf::from("../dataExtractor/sp500/data.csv")
}

fn default_valuation_csv() -> PathBuf {
    PathBuf::from("../dataExtractor/sp500/intrinsic_values.csv")
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets forced to `warn`.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration for the Laba stock service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub datasets: DatasetsConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path, falling back to defaults.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides applied.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `LABA_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (environment in production).
    ///
    /// Unparsable numeric values are ignored and the existing value is kept.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("LABA_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("LABA_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }

        if let Some(backend) = lookup("LABA_CACHE_BACKEND") {
            match CacheBackend::parse(&backend) {
                Some(b) => self.cache.backend = b,
                None => tracing::warn!(backend = %backend, "Unknown LABA_CACHE_BACKEND, ignoring"),
            }
        }
        if let Some(url) = lookup("LABA_REDIS_URL") {
            self.cache.redis_url = url;
        }
        if let Some(ttl) = lookup("LABA_CACHE_TTL_SECS").and_then(|t| t.parse().ok()) {
            self.cache.ttl_secs = ttl;
        }

        if let Some(runtime) = lookup("LABA_PYTHON") {
            self.upstream.runtime = runtime;
        }
        if let Some(dir) = lookup("LABA_SCRIPTS_DIR") {
            self.upstream.scripts_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("LABA_FORECAST_URL") {
            self.upstream.forecast_base_url = url;
        }
        if let Some(timeout) = lookup("LABA_UPSTREAM_TIMEOUT_SECS").and_then(|t| t.parse().ok()) {
            self.upstream.timeout_secs = timeout;
        }

        if let Some(path) = lookup("LABA_GRAHAM_CSV") {
            self.datasets.graham_csv = PathBuf::from(path);
        }
        if let Some(path) = lookup("LABA_VALUATION_CSV") {
            self.datasets.valuation_csv = PathBuf::from(path);
        }

        if let Some(level) = lookup("LABA_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = lookup("LABA_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
