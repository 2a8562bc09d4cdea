//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILSIFT_CONFIG` (environment variable)
//! 2. `~/.config/mailsift/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailsift\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Parser limits and defaults.
    pub parser: ParserConfig,
    /// Canonical document output.
    pub export: ExportConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Parser limits and defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Largest input accepted, in bytes (default: 268435456 = 256 MB).
    /// Larger files fail with `IngestError::TooLarge`.
    pub max_input_size: u64,
    /// Deepest multipart nesting accepted.
    pub max_depth: usize,
    /// Fill in `To` and `Subject` when a message lacks them.
    pub synthesize_missing: bool,
}

/// Canonical document output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Indentation width in spaces (0 = no pretty printing).
    pub indent: usize,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_input_size: 256 * 1024 * 1024, // 256 MB
            max_depth: 32,
            synthesize_missing: true,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { indent: 2 }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Configuration from the first config file found, else the defaults.
pub fn load_config() -> Config {
    config_file_path()
        .filter(|path| path.exists())
        .and_then(|path| read_config(&path))
        .unwrap_or_default()
}

/// Parse one config file. Read and parse failures are logged and give `None`.
pub fn read_config(path: &Path) -> Option<Config> {
    let contents = std::fs::read_to_string(path)
        .inspect_err(|e| warn!(path = %path.display(), error = %e, "Cannot read config file, using defaults"))
        .ok()?;
    match toml::from_str::<Config>(&contents) {
        Ok(config) => {
            debug!(path = %path.display(), "Loaded config");
            Some(config)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Invalid config file, using defaults");
            None
        }
    }
}

/// `$MAILSIFT_CONFIG`, else `mailsift/config.toml` under the platform config dir.
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILSIFT_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("mailsift").join("config.toml"))
}

/// Directory the log file is written to.
pub fn cache_dir(config: &Config) -> PathBuf {
    config.general.cache_dir.clone().unwrap_or_else(|| {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mailsift")
    })
}
