//! Replay configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (SWITCHYARD_*)
//! - TOML configuration file
//! - The `--config` command line argument

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use switchyard_core::RouterConfig;

/// Replay configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Router configuration.
    #[serde(default)]
    pub router: RouterConfig,

    /// Output configuration.
    #[serde(default)]
    pub output: OutputConfig,
}

/// What gets printed, and how.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Pretty-print the final state tree.
    #[serde(default = "default_true")]
    pub pretty: bool,

    /// Print outbound messages as they are sent.
    #[serde(default = "default_true")]
    pub show_outbound: bool,
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pretty: true,
            show_outbound: true,
        }
    }
}

/// Parse a boolean environment value.
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load configuration from the default paths, or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_paths = ["switchyard.toml", "~/.config/switchyard/switchyard.toml"];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        Ok(Self::default().with_env())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config.with_env())
    }

    /// Apply environment overrides.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_overrides(std::env::var("SWITCHYARD_DIAGNOSTICS").ok().as_deref())
    }

    fn with_overrides(mut self, diagnostics: Option<&str>) -> Self {
        if let Some(enabled) = diagnostics.and_then(parse_flag) {
            self.router.diagnostics = enabled;
        }
        self
    }
}
