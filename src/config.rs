//! Config file support for the tailscope CLI
//!
//! Settings live in a small TOML file; command-line flags and the
//! `TAILSCOPE_TOKEN` environment variable take precedence over it.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "tailscope.toml";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    /// Tail poll interval in seconds (default 3)
    pub poll_interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerConfig {
    pub base_url: Option<String>,
    pub token: Option<String>,
}

impl Config {
    /// Load from an explicit path (must exist) or the default location
    /// (missing file yields defaults)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Self::parse(&raw)
            }
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    let raw = std::fs::read_to_string(default)
                        .with_context(|| format!("Failed to read {DEFAULT_CONFIG_FILE}"))?;
                    Self::parse(&raw)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn parse(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Invalid config file")
    }
}
