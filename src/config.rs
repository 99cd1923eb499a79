use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::models::FeatureKind;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GlobalConfig {
    pub listen: String,
    /// Per provider request
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
    /// Most provider results kept in memory at once
    pub cache_capacity: u64,
    /// Half-width of the box sent to bbox-templated providers
    pub search_radius_m: f64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".to_string(),
            timeout_secs: 25,
            cache_ttl_secs: 3600,
            cache_capacity: 10_000,
            search_radius_m: 2000.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub name: String,
    pub kind: FeatureKind,
    pub url: String,
    /// Lower runs first
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        content.parse()
    }

    /// Enabled sources in fallback order (priority, then file order)
    pub fn enabled_sources(&self) -> Vec<&SourceConfig> {
        let mut sources: Vec<&SourceConfig> = self.sources.iter().filter(|s| s.enabled).collect();
        sources.sort_by_key(|s| s.priority);
        sources
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.global.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.global.cache_ttl_secs)
    }
}

impl std::str::FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        Ok(config)
    }
}
