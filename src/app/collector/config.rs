//! Collector configuration.
//!
//! Stored as TOML. Every field has a default so an empty file is a valid (if useless)
//! configuration; the region list normally comes from the platform.

use super::region::validate_region;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Concurrency limits for one collection pass.
///
/// Both default to 1, which is the fully sequential behavior: regions one at a time and,
/// within a region, describe calls one at a time in listing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    pub max_concurrent_regions: usize,
    pub max_concurrent_describes: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_regions: 1,
            max_concurrent_describes: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Regions to collect, in order
    pub regions: Vec<String>,
    /// Named AWS profile; the default credential chain is used when unset
    pub profile: Option<String>,
    /// List certificates of every key algorithm instead of the ACM default (RSA-2048 only)
    pub all_key_types: bool,
    pub concurrency: ConcurrencyConfig,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            profile: None,
            all_key_types: true,
            concurrency: ConcurrencyConfig::default(),
        }
    }
}

impl CollectorConfig {
    /// Platform config location, e.g. `~/.config/acm-collector/config.toml` on Linux
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "", "acm-collector")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("Failed to parse collector config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading collector config from {}", path.display());
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Load `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency.max_concurrent_regions == 0 {
            bail!("concurrency.max_concurrent_regions must be at least 1");
        }
        if self.concurrency.max_concurrent_describes == 0 {
            bail!("concurrency.max_concurrent_describes must be at least 1");
        }
        for region in &self.regions {
            validate_region(region)?;
        }
        Ok(())
    }
}
