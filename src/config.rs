use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::diff::DiffOptions;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub diff: DiffOptions,
    #[serde(default)]
    pub update: UpdateConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    format!("doc-churn/{}", env!("CARGO_PKG_VERSION"))
}
fn default_max_bytes() -> u64 {
    50 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpdateConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}

impl Config {
    /// Config pointing at the given database with every other section defaulted.
    pub fn with_db_path(path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig { path: path.into() },
            fetch: FetchConfig::default(),
            diff: DiffOptions::default(),
            update: UpdateConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch.timeout_secs == 0 {
            anyhow::bail!("fetch.timeout_secs must be > 0");
        }
        if self.fetch.max_bytes == 0 {
            anyhow::bail!("fetch.max_bytes must be > 0");
        }

        for (name, value) in [
            ("diff.close_match_cutoff", self.diff.close_match_cutoff),
            ("diff.pair_cutoff", self.diff.pair_cutoff),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                anyhow::bail!("{} must be in (0.0, 1.0], got {}", name, value);
            }
        }

        if self.update.concurrency == 0 {
            anyhow::bail!("update.concurrency must be >= 1");
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}
