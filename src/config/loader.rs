//! Configuration loading
//!
//! Precedence order (highest to lowest):
//! 1. Command-line flags (applied by the caller)
//! 2. Environment variable overrides
//! 3. Config file
//! 4. Built-in defaults

use super::{defaults, paths, schema::Config};
use anyhow::{Context, Result};
use std::path::Path;

pub const NAMESPACE_ENV: &str = "KUBE_CHECKER_NAMESPACE";
pub const CONCURRENCY_ENV: &str = "KUBE_CHECKER_CONCURRENCY";
pub const DNS_CHECKS_ENV: &str = "KUBE_CHECKER_DNS_CHECKS";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with all layers merged
    ///
    /// A file named by `KUBE_CHECKER_CONFIG` must exist. The default file is
    /// optional.
    pub fn load() -> Result<Config> {
        let config = match paths::explicit_config_path() {
            Some(path) => Self::load_file(&path)?,
            None => {
                let path = paths::default_config_path();
                if path.exists() {
                    Self::load_file(&path)?
                } else {
                    tracing::debug!("No config file at {}, using defaults", path.display());
                    Self::load_defaults()
                }
            }
        };

        let config = Self::apply_env_overrides(config, |key| std::env::var(key).ok())?;
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load_file(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::debug!("Loaded config file {}", path.display());
        Ok(config)
    }

    /// Load default configuration
    pub fn load_defaults() -> Config {
        defaults::default_config()
    }

    /// Apply environment variable overrides read through `env`
    pub fn apply_env_overrides(
        mut config: Config,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Config> {
        if let Some(namespace) = env(NAMESPACE_ENV) {
            config.namespace = (!namespace.is_empty()).then_some(namespace);
        }

        if let Some(concurrency) = env(CONCURRENCY_ENV) {
            config.concurrency = concurrency
                .parse()
                .with_context(|| format!("{} must be a number", CONCURRENCY_ENV))?;
        }

        if let Some(dns) = env(DNS_CHECKS_ENV) {
            config.checks.dns = dns
                .parse()
                .with_context(|| format!("{} must be 'true' or 'false'", DNS_CHECKS_ENV))?;
        }

        Ok(config)
    }
}
