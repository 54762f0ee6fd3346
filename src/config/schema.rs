//! Configuration schema definitions
//!
//! Defines the structure of configuration files using serde for serialization.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Audit a single namespace instead of the whole cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Concurrent list calls while fetching resources
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default)]
    pub output_format: OutputFormat,

    /// Replaces the embedded deprecation catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecations_file: Option<PathBuf>,

    #[serde(default)]
    pub checks: ChecksConfig,
}

/// How results are presented
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Tui,
}

/// Rule configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChecksConfig {
    /// Register the rules that query DNS
    #[serde(default = "default_true")]
    pub dns: bool,

    #[serde(default = "default_dns_timeout_seconds")]
    pub dns_timeout_seconds: u64,

    #[serde(default = "default_dns_cache_size")]
    pub dns_cache_size: usize,

    /// Rule ids removed before evaluation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled: Vec<String>,
}

// Default value functions
fn default_concurrency() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_dns_timeout_seconds() -> u64 {
    5
}

fn default_dns_cache_size() -> usize {
    512
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: None,
            concurrency: default_concurrency(),
            output_format: OutputFormat::default(),
            deprecations_file: None,
            checks: ChecksConfig::default(),
        }
    }
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            dns: default_true(),
            dns_timeout_seconds: default_dns_timeout_seconds(),
            dns_cache_size: default_dns_cache_size(),
            disabled: Vec::new(),
        }
    }
}

impl Config {
    /// Reject values the checker cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be at least 1");
        }
        if self.checks.dns_timeout_seconds == 0 {
            anyhow::bail!("checks.dnsTimeoutSeconds must be at least 1");
        }
        if self.namespace.as_deref() == Some("") {
            anyhow::bail!("namespace cannot be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.namespace, None);
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.output_format, OutputFormat::Table);
        assert!(config.checks.dns);
        assert_eq!(config.checks.dns_timeout_seconds, 5);
        assert_eq!(config.checks.dns_cache_size, 512);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();
        assert!(yaml.contains("outputFormat: table"));
        assert!(yaml.contains("dnsTimeoutSeconds"));
    }

    #[test]
    fn test_config_deserialization() {
        let yaml = r#"
namespace: apps
outputFormat: tui
checks:
  dns: false
  disabled:
    - UnusedResource
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.namespace.as_deref(), Some("apps"));
        assert_eq!(config.output_format, OutputFormat::Tui);
        assert!(!config.checks.dns);
        assert_eq!(config.checks.dns_cache_size, 512);
        assert_eq!(config.checks.disabled, vec!["UnusedResource".to_string()]);
    }

    #[test]
    fn test_unknown_output_format_is_rejected() {
        assert!(serde_yaml::from_str::<Config>("outputFormat: json").is_err());
    }

    #[test]
    fn test_zero_concurrency_is_invalid() {
        let config = Config {
            concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
