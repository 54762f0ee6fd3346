//! Command line handling
//!
//! Argument parsing, configuration merging and the two run modes: a live
//! audit against the cluster, or a replay of a previously dumped snapshot.

mod logging;

pub use logging::init_logging;

use crate::check::{Checker, DeprecationCatalog, DnsResolver, RuleRegistry, RuleResults};
use crate::config::{Config, ConfigLoader, OutputFormat};
use crate::graph::GraphBuilder;
use crate::kube::{self, KubeClient};
use crate::output::{snapshot, table};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Audits a Kubernetes cluster for deprecated APIs and common misconfigurations
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "kube-checker", version)]
#[command(about = "Audits a Kubernetes cluster for deprecated APIs and common misconfigurations", long_about = None)]
pub struct Args {
    /// Only audit this namespace
    #[arg(long, env = "NAMESPACE")]
    pub namespace: Option<String>,

    /// Path to a kubeconfig file, inferred when absent
    #[arg(long, env = "KUBE_CONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Write the resource graph in DOT format to this file
    #[arg(long, env = "GRAPH_FILE")]
    pub graph_file: Option<PathBuf>,

    /// How results are presented
    #[arg(long, value_enum, env = "OUTPUT_FORMAT")]
    pub output_format: Option<OutputFormat>,

    /// Write results to this file instead of presenting them
    #[arg(long, env = "DUMP_BINARY_PATH")]
    pub dump_binary_path: Option<PathBuf>,

    /// Present results read from this file without contacting the cluster
    #[arg(long, env = "READ_BINARY_PATH", conflicts_with = "dump_binary_path")]
    pub read_binary_path: Option<PathBuf>,

    /// Concurrent list calls while fetching resources
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Skip the rules that query DNS
    #[arg(long)]
    pub no_dns_checks: bool,

    /// Enable debug logging
    #[arg(long, short = 'd')]
    pub debug: bool,
}

impl Args {
    /// Layer the command line flags over a loaded configuration
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(namespace) = self.namespace.as_ref().filter(|ns| !ns.is_empty()) {
            config.namespace = Some(namespace.clone());
        }
        if let Some(format) = self.output_format {
            config.output_format = format;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if self.no_dns_checks {
            config.checks.dns = false;
        }
        config
    }
}

/// Run the checker with parsed arguments
pub async fn run(args: Args, cancel: CancellationToken) -> Result<()> {
    let config = args.apply(ConfigLoader::load().context("Failed to load configuration")?);
    config.validate().context("Invalid configuration")?;

    let results = match &args.read_binary_path {
        Some(path) => snapshot::load(path).context("Failed to read results")?,
        None => {
            let results = audit(&args, &config, cancel).await?;
            if let Some(path) = &args.dump_binary_path {
                snapshot::save(path, &results).context("Failed to dump results")?;
                println!("successfully dumped results to: {}", path.display());
                return Ok(());
            }
            results
        }
    };

    present(&results, config.output_format)
}

/// Build the graph from the cluster and evaluate every rule against it
async fn audit(args: &Args, config: &Config, cancel: CancellationToken) -> Result<RuleResults> {
    let client = kube::create_client(args.kubeconfig.as_deref()).await?;
    let client = Arc::new(KubeClient::new(client));

    let graph = GraphBuilder::new(client.clone(), client)
        .namespace(config.namespace.clone())
        .concurrency(config.concurrency)
        .cancellation(cancel.clone())
        .build()
        .await
        .context("Failed to build resource graph")?;
    tracing::info!(
        nodes = graph.len(),
        edges = graph.edge_count(),
        "Resource graph built"
    );

    if let Some(path) = &args.graph_file {
        std::fs::write(path, graph.encode_dot())
            .with_context(|| format!("Failed to write graph to {}", path.display()))?;
        tracing::info!("Graph written to {}", path.display());
    }

    let checker = Checker::new(rule_registry(config)?, deprecation_catalog(config)?)
        .cancellation(cancel);
    tracing::info!("Evaluating {} rules", checker.rules().len());
    checker
        .evaluate(&graph)
        .await
        .context("Failed to evaluate rules")
}

/// Built-in rules minus the ones disabled in configuration
pub fn rule_registry(config: &Config) -> Result<RuleRegistry> {
    let dns = config.checks.dns.then(|| {
        Arc::new(
            DnsResolver::system()
                .with_timeout(Duration::from_secs(config.checks.dns_timeout_seconds))
                .with_cache_size(config.checks.dns_cache_size),
        )
    });

    let mut registry = RuleRegistry::builtin(dns).context("Failed to register rules")?;
    for unknown in registry.disable(&config.checks.disabled) {
        tracing::warn!("Cannot disable unknown rule {}", unknown);
    }
    Ok(registry)
}

/// The embedded catalog unless configuration names a replacement file
pub fn deprecation_catalog(config: &Config) -> Result<DeprecationCatalog> {
    let catalog = match &config.deprecations_file {
        Some(path) => DeprecationCatalog::from_path(path),
        None => DeprecationCatalog::embedded(),
    };
    catalog.context("Failed to load deprecation catalog")
}

fn present(results: &RuleResults, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            table::print(results);
            Ok(())
        }
        #[cfg(feature = "tui")]
        OutputFormat::Tui => crate::output::tui::run(results),
        #[cfg(not(feature = "tui"))]
        OutputFormat::Tui => anyhow::bail!("interactive output requires the tui feature"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args {
            namespace: Some("apps".to_string()),
            output_format: Some(OutputFormat::Tui),
            concurrency: Some(2),
            no_dns_checks: true,
            ..Default::default()
        };
        let config = args.apply(Config::default());

        assert_eq!(config.namespace.as_deref(), Some("apps"));
        assert_eq!(config.output_format, OutputFormat::Tui);
        assert_eq!(config.concurrency, 2);
        assert!(!config.checks.dns);
    }

    #[test]
    fn test_absent_flags_keep_config() {
        let config = Config {
            namespace: Some("platform".to_string()),
            concurrency: 4,
            ..Default::default()
        };
        let merged = Args::default().apply(config.clone());
        assert_eq!(merged, config);
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "kube-checker",
            "--output-format",
            "tui",
            "--concurrency",
            "3",
            "--no-dns-checks",
        ])
        .unwrap();
        assert_eq!(args.output_format, Some(OutputFormat::Tui));
        assert_eq!(args.concurrency, Some(3));
        assert!(args.no_dns_checks);
    }

    #[test]
    fn test_dump_and_read_conflict() {
        let result = Args::try_parse_from([
            "kube-checker",
            "--dump-binary-path",
            "a.bin",
            "--read-binary-path",
            "b.bin",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rule_registry_disables_rules() {
        let mut config = Config::default();
        config.checks.dns = false;
        config.checks.disabled = vec!["UnusedResource".to_string(), "Unknown".to_string()];

        let registry = rule_registry(&config).unwrap();
        assert!(registry.get("UnusedResource").is_none());
        assert!(registry.get("NoTLS").is_some());
    }

    #[test]
    fn test_deprecation_catalog_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deprecations.yaml");
        std::fs::write(
            &path,
            r#"
- component: kubernetes
  apiVersion: batch/v1beta1
  kind: CronJob
  deprecatedIn: v1.21
  removedIn: v1.25
  newApiVersion: batch/v1
  description: CronJob moved to batch/v1.
  link: https://kubernetes.io/docs/reference/using-api/deprecation-guide/
"#,
        )
        .unwrap();

        let config = Config {
            deprecations_file: Some(path),
            ..Default::default()
        };
        assert_eq!(deprecation_catalog(&config).unwrap().len(), 1);
    }
}
