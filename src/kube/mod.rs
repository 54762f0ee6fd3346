//! Kubernetes client module
//!
//! Handles connection to the Kubernetes API server, and the discovery and
//! fetch phases that turn the server's catalog into a flat list of objects.
//!
//! Proxy configuration is taken from the standard `HTTP_PROXY`/`HTTPS_PROXY`
//! environment variables by kube-rs itself.

pub mod client;
pub mod discovery;
pub mod fetch;

pub use client::{
    ApiGroupResources, ApiResourceInfo, BoxError, DiscoveredResource, KubeClient, ListError,
    MetadataClient, ObjectClient,
};
pub use discovery::discover;
pub use fetch::{fetch_all, DEFAULT_CONCURRENCY};

use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::path::Path;

/// Initialize and return a Kubernetes client
///
/// With an explicit kubeconfig path that file's current context is used.
/// Otherwise the default loading strategy applies:
/// 1. In-cluster config (if running in a pod)
/// 2. KUBECONFIG environment variable
/// 3. ~/.kube/config
pub async fn create_client(kubeconfig: Option<&Path>) -> Result<Client> {
    let config = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .context("Failed to load kubeconfig")?
        }
        None => Config::infer().await.context("Failed to infer cluster config")?,
    };

    tracing::debug!("Connecting to cluster at {}", config.cluster_url);
    let client = Client::try_from(config).context("Failed to create Kubernetes client")?;
    Ok(client)
}
