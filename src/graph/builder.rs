//! Graph population from a live cluster
//!
//! Discovery, then fetch, then node construction, then one edge-linking pass.

use super::{Graph, GraphError, KindRegistry};
use crate::kube::{discover, fetch_all, MetadataClient, ObjectClient, DEFAULT_CONCURRENCY};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Orchestrates building a [`Graph`] from a cluster
pub struct GraphBuilder {
    metadata: Arc<dyn MetadataClient>,
    objects: Arc<dyn ObjectClient>,
    registry: KindRegistry,
    namespace: Option<String>,
    concurrency: usize,
    cancel: CancellationToken,
}

impl GraphBuilder {
    pub fn new(metadata: Arc<dyn MetadataClient>, objects: Arc<dyn ObjectClient>) -> Self {
        Self {
            metadata,
            objects,
            registry: KindRegistry::builtin(),
            namespace: None,
            concurrency: DEFAULT_CONCURRENCY,
            cancel: CancellationToken::new(),
        }
    }

    /// Limit the build to one namespace; cluster-scoped types are skipped
    pub fn namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace.filter(|ns| !ns.is_empty());
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn registry(mut self, registry: KindRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn build(&self) -> Result<Graph, GraphError> {
        tracing::info!("Discovering API resources");
        let resources = discover(
            self.metadata.as_ref(),
            self.namespace.is_some(),
            &self.cancel,
        )
        .await?;

        tracing::info!("Fetching all resources");
        let objects = fetch_all(
            Arc::clone(&self.objects),
            resources,
            self.namespace.clone(),
            self.concurrency,
            &self.cancel,
        )
        .await?;

        if self.cancel.is_cancelled() {
            return Err(GraphError::Cancelled);
        }
        Graph::from_objects(&self.registry, objects)
    }
}

impl Graph {
    /// Build a fully linked graph from generic objects
    ///
    /// Helm release storage Secrets are skipped.
    pub fn from_objects(
        registry: &KindRegistry,
        objects: impl IntoIterator<Item = Value>,
    ) -> Result<Graph, GraphError> {
        let mut graph = Graph::new();

        tracing::info!("Adding nodes");
        for object in objects {
            let resource = registry.ingest(object)?;
            if resource.is_helm_release_storage() {
                tracing::debug!("Skipping helm release storage {}", resource.reference());
                continue;
            }
            graph.add_node(resource)?;
        }

        tracing::info!("Connecting edges");
        graph.link_edges(registry)?;

        tracing::info!(
            "Graph has {} nodes and {} edges",
            graph.len(),
            graph.edge_count()
        );
        Ok(graph)
    }
}
