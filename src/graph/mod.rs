//! Resource graph
//!
//! Directed graph over cluster resources. Nodes are keyed by an integer id
//! derived from the resource UID, edges carry an [`EdgeType`].
//!
//! The graph is populated in two phases: every node is added first, then
//! [`Graph::link_edges`] resolves owner references and relationships in a
//! single pass. Nodes added after linking keep no edges.

pub mod builder;
pub mod dot;
pub mod registry;
pub mod relationships;

pub use builder::GraphBuilder;
pub use registry::{KindHandler, KindRegistry};
pub use relationships::{RelationshipDescription, RelationshipDirection};

use crate::kube::BoxError;
use crate::models::{ObjectReference, Resource, ResourceError};
use std::collections::{HashMap, HashSet};

pub type NodeId = u64;

/// Errors raised while building the graph
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("could not discover API resources")]
    Discovery(#[source] BoxError),

    #[error("could not list {resource}")]
    Fetch {
        resource: String,
        #[source]
        source: BoxError,
    },

    #[error("resource uid is empty: {0}")]
    MissingUid(String),

    #[error("resource {reference} has invalid uid {uid:?}")]
    InvalidUid { reference: String, uid: String },

    #[error("node id {id} of {reference} collides with {existing}")]
    IdCollision {
        id: NodeId,
        reference: String,
        existing: String,
    },

    #[error("{reference} is controlled by {owner} (uid {uid}) which is not in the graph")]
    MissingOwner {
        reference: String,
        owner: String,
        uid: String,
    },

    #[error("malformed resource: {0}")]
    Malformed(String),

    #[error("graph build cancelled")]
    Cancelled,
}

impl From<ResourceError> for GraphError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::MissingUid(reference) => GraphError::MissingUid(reference),
            other => GraphError::Malformed(other.to_string()),
        }
    }
}

/// Derive the node id for a cluster UID
///
/// Folds the 128-bit UUID into 64 bits. Collisions are rejected at insertion.
pub fn node_id(uid: &str) -> Result<NodeId, uuid::Error> {
    let (high, low) = uuid::Uuid::parse_str(uid)?.as_u64_pair();
    Ok(high ^ low)
}

/// Relationship kind carried by an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeType {
    /// From owner to owned
    Owner,
    Consumes,
    Reference,
    LabelSelector,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Owner => "owner",
            EdgeType::Consumes => "consumes",
            EdgeType::Reference => "reference",
            EdgeType::LabelSelector => "label selector",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            EdgeType::Owner => "green",
            EdgeType::Consumes => "red",
            EdgeType::Reference => "blue",
            EdgeType::LabelSelector => "yellow",
        }
    }
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub edge_type: EdgeType,
}

/// A resource placed in the graph
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    resource: Resource,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn reference(&self) -> &ObjectReference {
        self.resource.reference()
    }
}

/// A directed graph of cluster resources
#[derive(Debug, Default)]
pub struct Graph {
    /// All nodes in insertion order
    nodes: Vec<Node>,
    /// Map from node id to index in nodes vector
    node_index: HashMap<NodeId, usize>,
    /// Map from `ObjectReference::id()` to node id
    id_map: HashMap<String, NodeId>,
    edges: HashSet<Edge>,
    incoming: HashMap<NodeId, Vec<Edge>>,
    outgoing: HashMap<NodeId, Vec<Edge>>,
    linked: bool,
}

impl Graph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource as a node
    ///
    /// A resource whose UID is already present is treated as the same object
    /// and not added twice. Two different UIDs folding to one id is an error.
    pub fn add_node(&mut self, resource: Resource) -> Result<NodeId, GraphError> {
        let id = node_id(resource.uid()).map_err(|_| GraphError::InvalidUid {
            reference: resource.reference().id(),
            uid: resource.uid().to_string(),
        })?;

        if let Some(&index) = self.node_index.get(&id) {
            let existing = &self.nodes[index].resource;
            if existing.uid() == resource.uid() {
                tracing::debug!(
                    existing = %existing.reference(),
                    duplicate = %resource.reference(),
                    "Skipping object already in the graph"
                );
                return Ok(id);
            }
            return Err(GraphError::IdCollision {
                id,
                reference: resource.reference().id(),
                existing: existing.reference().id(),
            });
        }

        if self.linked {
            tracing::warn!(
                "{} added after edges were linked, it will have no edges",
                resource.reference()
            );
        }

        self.id_map.insert(resource.reference().id(), id);
        self.node_index.insert(id, self.nodes.len());
        self.nodes.push(Node { id, resource });
        Ok(id)
    }

    /// Add an edge, ignoring exact duplicates
    fn add_edge(&mut self, from: NodeId, to: NodeId, edge_type: EdgeType) {
        let edge = Edge { from, to, edge_type };
        if self.edges.insert(edge) {
            self.outgoing.entry(from).or_default().push(edge);
            self.incoming.entry(to).or_default().push(edge);
        }
    }

    /// Resolve owner references and relationships for every node
    ///
    /// Runs once. Controller owner references must point at a node in the
    /// graph; relationship targets that are absent are skipped.
    pub fn link_edges(&mut self, registry: &KindRegistry) -> Result<(), GraphError> {
        if self.linked {
            tracing::warn!("Edges already linked, ignoring second link pass");
            return Ok(());
        }

        let mut pending = Vec::new();
        for node in &self.nodes {
            let resource = &node.resource;

            for owner in resource.controller_references() {
                let owner_id = node_id(&owner.uid)
                    .ok()
                    .filter(|id| self.node_index.contains_key(id))
                    .ok_or_else(|| GraphError::MissingOwner {
                        reference: resource.reference().id(),
                        owner: format!("{}/{}/{}", owner.api_version, owner.kind, owner.name),
                        uid: owner.uid.clone(),
                    })?;
                pending.push((owner_id, node.id, EdgeType::Owner));
            }

            for relationship in registry.relationships(resource) {
                let Some(target) = self.resolve(&relationship.reference, resource.namespace())
                else {
                    tracing::debug!(
                        from = %resource.reference(),
                        target = %relationship.reference,
                        "Relationship target not in graph"
                    );
                    continue;
                };
                match relationship.direction {
                    RelationshipDirection::To => {
                        pending.push((node.id, target, relationship.edge_type))
                    }
                    RelationshipDirection::From => {
                        pending.push((target, node.id, relationship.edge_type))
                    }
                }
            }
        }

        for (from, to, edge_type) in pending {
            self.add_edge(from, to, edge_type);
        }
        self.linked = true;
        Ok(())
    }

    /// Look up a relationship target
    ///
    /// A reference without a namespace inherits `namespace`; when that misses,
    /// the cluster-scoped form is tried.
    fn resolve(&self, reference: &ObjectReference, namespace: &str) -> Option<NodeId> {
        let declared_without_namespace = reference.namespace.is_empty();
        let scoped = reference.clone().or_namespace(namespace);
        self.id_map.get(&scoped.id()).copied().or_else(|| {
            declared_without_namespace
                .then(|| self.id_map.get(&reference.id()).copied())
                .flatten()
        })
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.node_index.get(&id).map(|&index| &self.nodes[index])
    }

    /// Find a node by its `apiVersion/kind/namespace/name` identity
    pub fn get(&self, reference: &ObjectReference) -> Option<&Node> {
        self.id_map
            .get(&reference.id())
            .and_then(|id| self.node(*id))
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Visit every node once, stopping at the first error
    pub fn iterate<E, F>(&self, mut visitor: F) -> Result<(), E>
    where
        F: FnMut(&Node) -> Result<(), E>,
    {
        for node in &self.nodes {
            visitor(node)?;
        }
        Ok(())
    }

    /// Nodes of the given apiVersion and kind
    ///
    /// Custom resources may reuse a built-in kind name, so both must match.
    pub fn list(&self, api_version: &str, kind: &str) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|node| {
                node.resource.api_version() == api_version && node.resource.kind() == kind
            })
            .collect()
    }

    pub fn incoming(&self, id: NodeId) -> &[Edge] {
        self.incoming.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn outgoing(&self, id: NodeId) -> &[Edge] {
        self.outgoing.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    /// All edges touching a node, incoming first
    pub fn edges(&self, id: NodeId) -> Vec<Edge> {
        self.incoming(id)
            .iter()
            .chain(self.outgoing(id))
            .copied()
            .collect()
    }

    /// Follow incoming owner edges to the top-most ancestor
    ///
    /// A node without an owner is its own root. When the owner chain loops,
    /// the member of the loop with the lowest id is the root, so every node
    /// reaching the loop agrees on it.
    pub fn find_root_owner<'a>(&'a self, node: &'a Node) -> &'a Node {
        let mut path = vec![node];
        let mut current = node;
        while let Some(owner) = self
            .incoming(current.id)
            .iter()
            .find(|edge| edge.edge_type == EdgeType::Owner)
            .and_then(|edge| self.node(edge.from))
        {
            if let Some(start) = path.iter().position(|seen| seen.id == owner.id) {
                tracing::warn!("Owner cycle detected at {}", owner.reference());
                return path[start..]
                    .iter()
                    .copied()
                    .min_by_key(|member| member.id)
                    .unwrap_or(owner);
            }
            path.push(owner);
            current = owner;
        }
        current
    }
}
