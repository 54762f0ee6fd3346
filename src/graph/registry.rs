//! Kind registry
//!
//! Maps a kind name to the decoder producing its typed payload and the
//! extractor producing its relationships. Lookups are exact on the kind name.

use super::relationships::{self, RelationshipDescription};
use super::GraphError;
use crate::models::{Payload, ProjectedKind, Projection, Resource};
use serde_json::Value;
use std::collections::HashMap;

pub type Decoder = fn(&Value) -> Result<Payload, serde_json::Error>;
pub type Extractor = fn(&Resource, &Payload) -> Vec<RelationshipDescription>;

/// Decoder and relationship extractor for one kind
#[derive(Clone, Copy)]
pub struct KindHandler {
    pub kind: ProjectedKind,
    pub decode: Decoder,
    pub relationships: Option<Extractor>,
}

impl std::fmt::Debug for KindHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindHandler")
            .field("kind", &self.kind)
            .field("relationships", &self.relationships.is_some())
            .finish()
    }
}

macro_rules! decoder {
    ($variant:ident) => {
        |value: &Value| -> Result<Payload, serde_json::Error> {
            Ok(Payload::$variant(Box::new(serde_json::from_value(
                value.clone(),
            )?)))
        }
    };
}

#[derive(Debug, Clone)]
pub struct KindRegistry {
    handlers: HashMap<&'static str, KindHandler>,
}

impl KindRegistry {
    /// A registry with no kinds
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler, replacing any earlier one for the same kind
    pub fn register(&mut self, handler: KindHandler) {
        self.handlers.insert(handler.kind.as_str(), handler);
    }

    pub fn get(&self, kind: &str) -> Option<&KindHandler> {
        self.handlers.get(kind)
    }

    /// Decode the typed projection for a resource
    ///
    /// A decode failure is kept on the resource as an invalid projection so
    /// rules can report it instead of aborting the run.
    pub fn project(&self, resource: Resource) -> Resource {
        let Some(handler) = self.get(resource.kind()) else {
            return resource;
        };
        let projection = match (handler.decode)(resource.object()) {
            Ok(payload) => Projection::Typed(payload),
            Err(e) => {
                tracing::warn!("Could not decode {}: {}", resource.reference(), e);
                Projection::Invalid(e.to_string())
            }
        };
        resource.with_projection(projection)
    }

    /// Build a projected resource from its generic form
    pub fn ingest(&self, object: Value) -> Result<Resource, GraphError> {
        let resource = Resource::from_value(object)?;
        Ok(self.project(resource))
    }

    /// Relationships declared by a resource
    ///
    /// Untyped and invalid projections declare none.
    pub fn relationships(&self, resource: &Resource) -> Vec<RelationshipDescription> {
        let Some(payload) = resource.payload() else {
            return Vec::new();
        };
        self.get(resource.kind())
            .and_then(|handler| handler.relationships)
            .map(|extract| extract(resource, payload))
            .unwrap_or_default()
    }

    /// Registry with every built-in kind
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for kind in ProjectedKind::all() {
            registry.register(builtin_handler(*kind));
        }
        registry
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn handler(kind: ProjectedKind, decode: Decoder, relationships: Option<Extractor>) -> KindHandler {
    KindHandler {
        kind,
        decode,
        relationships,
    }
}

fn builtin_handler(kind: ProjectedKind) -> KindHandler {
    match kind {
        ProjectedKind::Pod => handler(kind, decoder!(Pod), Some(relationships::pod)),
        ProjectedKind::Node => handler(kind, decoder!(Node), None),
        ProjectedKind::DaemonSet => handler(kind, decoder!(DaemonSet), None),
        ProjectedKind::Deployment => handler(kind, decoder!(Deployment), None),
        ProjectedKind::Ingress => handler(kind, decoder!(Ingress), Some(relationships::ingress)),
        ProjectedKind::EndpointSlice => handler(
            kind,
            decoder!(EndpointSlice),
            Some(relationships::endpoint_slice),
        ),
        ProjectedKind::ServiceAccount => handler(
            kind,
            decoder!(ServiceAccount),
            Some(relationships::service_account),
        ),
        ProjectedKind::RoleBinding => handler(
            kind,
            decoder!(RoleBinding),
            Some(relationships::role_binding),
        ),
        ProjectedKind::Secret => handler(kind, decoder!(Secret), Some(relationships::secret)),
        ProjectedKind::HorizontalPodAutoscaler => handler(
            kind,
            decoder!(HorizontalPodAutoscaler),
            Some(relationships::horizontal_pod_autoscaler),
        ),
        ProjectedKind::Kustomization => handler(
            kind,
            decoder!(Kustomization),
            Some(relationships::kustomization),
        ),
        ProjectedKind::GitRepository => handler(
            kind,
            decoder!(GitRepository),
            Some(relationships::git_repository),
        ),
        ProjectedKind::HelmRelease => handler(
            kind,
            decoder!(HelmRelease),
            Some(relationships::helm_release),
        ),
        ProjectedKind::Certificate => handler(kind, decoder!(Certificate), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_covers_all_projected_kinds() {
        let registry = KindRegistry::builtin();
        for kind in ProjectedKind::all() {
            assert!(registry.get(kind.as_str()).is_some(), "{kind} missing");
        }
        assert!(registry.get("pod").is_none());
    }

    #[test]
    fn test_project_typed_payload() {
        let resource = KindRegistry::builtin()
            .ingest(json!({
                "apiVersion": "v1",
                "kind": "Node",
                "metadata": {"name": "node-1", "uid": "00000000-0000-0000-0000-000000000001"},
                "spec": {"taints": [{"key": "a", "effect": "NoSchedule"}]}
            }))
            .unwrap();
        assert!(matches!(resource.payload(), Some(Payload::Node(_))));
    }

    #[test]
    fn test_project_invalid_payload() {
        let resource = KindRegistry::builtin()
            .ingest(json!({
                "apiVersion": "v1",
                "kind": "Pod",
                "metadata": {"name": "web", "namespace": "apps",
                             "uid": "00000000-0000-0000-0000-000000000002"},
                "spec": {"containers": "not-a-list"}
            }))
            .unwrap();
        assert!(matches!(resource.projection(), Projection::Invalid(_)));
        assert!(KindRegistry::builtin().relationships(&resource).is_empty());
    }

    #[test]
    fn test_unregistered_kind_stays_untyped() {
        let resource = KindRegistry::empty()
            .ingest(json!({
                "apiVersion": "v1",
                "kind": "Pod",
                "metadata": {"name": "web", "namespace": "apps",
                             "uid": "00000000-0000-0000-0000-000000000003"}
            }))
            .unwrap();
        assert!(matches!(resource.projection(), Projection::Untyped));
    }
}
