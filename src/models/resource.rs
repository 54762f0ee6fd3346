//! Resource identity and metadata
//!
//! A [`Resource`] is one cluster object observed at snapshot time. It keeps the
//! generic JSON form of the object alongside the metadata every rule and the
//! graph builder need, and optionally a typed [`Projection`].

use super::payload::{Payload, Projection};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Errors raised while turning a raw object into a [`Resource`]
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("object is missing {0}")]
    MissingField(&'static str),

    #[error("object metadata is malformed: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("resource uid is empty: {0}")]
    MissingUid(String),
}

/// Lightweight `(apiVersion, kind, namespace, name)` identity
///
/// Used both as a graph-independent key and as the declared target of a
/// relationship before the target is known to exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectReference {
    pub api_version: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ObjectReference {
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Stable string key: `apiVersion/kind/namespace/name`
    ///
    /// Cluster-scoped objects have an empty namespace segment.
    pub fn id(&self) -> String {
        [
            self.api_version.as_str(),
            self.kind.as_str(),
            self.namespace.as_str(),
            self.name.as_str(),
        ]
        .join("/")
    }

    /// `apiVersion/kind`
    pub fn gvk(&self) -> String {
        format!("{}/{}", self.api_version, self.kind)
    }

    /// Fill in the namespace when the reference did not declare one
    pub fn or_namespace(mut self, namespace: &str) -> Self {
        if self.namespace.is_empty() {
            self.namespace = namespace.to_string();
        }
        self
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Structural pointer to the object managing this one's lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
    pub controller: bool,
}

/// One entry of the object's write history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedField {
    pub api_version: String,
    pub manager: String,
    pub operation: String,
}

/// One cluster object observed at snapshot time
#[derive(Debug, Clone)]
pub struct Resource {
    reference: ObjectReference,
    uid: String,
    owner_references: Vec<OwnerReference>,
    managed_fields: Vec<ManagedField>,
    labels: BTreeMap<String, String>,
    annotations: BTreeMap<String, String>,
    object: Value,
    projection: Projection,
}

impl Resource {
    /// Build an untyped resource from the object's generic JSON form
    ///
    /// Fails when `apiVersion`, `kind` or `metadata.name` are absent, or when
    /// the object carries no UID.
    pub fn from_value(object: Value) -> Result<Self, ResourceError> {
        let api_version = object
            .get("apiVersion")
            .and_then(|v| v.as_str())
            .ok_or(ResourceError::MissingField("apiVersion"))?
            .to_string();
        let kind = object
            .get("kind")
            .and_then(|k| k.as_str())
            .ok_or(ResourceError::MissingField("kind"))?
            .to_string();

        let metadata: ObjectMeta = match object.get("metadata") {
            Some(metadata) => serde_json::from_value(metadata.clone())?,
            None => return Err(ResourceError::MissingField("metadata")),
        };

        let name = metadata
            .name
            .clone()
            .ok_or(ResourceError::MissingField("metadata.name"))?;
        let reference = ObjectReference {
            api_version,
            kind,
            namespace: metadata.namespace.clone().unwrap_or_default(),
            name,
        };

        let uid = metadata.uid.clone().unwrap_or_default();
        if uid.is_empty() {
            return Err(ResourceError::MissingUid(reference.id()));
        }

        let owner_references = metadata
            .owner_references
            .unwrap_or_default()
            .into_iter()
            .map(|owner| OwnerReference {
                api_version: owner.api_version,
                kind: owner.kind,
                name: owner.name,
                uid: owner.uid,
                controller: owner.controller.unwrap_or(false),
            })
            .collect();

        let managed_fields = metadata
            .managed_fields
            .unwrap_or_default()
            .into_iter()
            .map(|entry| ManagedField {
                api_version: entry.api_version.unwrap_or_default(),
                manager: entry.manager.unwrap_or_default(),
                operation: entry.operation.unwrap_or_default(),
            })
            .collect();

        Ok(Self {
            reference,
            uid,
            owner_references,
            managed_fields,
            labels: metadata.labels.unwrap_or_default(),
            annotations: metadata.annotations.unwrap_or_default(),
            object,
            projection: Projection::Untyped,
        })
    }

    /// Attach the typed projection produced by the kind registry
    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn reference(&self) -> &ObjectReference {
        &self.reference
    }

    pub fn api_version(&self) -> &str {
        &self.reference.api_version
    }

    pub fn kind(&self) -> &str {
        &self.reference.kind
    }

    pub fn namespace(&self) -> &str {
        &self.reference.namespace
    }

    pub fn name(&self) -> &str {
        &self.reference.name
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn owner_references(&self) -> &[OwnerReference] {
        &self.owner_references
    }

    /// Owner references flagged as the controller
    pub fn controller_references(&self) -> impl Iterator<Item = &OwnerReference> {
        self.owner_references.iter().filter(|owner| owner.controller)
    }

    pub fn managed_fields(&self) -> &[ManagedField] {
        &self.managed_fields
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    pub fn annotations(&self) -> &BTreeMap<String, String> {
        &self.annotations
    }

    /// The object exactly as returned by the API server
    pub fn object(&self) -> &Value {
        &self.object
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// The typed payload, if the kind is projected and decoded cleanly
    pub fn payload(&self) -> Option<&Payload> {
        match &self.projection {
            Projection::Typed(payload) => Some(payload),
            _ => None,
        }
    }

    /// Helm stores release state in Secrets of this type; they are not first-class resources
    pub fn is_helm_release_storage(&self) -> bool {
        self.reference.api_version == "v1"
            && self.reference.kind == "Secret"
            && self.object.get("type").and_then(|t| t.as_str()) == Some("helm.sh/release.v1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reference_id_and_gvk() {
        let reference = ObjectReference::new("apps/v1", "Deployment", "default", "web");
        assert_eq!(reference.id(), "apps/v1/Deployment/default/web");
        assert_eq!(reference.gvk(), "apps/v1/Deployment");
        assert_eq!(reference.to_string(), reference.id());
    }

    #[test]
    fn test_or_namespace_only_fills_empty() {
        let declared = ObjectReference::new("v1", "Secret", "", "tls").or_namespace("web");
        assert_eq!(declared.namespace, "web");

        let explicit = ObjectReference::new("v1", "Secret", "other", "tls").or_namespace("web");
        assert_eq!(explicit.namespace, "other");
    }

    #[test]
    fn test_from_value_reads_metadata() {
        let resource = Resource::from_value(json!({
            "apiVersion": "apps/v1",
            "kind": "ReplicaSet",
            "metadata": {
                "name": "web-5d4f",
                "namespace": "default",
                "uid": "6f1c3f4e-4b1c-4f5e-9a53-3b8a8c1e0001",
                "labels": {"app": "web"},
                "ownerReferences": [
                    {"apiVersion": "apps/v1", "kind": "Deployment", "name": "web",
                     "uid": "6f1c3f4e-4b1c-4f5e-9a53-3b8a8c1e0002", "controller": true},
                    {"apiVersion": "v1", "kind": "ConfigMap", "name": "other",
                     "uid": "6f1c3f4e-4b1c-4f5e-9a53-3b8a8c1e0003"}
                ],
                "managedFields": [
                    {"apiVersion": "apps/v1", "manager": "kube-controller-manager", "operation": "Update"}
                ]
            }
        }))
        .unwrap();

        assert_eq!(resource.reference().id(), "apps/v1/ReplicaSet/default/web-5d4f");
        assert_eq!(resource.owner_references().len(), 2);
        assert_eq!(resource.controller_references().count(), 1);
        assert_eq!(resource.managed_fields()[0].manager, "kube-controller-manager");
        assert_eq!(resource.labels().get("app").map(String::as_str), Some("web"));
        assert!(resource.payload().is_none());
    }

    #[test]
    fn test_from_value_requires_uid() {
        let err = Resource::from_value(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "settings", "namespace": "default"}
        }))
        .unwrap_err();
        assert!(matches!(err, ResourceError::MissingUid(id) if id == "v1/ConfigMap/default/settings"));
    }

    #[test]
    fn test_from_value_requires_kind() {
        let err = Resource::from_value(json!({
            "apiVersion": "v1",
            "metadata": {"name": "x", "uid": "6f1c3f4e-4b1c-4f5e-9a53-3b8a8c1e0001"}
        }))
        .unwrap_err();
        assert!(matches!(err, ResourceError::MissingField("kind")));
    }

    #[test]
    fn test_helm_release_storage_detection() {
        let secret = Resource::from_value(json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "type": "helm.sh/release.v1",
            "metadata": {"name": "sh.helm.release.v1.app.v1", "namespace": "apps",
                         "uid": "6f1c3f4e-4b1c-4f5e-9a53-3b8a8c1e0001"}
        }))
        .unwrap();
        assert!(secret.is_helm_release_storage());
    }
}
