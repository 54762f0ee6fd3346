//! Cluster collaborators
//!
//! Discovery and fetching talk to the API server through two narrow traits so
//! they can run against fakes in tests. [`KubeClient`] implements both on top
//! of a kube-rs [`Client`].

use async_trait::async_trait;
use kube::api::{Api, ApiResource, DynamicObject, GroupVersionKind, ListParams, TypeMeta};
use kube::Client;
use serde_json::Value;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One resource type as reported by the server's discovery catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiResourceInfo {
    /// Plural resource name, e.g. `deployments`
    pub name: String,
    pub kind: String,
    pub namespaced: bool,
    pub verbs: Vec<String>,
    pub storage_version_hash: Option<String>,
}

/// The resource list of one preferred group/version
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiGroupResources {
    /// `v1` for the core group, `group/version` otherwise
    pub group_version: String,
    pub resources: Vec<ApiResourceInfo>,
}

/// A listable resource type selected by discovery
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiscoveredResource {
    pub group: String,
    pub version: String,
    pub resource: String,
    pub kind: String,
    pub namespaced: bool,
}

impl DiscoveredResource {
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    fn api_resource(&self) -> ApiResource {
        let gvk = GroupVersionKind::gvk(&self.group, &self.version, &self.kind);
        ApiResource::from_gvk_with_plural(&gvk, &self.resource)
    }
}

impl std::fmt::Display for DiscoveredResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}/{}", self.version, self.resource)
        } else {
            write!(f, "{}/{}/{}", self.group, self.version, self.resource)
        }
    }
}

/// Failure listing one resource type
#[derive(Debug, thiserror::Error)]
pub enum ListError {
    /// The type has no backing objects or was removed since discovery
    #[error("resource not found")]
    NotFound,

    #[error(transparent)]
    Other(BoxError),
}

/// Read access to the server's discovery catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataClient: Send + Sync {
    /// One entry per preferred group/version, in server order
    async fn list_preferred_resources(&self) -> Result<Vec<ApiGroupResources>, BoxError>;
}

/// List access to cluster objects
#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// All objects of a type, in the namespace when one is given
    async fn list(
        &self,
        resource: &DiscoveredResource,
        namespace: Option<&str>,
    ) -> Result<Vec<Value>, ListError>;
}

/// kube-rs backed implementation of both collaborator traits
#[derive(Clone)]
pub struct KubeClient {
    client: Client,
}

impl KubeClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn into_resources(list: k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResourceList) -> ApiGroupResources {
    ApiGroupResources {
        group_version: list.group_version,
        resources: list
            .resources
            .into_iter()
            // Subresources such as pods/log are not listable objects
            .filter(|r| !r.name.contains('/'))
            .map(|r| ApiResourceInfo {
                name: r.name,
                kind: r.kind,
                namespaced: r.namespaced,
                verbs: r.verbs,
                storage_version_hash: r.storage_version_hash,
            })
            .collect(),
    }
}

#[async_trait]
impl MetadataClient for KubeClient {
    async fn list_preferred_resources(&self) -> Result<Vec<ApiGroupResources>, BoxError> {
        let mut groups = Vec::new();

        let core = self.client.list_core_api_versions().await?;
        if let Some(version) = core.versions.first() {
            let resources = self.client.list_core_api_resources(version).await?;
            groups.push(into_resources(resources));
        }

        for group in self.client.list_api_groups().await?.groups {
            let Some(preferred) = group.preferred_version.or_else(|| group.versions.into_iter().next())
            else {
                tracing::debug!(group = %group.name, "API group reports no versions");
                continue;
            };
            let resources = self
                .client
                .list_api_group_resources(&preferred.group_version)
                .await?;
            groups.push(into_resources(resources));
        }

        Ok(groups)
    }
}

#[async_trait]
impl ObjectClient for KubeClient {
    async fn list(
        &self,
        resource: &DiscoveredResource,
        namespace: Option<&str>,
    ) -> Result<Vec<Value>, ListError> {
        let ar = resource.api_resource();
        let api: Api<DynamicObject> = match namespace {
            Some(ns) if resource.namespaced => Api::namespaced_with(self.client.clone(), ns, &ar),
            _ => Api::all_with(self.client.clone(), &ar),
        };

        let list = match api.list(&ListParams::default()).await {
            Ok(list) => list,
            Err(kube::Error::Api(e)) if e.code == 404 => return Err(ListError::NotFound),
            Err(e) => return Err(ListError::Other(Box::new(e))),
        };

        // List items come back without their type meta
        list.items
            .into_iter()
            .map(|mut obj| {
                if obj.types.is_none() {
                    obj.types = Some(TypeMeta {
                        api_version: ar.api_version.clone(),
                        kind: ar.kind.clone(),
                    });
                }
                serde_json::to_value(&obj).map_err(|e| ListError::Other(Box::new(e)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_version_for_core_and_groups() {
        let core = DiscoveredResource {
            group: String::new(),
            version: "v1".into(),
            resource: "pods".into(),
            kind: "Pod".into(),
            namespaced: true,
        };
        assert_eq!(core.api_version(), "v1");
        assert_eq!(core.to_string(), "v1/pods");

        let apps = DiscoveredResource {
            group: "apps".into(),
            version: "v1".into(),
            resource: "deployments".into(),
            kind: "Deployment".into(),
            namespaced: true,
        };
        assert_eq!(apps.api_version(), "apps/v1");
        assert_eq!(apps.to_string(), "apps/v1/deployments");
    }

    #[test]
    fn test_api_resource_uses_plural() {
        let resource = DiscoveredResource {
            group: "networking.k8s.io".into(),
            version: "v1".into(),
            resource: "ingresses".into(),
            kind: "Ingress".into(),
            namespaced: true,
        };
        let ar = resource.api_resource();
        assert_eq!(ar.plural, "ingresses");
        assert_eq!(ar.api_version, "networking.k8s.io/v1");
    }
}
