//! Resource type discovery

use super::client::{DiscoveredResource, MetadataClient};
use crate::graph::GraphError;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Select the resource types a run should list
///
/// Walks the preferred resources in server order and drops a type when its
/// storage version was already reached through another group/version, when
/// it cannot be listed, or when it is cluster scoped and the run is limited to
/// one namespace.
pub async fn discover<C>(
    client: &C,
    namespaced: bool,
    cancel: &CancellationToken,
) -> Result<Vec<DiscoveredResource>, GraphError>
where
    C: MetadataClient + ?Sized,
{
    let groups = tokio::select! {
        _ = cancel.cancelled() => return Err(GraphError::Cancelled),
        groups = client.list_preferred_resources() => groups.map_err(GraphError::Discovery)?,
    };

    let mut storage_versions: HashMap<String, String> = HashMap::new();
    let mut discovered = Vec::new();

    for group in groups {
        let (api_group, version) = match group.group_version.split_once('/') {
            Some((g, v)) => (g.to_string(), v.to_string()),
            None => (String::new(), group.group_version.clone()),
        };

        for res in group.resources {
            if let Some(hash) = res.storage_version_hash.as_deref().filter(|h| !h.is_empty()) {
                match storage_versions.get(hash) {
                    Some(first) if *first != group.group_version => {
                        tracing::debug!(
                            group_version = %group.group_version,
                            kind = %res.kind,
                            first_seen = %first,
                            "Skipping duplicate resource"
                        );
                        continue;
                    }
                    Some(_) => {}
                    None => {
                        storage_versions.insert(hash.to_string(), group.group_version.clone());
                    }
                }
            }

            if !res.verbs.iter().any(|verb| verb == "list") {
                tracing::debug!(group_version = %group.group_version, kind = %res.kind, "Skipping non listable resource");
                continue;
            }

            if namespaced && !res.namespaced {
                tracing::debug!(group_version = %group.group_version, kind = %res.kind, "Skipping cluster wide resource");
                continue;
            }

            discovered.push(DiscoveredResource {
                group: api_group.clone(),
                version: version.clone(),
                resource: res.name,
                kind: res.kind,
                namespaced: res.namespaced,
            });
        }
    }

    tracing::info!("Discovered {} listable resource types", discovered.len());
    Ok(discovered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kube::client::{ApiGroupResources, ApiResourceInfo, MockMetadataClient};

    fn resource(name: &str, kind: &str, namespaced: bool, hash: &str) -> ApiResourceInfo {
        ApiResourceInfo {
            name: name.to_string(),
            kind: kind.to_string(),
            namespaced,
            verbs: vec!["get".into(), "list".into(), "watch".into()],
            storage_version_hash: Some(hash.to_string()),
        }
    }

    fn mock_with(groups: Vec<ApiGroupResources>) -> MockMetadataClient {
        let mut client = MockMetadataClient::new();
        client
            .expect_list_preferred_resources()
            .times(1)
            .returning(move || Ok(groups.clone()));
        client
    }

    #[tokio::test]
    async fn test_duplicate_storage_version_keeps_first() {
        let client = mock_with(vec![
            ApiGroupResources {
                group_version: "extensions/v1beta1".into(),
                resources: vec![resource("ingresses", "Ingress", true, "abc")],
            },
            ApiGroupResources {
                group_version: "networking.k8s.io/v1".into(),
                resources: vec![resource("ingresses", "NetworkIngress", true, "abc")],
            },
        ]);

        let discovered = discover(&client, false, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(discovered.len(), 1);
        assert_eq!(discovered[0].group, "extensions");
        assert_eq!(discovered[0].kind, "Ingress");
    }

    #[tokio::test]
    async fn test_skips_unlistable_and_cluster_scoped() {
        let mut review = resource("tokenreviews", "TokenReview", false, "t1");
        review.verbs = vec!["create".into()];

        let client = mock_with(vec![ApiGroupResources {
            group_version: "v1".into(),
            resources: vec![
                resource("pods", "Pod", true, "p1"),
                resource("nodes", "Node", false, "n1"),
                review,
            ],
        }]);

        let discovered = discover(&client, true, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(discovered.len(), 1);
        assert_eq!(discovered[0].kind, "Pod");
        assert_eq!(discovered[0].group, "");
        assert_eq!(discovered[0].version, "v1");
    }

    #[tokio::test]
    async fn test_resources_without_hash_are_not_deduplicated() {
        let mut a = resource("alphas", "Alpha", true, "");
        a.storage_version_hash = None;
        let b = resource("betas", "Beta", true, "");

        let client = mock_with(vec![ApiGroupResources {
            group_version: "example.io/v1".into(),
            resources: vec![a, b],
        }]);

        let discovered = discover(&client, false, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(discovered.len(), 2);
    }

    #[tokio::test]
    async fn test_metadata_error_is_fatal() {
        let mut client = MockMetadataClient::new();
        client
            .expect_list_preferred_resources()
            .returning(|| Err("connection refused".into()));

        let err = discover(&client, false, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::Discovery(_)));
    }
}
