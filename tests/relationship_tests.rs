//! Relationship edge tests
//!
//! Every edge is checked for direction and type on a fully linked graph.

use kube_checker::graph::{EdgeType, Graph, KindRegistry, Node};
use kube_checker::models::ObjectReference;
use serde_json::{json, Value};

fn uid(n: u64) -> String {
    format!("00000000-0000-0000-0000-{:012x}", n)
}

fn metadata(name: &str, n: u64) -> Value {
    json!({"name": name, "namespace": "apps", "uid": uid(n)})
}

fn service_account(name: &str, n: u64) -> Value {
    json!({"apiVersion": "v1", "kind": "ServiceAccount", "metadata": metadata(name, n)})
}

fn pod_using(service_account: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": metadata("web", 1),
        "spec": {
            "serviceAccountName": service_account,
            "containers": [{"name": "web"}]
        }
    })
}

fn build(objects: Vec<Value>) -> Graph {
    Graph::from_objects(&KindRegistry::builtin(), objects).unwrap()
}

fn node<'a>(graph: &'a Graph, api_version: &str, kind: &str, name: &str) -> &'a Node {
    graph
        .get(&ObjectReference::new(api_version, kind, "apps", name))
        .unwrap()
}

/// Whether the graph holds `from -> to` with the given type
fn has_edge(graph: &Graph, from: &Node, to: &Node, edge_type: EdgeType) -> bool {
    graph
        .outgoing(from.id())
        .iter()
        .any(|edge| edge.to == to.id() && edge.edge_type == edge_type)
}

#[test]
fn test_pod_consumes_existing_service_account() {
    let graph = build(vec![pod_using("sa-x"), service_account("sa-x", 2)]);

    let pod = node(&graph, "v1", "Pod", "web");
    let sa = node(&graph, "v1", "ServiceAccount", "sa-x");
    assert!(has_edge(&graph, pod, sa, EdgeType::Consumes));
    assert!(!has_edge(&graph, sa, pod, EdgeType::Consumes));
}

#[test]
fn test_missing_service_account_yields_no_edge() {
    let graph = build(vec![pod_using("sa-x"), service_account("other", 2)]);

    let pod = node(&graph, "v1", "Pod", "web");
    assert!(graph.edges(pod.id()).is_empty());
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn test_service_account_in_other_namespace_is_not_linked() {
    let mut other = service_account("sa-x", 2);
    other["metadata"]["namespace"] = json!("platform");
    let graph = build(vec![pod_using("sa-x"), other]);
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn test_ingress_references_service_and_consumes_tls_secret() {
    let graph = build(vec![
        json!({
            "apiVersion": "networking.k8s.io/v1",
            "kind": "Ingress",
            "metadata": metadata("web", 1),
            "spec": {
                "tls": [{"hosts": ["app.example.com"], "secretName": "web-tls"}],
                "rules": [{
                    "host": "app.example.com",
                    "http": {"paths": [{
                        "path": "/",
                        "pathType": "Prefix",
                        "backend": {"service": {"name": "web", "port": {"number": 80}}}
                    }]}
                }]
            }
        }),
        json!({"apiVersion": "v1", "kind": "Service", "metadata": metadata("web", 2)}),
        json!({"apiVersion": "v1", "kind": "Secret", "metadata": metadata("web-tls", 3)}),
    ]);

    let ingress = node(&graph, "networking.k8s.io/v1", "Ingress", "web");
    let service = node(&graph, "v1", "Service", "web");
    let secret = node(&graph, "v1", "Secret", "web-tls");
    assert!(has_edge(&graph, ingress, service, EdgeType::Reference));
    assert!(has_edge(&graph, ingress, secret, EdgeType::Consumes));
}

#[test]
fn test_certificate_owns_its_secret() {
    let graph = build(vec![
        json!({
            "apiVersion": "cert-manager.io/v1",
            "kind": "Certificate",
            "metadata": metadata("web", 1),
            "spec": {"secretName": "web-tls", "dnsNames": ["app.example.com"]}
        }),
        json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {
                "name": "web-tls",
                "namespace": "apps",
                "uid": uid(2),
                "annotations": {"cert-manager.io/certificate-name": "web"}
            }
        }),
    ]);

    let certificate = node(&graph, "cert-manager.io/v1", "Certificate", "web");
    let secret = node(&graph, "v1", "Secret", "web-tls");
    assert!(has_edge(&graph, certificate, secret, EdgeType::Owner));
    assert_eq!(graph.find_root_owner(secret).id(), certificate.id());
}

#[test]
fn test_flux_sources_are_consumed() {
    let graph = build(vec![
        json!({
            "apiVersion": "kustomize.toolkit.fluxcd.io/v1",
            "kind": "Kustomization",
            "metadata": metadata("apps", 1),
            "spec": {
                "path": "./apps",
                "sourceRef": {"kind": "GitRepository", "name": "fleet"}
            }
        }),
        json!({
            "apiVersion": "source.toolkit.fluxcd.io/v1",
            "kind": "GitRepository",
            "metadata": metadata("fleet", 2),
            "spec": {"url": "https://example.com/fleet.git", "secretRef": {"name": "fleet-auth"}}
        }),
        json!({"apiVersion": "v1", "kind": "Secret", "metadata": metadata("fleet-auth", 3)}),
    ]);

    let kustomization = node(&graph, "kustomize.toolkit.fluxcd.io/v1", "Kustomization", "apps");
    let repository = node(&graph, "source.toolkit.fluxcd.io/v1", "GitRepository", "fleet");
    let secret = node(&graph, "v1", "Secret", "fleet-auth");
    assert!(has_edge(&graph, kustomization, repository, EdgeType::Consumes));
    assert!(has_edge(&graph, repository, secret, EdgeType::Consumes));
}

#[test]
fn test_helm_release_consumes_values_and_service_account() {
    let graph = build(vec![
        json!({
            "apiVersion": "helm.toolkit.fluxcd.io/v2",
            "kind": "HelmRelease",
            "metadata": metadata("podinfo", 1),
            "spec": {
                "serviceAccountName": "flux-apps",
                "chart": {"spec": {
                    "chart": "podinfo",
                    "sourceRef": {"kind": "HelmRepository", "name": "podinfo"}
                }},
                "valuesFrom": [{"kind": "ConfigMap", "name": "podinfo-values"}]
            }
        }),
        service_account("flux-apps", 2),
        json!({"apiVersion": "v1", "kind": "ConfigMap", "metadata": metadata("podinfo-values", 3)}),
        json!({
            "apiVersion": "source.toolkit.fluxcd.io/v1",
            "kind": "HelmRepository",
            "metadata": metadata("podinfo", 4)
        }),
    ]);

    let release = node(&graph, "helm.toolkit.fluxcd.io/v2", "HelmRelease", "podinfo");
    let sa = node(&graph, "v1", "ServiceAccount", "flux-apps");
    let values = node(&graph, "v1", "ConfigMap", "podinfo-values");
    let repository = node(&graph, "source.toolkit.fluxcd.io/v1", "HelmRepository", "podinfo");
    assert!(has_edge(&graph, release, sa, EdgeType::Consumes));
    assert!(has_edge(&graph, release, values, EdgeType::Consumes));
    assert!(has_edge(&graph, release, repository, EdgeType::Consumes));
}

#[test]
fn test_undecodable_payload_yields_no_relationships() {
    let broken = json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": metadata("web", 1),
        "spec": {"serviceAccountName": "sa-x", "containers": "web"}
    });
    let graph = build(vec![broken, service_account("sa-x", 2)]);
    assert_eq!(graph.len(), 2);
    assert_eq!(graph.edge_count(), 0);
}
