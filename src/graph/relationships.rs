//! Per-kind relationship extraction
//!
//! Each extractor turns a typed payload into the links it declares to other
//! objects. Targets are declared by reference and resolved later against the
//! graph, so a target that was never fetched simply produces no edge.

use super::EdgeType;
use crate::models::crd::CrossNamespaceReference;
use crate::models::{ObjectReference, Payload, Resource};

const FLUX_SOURCE_API_VERSION: &str = "source.toolkit.fluxcd.io/v1";
const CERTIFICATE_NAME_ANNOTATION: &str = "cert-manager.io/certificate-name";
const AAD_POD_IDENTITY_LABEL: &str = "aadpodidbinding";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipDirection {
    /// Edge from the current node to the referenced node
    To,
    /// Edge from the referenced node to the current node
    From,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipDescription {
    pub reference: ObjectReference,
    pub edge_type: EdgeType,
    pub direction: RelationshipDirection,
}

impl RelationshipDescription {
    pub fn to(edge_type: EdgeType, reference: ObjectReference) -> Self {
        Self {
            reference,
            edge_type,
            direction: RelationshipDirection::To,
        }
    }

    pub fn from_target(edge_type: EdgeType, reference: ObjectReference) -> Self {
        Self {
            reference,
            edge_type,
            direction: RelationshipDirection::From,
        }
    }
}

fn local(api_version: &str, kind: &str, name: impl Into<String>) -> ObjectReference {
    ObjectReference::new(api_version, kind, "", name)
}

pub fn pod(resource: &Resource, payload: &Payload) -> Vec<RelationshipDescription> {
    let Payload::Pod(pod) = payload else {
        return Vec::new();
    };
    let mut relationships = Vec::new();

    if let Some(binding) = resource.labels().get(AAD_POD_IDENTITY_LABEL) {
        relationships.push(RelationshipDescription::from_target(
            EdgeType::Consumes,
            local("aadpodidentity.k8s.io/v1", "AzureIdentityBinding", binding.as_str()),
        ));
    }

    let Some(spec) = &pod.spec else {
        return relationships;
    };

    if let Some(sa) = spec.service_account_name.as_deref().filter(|s| !s.is_empty()) {
        relationships.push(RelationshipDescription::to(
            EdgeType::Consumes,
            local("v1", "ServiceAccount", sa),
        ));
    }

    for secret in spec.image_pull_secrets.iter().flatten() {
        relationships.push(RelationshipDescription::to(
            EdgeType::Consumes,
            local("v1", "Secret", secret.name.as_str()),
        ));
    }

    for volume in spec.volumes.iter().flatten() {
        if let Some(name) = volume.secret.as_ref().and_then(|s| s.secret_name.as_deref()) {
            relationships.push(RelationshipDescription::to(
                EdgeType::Consumes,
                local("v1", "Secret", name),
            ));
        }
        if let Some(config_map) = &volume.config_map {
            relationships.push(RelationshipDescription::to(
                EdgeType::Consumes,
                local("v1", "ConfigMap", config_map.name.as_str()),
            ));
        }
        let projected = volume
            .projected
            .iter()
            .flat_map(|p| p.sources.iter().flatten());
        for source in projected {
            if let Some(secret) = &source.secret {
                relationships.push(RelationshipDescription::to(
                    EdgeType::Consumes,
                    local("v1", "Secret", secret.name.as_str()),
                ));
            }
            if let Some(config_map) = &source.config_map {
                relationships.push(RelationshipDescription::to(
                    EdgeType::Consumes,
                    local("v1", "ConfigMap", config_map.name.as_str()),
                ));
            }
        }
    }

    relationships
}

pub fn endpoint_slice(_resource: &Resource, payload: &Payload) -> Vec<RelationshipDescription> {
    let Payload::EndpointSlice(slice) = payload else {
        return Vec::new();
    };
    slice
        .endpoints
        .iter()
        .filter_map(|endpoint| endpoint.target_ref.as_ref())
        .filter_map(|target| {
            Some(RelationshipDescription::to(
                EdgeType::Reference,
                ObjectReference::new(
                    target.api_version.as_deref().unwrap_or("v1"),
                    target.kind.as_deref()?,
                    target.namespace.as_deref().unwrap_or_default(),
                    target.name.as_deref()?,
                ),
            ))
        })
        .collect()
}

pub fn secret(resource: &Resource, _payload: &Payload) -> Vec<RelationshipDescription> {
    resource
        .annotations()
        .get(CERTIFICATE_NAME_ANNOTATION)
        .map(|certificate| {
            RelationshipDescription::from_target(
                EdgeType::Owner,
                local("cert-manager.io/v1", "Certificate", certificate.as_str()),
            )
        })
        .into_iter()
        .collect()
}

pub fn service_account(_resource: &Resource, payload: &Payload) -> Vec<RelationshipDescription> {
    let Payload::ServiceAccount(sa) = payload else {
        return Vec::new();
    };
    sa.secrets
        .iter()
        .flatten()
        .filter_map(|secret| secret.name.as_deref())
        .map(|name| RelationshipDescription::to(EdgeType::Owner, local("v1", "Secret", name)))
        .collect()
}

pub fn ingress(_resource: &Resource, payload: &Payload) -> Vec<RelationshipDescription> {
    let Payload::Ingress(ingress) = payload else {
        return Vec::new();
    };
    let Some(spec) = &ingress.spec else {
        return Vec::new();
    };

    let paths = spec
        .rules
        .iter()
        .flatten()
        .filter_map(|rule| rule.http.as_ref())
        .flat_map(|http| http.paths.iter().map(|path| &path.backend));
    let backends = spec.default_backend.iter().chain(paths);

    let mut relationships: Vec<_> = backends
        .filter_map(|backend| backend.service.as_ref())
        .map(|service| {
            RelationshipDescription::to(
                EdgeType::Reference,
                local("v1", "Service", service.name.as_str()),
            )
        })
        .collect();

    for tls in spec.tls.iter().flatten() {
        if let Some(secret) = &tls.secret_name {
            relationships.push(RelationshipDescription::to(
                EdgeType::Consumes,
                local("v1", "Secret", secret.as_str()),
            ));
        }
    }
    relationships
}

pub fn role_binding(_resource: &Resource, payload: &Payload) -> Vec<RelationshipDescription> {
    let Payload::RoleBinding(binding) = payload else {
        return Vec::new();
    };
    let mut relationships = vec![RelationshipDescription::to(
        EdgeType::Reference,
        local(
            "rbac.authorization.k8s.io/v1",
            &binding.role_ref.kind,
            binding.role_ref.name.as_str(),
        ),
    )];

    for subject in binding.subjects.iter().flatten() {
        if subject.kind != "ServiceAccount" {
            continue;
        }
        relationships.push(RelationshipDescription::to(
            EdgeType::Reference,
            ObjectReference::new(
                "v1",
                "ServiceAccount",
                subject.namespace.clone().unwrap_or_default(),
                subject.name.as_str(),
            ),
        ));
    }
    relationships
}

pub fn horizontal_pod_autoscaler(
    _resource: &Resource,
    payload: &Payload,
) -> Vec<RelationshipDescription> {
    let Payload::HorizontalPodAutoscaler(hpa) = payload else {
        return Vec::new();
    };
    hpa.spec
        .as_ref()
        .map(|spec| {
            let target = &spec.scale_target_ref;
            RelationshipDescription::to(
                EdgeType::Reference,
                local(
                    target.api_version.as_deref().unwrap_or_default(),
                    &target.kind,
                    target.name.as_str(),
                ),
            )
        })
        .into_iter()
        .collect()
}

fn flux_source(reference: &CrossNamespaceReference) -> ObjectReference {
    ObjectReference::new(
        reference
            .api_version
            .as_deref()
            .unwrap_or(FLUX_SOURCE_API_VERSION),
        &reference.kind,
        reference.namespace.clone().unwrap_or_default(),
        &reference.name,
    )
}

pub fn kustomization(_resource: &Resource, payload: &Payload) -> Vec<RelationshipDescription> {
    let Payload::Kustomization(kustomization) = payload else {
        return Vec::new();
    };
    let spec = &kustomization.spec;
    let mut relationships = Vec::new();

    if let Some(sa) = &spec.service_account_name {
        relationships.push(RelationshipDescription::to(
            EdgeType::Consumes,
            local("v1", "ServiceAccount", sa.as_str()),
        ));
    }
    if let Some(source) = &spec.source_ref {
        relationships.push(RelationshipDescription::to(
            EdgeType::Consumes,
            flux_source(source),
        ));
    }
    for check in &spec.health_checks {
        relationships.push(RelationshipDescription::to(
            EdgeType::Reference,
            ObjectReference::new(
                check.api_version.clone().unwrap_or_default(),
                &check.kind,
                check.namespace.clone().unwrap_or_default(),
                &check.name,
            ),
        ));
    }
    relationships
}

pub fn git_repository(_resource: &Resource, payload: &Payload) -> Vec<RelationshipDescription> {
    let Payload::GitRepository(repository) = payload else {
        return Vec::new();
    };
    repository
        .spec
        .secret_ref
        .as_ref()
        .map(|secret| {
            RelationshipDescription::to(
                EdgeType::Consumes,
                local("v1", "Secret", secret.name.as_str()),
            )
        })
        .into_iter()
        .collect()
}

pub fn helm_release(_resource: &Resource, payload: &Payload) -> Vec<RelationshipDescription> {
    let Payload::HelmRelease(release) = payload else {
        return Vec::new();
    };
    let spec = &release.spec;
    let mut relationships = Vec::new();

    if let Some(sa) = &spec.service_account_name {
        relationships.push(RelationshipDescription::to(
            EdgeType::Consumes,
            local("v1", "ServiceAccount", sa.as_str()),
        ));
    }

    let chart_source = spec
        .chart
        .as_ref()
        .and_then(|chart| chart.spec.source_ref.as_ref());
    for source in chart_source.into_iter().chain(spec.chart_ref.as_ref()) {
        relationships.push(RelationshipDescription::to(
            EdgeType::Consumes,
            flux_source(source),
        ));
    }

    for values in &spec.values_from {
        relationships.push(RelationshipDescription::to(
            EdgeType::Consumes,
            local("v1", &values.kind, values.name.as_str()),
        ));
    }
    relationships
}
