//! Rules evaluated on every node

use super::links;
use crate::check::registry::{RuleRegistry, ALL_KINDS};
use crate::check::rule::{Evaluation, Rule, RuleContext};
use crate::check::CheckError;
use crate::graph::Node;
use std::collections::BTreeSet;

pub const KUSTOMIZE_NAME_LABEL: &str = "kustomize.toolkit.fluxcd.io/name";
pub const KUSTOMIZE_NAMESPACE_LABEL: &str = "kustomize.toolkit.fluxcd.io/namespace";
pub const HELM_NAME_LABEL: &str = "helm.toolkit.fluxcd.io/name";
pub const HELM_NAMESPACE_LABEL: &str = "helm.toolkit.fluxcd.io/namespace";

pub fn register(registry: &mut RuleRegistry) -> Result<(), CheckError> {
    registry.register_fn(
        ALL_KINDS,
        Rule::new(
            "MissingManagedFields",
            0,
            "Resource does not have managed fields set.",
            links::MANAGED_FIELDS,
        ),
        missing_managed_fields,
    )?;
    registry.register_fn(
        ALL_KINDS,
        Rule::new(
            "MixedApiVersions",
            8,
            "Resource is using different API Versions.",
            links::API_VERSIONS,
        ),
        mixed_api_versions,
    )?;
    registry.register_fn(
        ALL_KINDS,
        Rule::new(
            "UnusedResource",
            6,
            "Resource is not used.",
            links::OWNERS,
        ),
        unused_resource,
    )?;
    registry.register_fn(
        ALL_KINDS,
        Rule::new(
            "FluxUnmanagedResource",
            8,
            "Resource is not managed by Flux.",
            links::FLUX,
        ),
        flux_unmanaged_resource,
    )?;
    Ok(())
}

fn missing_managed_fields(_: &RuleContext<'_>, node: &Node) -> Result<Evaluation, CheckError> {
    Ok(Evaluation::violated_if(
        node.resource().managed_fields().is_empty(),
    ))
}

/// Violated when writes used more than one API version, listing them
fn mixed_api_versions(_: &RuleContext<'_>, node: &Node) -> Result<Evaluation, CheckError> {
    let versions: BTreeSet<&str> = node
        .resource()
        .managed_fields()
        .iter()
        .map(|field| field.api_version.as_str())
        .collect();
    if versions.len() <= 1 {
        return Ok(Evaluation::Pass);
    }
    Ok(Evaluation::Violated(
        versions.into_iter().map(String::from).collect(),
    ))
}

fn unused_resource(ctx: &RuleContext<'_>, node: &Node) -> Result<Evaluation, CheckError> {
    Ok(Evaluation::violated_if(
        ctx.graph.edges(node.id()).is_empty(),
    ))
}

/// Violated unless the root owner carries Kustomization or HelmRelease labels
fn flux_unmanaged_resource(ctx: &RuleContext<'_>, node: &Node) -> Result<Evaluation, CheckError> {
    let root = ctx.graph.find_root_owner(node);
    let reference = root.reference();

    let generated = [
        format!("v1/ServiceAccount/{}/default", reference.namespace),
        format!("v1/ConfigMap/{}/kube-root-ca.crt", reference.namespace),
    ];
    let id = reference.id();
    if generated.contains(&id) {
        tracing::debug!("Ignoring Kubernetes generated resource {}", id);
        return Ok(Evaluation::Pass);
    }

    let labels = root.resource().labels();
    let set = |key: &str| labels.get(key).is_some_and(|value| !value.is_empty());
    let managed = (set(KUSTOMIZE_NAME_LABEL) && set(KUSTOMIZE_NAMESPACE_LABEL))
        || (set(HELM_NAME_LABEL) && set(HELM_NAMESPACE_LABEL));
    Ok(Evaluation::violated_if(!managed))
}
