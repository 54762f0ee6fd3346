//! Node rules for AKS and XKS clusters

use super::links;
use crate::check::registry::RuleRegistry;
use crate::check::rule::{Evaluation, Rule, RuleContext};
use crate::check::CheckError;
use crate::graph::Node;

const INSTANCE_TYPE_LABEL: &str = "node.kubernetes.io/instance-type";
const AGENT_POOL_LABEL: &str = "kubernetes.azure.com/agentpool";
const NODE_CLASS_LABEL: &str = "xkf.xenit.io/node-class";
const PURPOSE_LABEL: &str = "xkf.xenit.io/purpose";
const STORAGE_TIER_LABEL: &str = "storagetier";

pub fn register(registry: &mut RuleRegistry) -> Result<(), CheckError> {
    registry.register_fn(
        "node",
        Rule::new(
            "PremiumStorage",
            5,
            "Node should use premium storage.",
            links::AKS_STORAGE,
        ),
        premium_storage,
    )?;
    registry.register_fn(
        "node",
        Rule::new(
            "BurstableInstanceType",
            5,
            "Node should not use burstable types.",
            links::AKS_INSTANCE_TYPES,
        ),
        burstable_instance_type,
    )?;
    registry.register_fn(
        "node",
        Rule::new("XKSLabel", 3, "Node missing XKS labels.", links::XKS),
        xks_labels,
    )?;
    registry.register_fn(
        "node",
        Rule::new(
            "AKSDefaultNodePoolNoTaint",
            3,
            "AKS default node pool is missing taint.",
            links::AKS_SYSTEM_POOL,
        ),
        aks_default_pool_taint,
    )?;
    Ok(())
}

fn missing_label(key: &str) -> Evaluation {
    Evaluation::violated(format!("label {} missing from node", key))
}

fn premium_storage(_: &RuleContext<'_>, node: &Node) -> Result<Evaluation, CheckError> {
    match node.resource().labels().get(STORAGE_TIER_LABEL) {
        Some(tier) => Ok(Evaluation::violated_if(tier != "Premium_LRS")),
        None => Ok(missing_label(STORAGE_TIER_LABEL)),
    }
}

fn burstable_instance_type(_: &RuleContext<'_>, node: &Node) -> Result<Evaluation, CheckError> {
    match node.resource().labels().get(INSTANCE_TYPE_LABEL) {
        Some(instance_type) => Ok(Evaluation::violated_if(
            instance_type.starts_with("Standard_B"),
        )),
        None => Ok(missing_label(INSTANCE_TYPE_LABEL)),
    }
}

fn xks_labels(_: &RuleContext<'_>, node: &Node) -> Result<Evaluation, CheckError> {
    let labels = node.resource().labels();
    Ok(Evaluation::violated_if(
        !labels.contains_key(NODE_CLASS_LABEL) || !labels.contains_key(PURPOSE_LABEL),
    ))
}

/// The default pool should only run critical add-ons
fn aks_default_pool_taint(_: &RuleContext<'_>, node: &Node) -> Result<Evaluation, CheckError> {
    let cluster_node = project!(node, Node);
    if node.resource().labels().get(AGENT_POOL_LABEL).map(String::as_str) != Some("default") {
        return Ok(Evaluation::Pass);
    }

    let tainted = cluster_node
        .spec
        .as_ref()
        .and_then(|spec| spec.taints.as_ref())
        .is_some_and(|taints| {
            taints.iter().any(|taint| {
                taint.key == "CriticalAddonsOnly"
                    && taint.effect == "NoSchedule"
                    && taint.value.as_deref() == Some("true")
            })
        });
    Ok(Evaluation::violated_if(!tainted))
}
