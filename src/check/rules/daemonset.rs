use super::links;
use crate::check::registry::RuleRegistry;
use crate::check::rule::{Evaluation, Rule, RuleContext};
use crate::check::CheckError;
use crate::graph::Node;

pub fn register(registry: &mut RuleRegistry) -> Result<(), CheckError> {
    registry.register_fn(
        "daemonset",
        Rule::new(
            "OnAllNodes",
            5,
            "Daemonset is not running on all nodes.",
            links::DAEMONSET,
        ),
        on_all_nodes,
    )
}

/// Skipped when the graph holds no nodes, as in namespaced runs
fn on_all_nodes(ctx: &RuleContext<'_>, node: &Node) -> Result<Evaluation, CheckError> {
    let daemon_set = project!(node, DaemonSet);
    let nodes = ctx.graph.list("v1", "Node").len();
    if nodes == 0 {
        return Ok(Evaluation::Pass);
    }
    let desired = daemon_set
        .status
        .as_ref()
        .map(|status| status.desired_number_scheduled)
        .unwrap_or_default();
    Ok(Evaluation::violated_if(
        usize::try_from(desired).ok() != Some(nodes),
    ))
}
