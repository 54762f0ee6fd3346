//! Pod rules
//!
//! Container checks cover init containers followed by regular containers.

use super::links;
use crate::check::registry::RuleRegistry;
use crate::check::rule::{Evaluation, Rule, RuleContext};
use crate::check::CheckError;
use crate::graph::Node;
use k8s_openapi::api::core::v1::{Container, Pod, Probe};

/// Readiness delays above this should be a startup probe
const MAX_READINESS_INITIAL_DELAY: i32 = 30;

pub fn register(registry: &mut RuleRegistry) -> Result<(), CheckError> {
    registry.register_fn(
        "pod",
        Rule::new(
            "WithoutController",
            8,
            "Pods should not be created without a controller.",
            links::OWNERS,
        ),
        without_controller,
    )?;
    registry.register_fn(
        "pod",
        Rule::new(
            "AutomountServiceAccountToken",
            1,
            "Pod should not automount service account tokens.",
            links::SERVICE_ACCOUNT_TOKEN,
        ),
        automount_service_account_token,
    )?;
    registry.register_fn(
        "pod",
        Rule::new(
            "ImagePullPolicyAlways",
            1,
            "Pod is using image pull policy always.",
            links::IMAGE_PULL_POLICY,
        ),
        image_pull_policy_always,
    )?;
    registry.register_fn(
        "pod",
        Rule::new(
            "ReadinessInitialDelayHigh",
            3,
            "Readiness probe initial delay is high, did you mean to use startup probe?",
            links::PROBES,
        ),
        readiness_initial_delay_high,
    )?;
    registry.register_fn(
        "pod",
        Rule::new(
            "MissingReadinessProbe",
            5,
            "Pod missing readiness probe.",
            links::PROBES,
        ),
        missing_readiness_probe,
    )?;
    registry.register_fn(
        "pod",
        Rule::new(
            "ReadinessAndLivenessSame",
            5,
            "A pods readiness and liveness probe is the same.",
            links::PROBES,
        ),
        readiness_and_liveness_same,
    )?;
    Ok(())
}

fn containers(pod: &Pod) -> impl Iterator<Item = &Container> {
    pod.spec.iter().flat_map(|spec| {
        spec.init_containers
            .iter()
            .flatten()
            .chain(spec.containers.iter())
    })
}

/// One `container <name>` message per matching container
fn containers_matching(pod: &Pod, matches: impl Fn(&Container) -> bool) -> Evaluation {
    Evaluation::from_messages(
        containers(pod)
            .filter(|container| matches(container))
            .map(|container| format!("container {}", container.name))
            .collect(),
    )
}

fn without_controller(_: &RuleContext<'_>, node: &Node) -> Result<Evaluation, CheckError> {
    project!(node, Pod);
    Ok(Evaluation::violated_if(
        node.resource().owner_references().is_empty(),
    ))
}

fn automount_service_account_token(
    _: &RuleContext<'_>,
    node: &Node,
) -> Result<Evaluation, CheckError> {
    let pod = project!(node, Pod);
    let disabled = pod
        .spec
        .as_ref()
        .and_then(|spec| spec.automount_service_account_token)
        == Some(false);
    Ok(Evaluation::violated_if(!disabled))
}

fn image_pull_policy_always(_: &RuleContext<'_>, node: &Node) -> Result<Evaluation, CheckError> {
    let pod = project!(node, Pod);
    Ok(containers_matching(pod, |container| {
        container.image_pull_policy.as_deref() == Some("Always")
    }))
}

fn readiness_initial_delay_high(
    _: &RuleContext<'_>,
    node: &Node,
) -> Result<Evaluation, CheckError> {
    let pod = project!(node, Pod);
    Ok(containers_matching(pod, |container| {
        container
            .readiness_probe
            .as_ref()
            .and_then(|probe| probe.initial_delay_seconds)
            .is_some_and(|delay| delay > MAX_READINESS_INITIAL_DELAY)
    }))
}

fn missing_readiness_probe(_: &RuleContext<'_>, node: &Node) -> Result<Evaluation, CheckError> {
    let pod = project!(node, Pod);
    Ok(containers_matching(pod, |container| {
        container.readiness_probe.is_none()
    }))
}

/// Probes that hit the same handler
fn same_handler(readiness: &Probe, liveness: &Probe) -> bool {
    let has_handler = readiness.http_get.is_some()
        || readiness.tcp_socket.is_some()
        || readiness.exec.is_some()
        || readiness.grpc.is_some();
    has_handler
        && readiness.http_get == liveness.http_get
        && readiness.tcp_socket == liveness.tcp_socket
        && readiness.exec == liveness.exec
        && readiness.grpc == liveness.grpc
}

fn readiness_and_liveness_same(
    _: &RuleContext<'_>,
    node: &Node,
) -> Result<Evaluation, CheckError> {
    let pod = project!(node, Pod);
    Ok(containers_matching(pod, |container| {
        match (&container.readiness_probe, &container.liveness_probe) {
            (Some(readiness), Some(liveness)) => same_handler(readiness, liveness),
            _ => false,
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, KindRegistry};
    use chrono::Utc;
    use serde_json::{json, Value};
    use tokio_util::sync::CancellationToken;

    fn evaluate(
        predicate: fn(&RuleContext<'_>, &Node) -> Result<Evaluation, CheckError>,
        spec: Value,
    ) -> Evaluation {
        let object = json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {"name": "web", "namespace": "apps",
                         "uid": "00000000-0000-0000-0000-000000000001"},
            "spec": spec
        });
        let graph = Graph::from_objects(&KindRegistry::builtin(), vec![object]).unwrap();
        let cancel = CancellationToken::new();
        let ctx = RuleContext {
            graph: &graph,
            now: Utc::now(),
            cancel: &cancel,
        };
        predicate(&ctx, graph.nodes().next().unwrap()).unwrap()
    }

    #[test]
    fn test_without_controller() {
        let result = evaluate(without_controller, json!({"containers": [{"name": "web"}]}));
        assert!(result.is_violated());
    }

    #[test]
    fn test_automount_service_account_token() {
        let result = evaluate(
            automount_service_account_token,
            json!({"containers": [{"name": "web"}], "automountServiceAccountToken": false}),
        );
        assert_eq!(result, Evaluation::Pass);

        let result = evaluate(
            automount_service_account_token,
            json!({"containers": [{"name": "web"}]}),
        );
        assert!(result.is_violated());
    }

    #[test]
    fn test_image_pull_policy_always_lists_containers() {
        let result = evaluate(
            image_pull_policy_always,
            json!({
                "initContainers": [{"name": "migrate", "imagePullPolicy": "Always"}],
                "containers": [
                    {"name": "web", "imagePullPolicy": "IfNotPresent"},
                    {"name": "proxy", "imagePullPolicy": "Always"}
                ]
            }),
        );
        assert_eq!(
            result,
            Evaluation::Violated(vec![
                "container migrate".to_string(),
                "container proxy".to_string()
            ])
        );
    }

    #[test]
    fn test_readiness_initial_delay_high() {
        let result = evaluate(
            readiness_initial_delay_high,
            json!({"containers": [
                {"name": "slow", "readinessProbe": {"initialDelaySeconds": 60}},
                {"name": "fast", "readinessProbe": {"initialDelaySeconds": 30}}
            ]}),
        );
        assert_eq!(result, Evaluation::violated("container slow"));
    }

    #[test]
    fn test_missing_readiness_probe() {
        let result = evaluate(
            missing_readiness_probe,
            json!({"containers": [
                {"name": "web", "readinessProbe": {"tcpSocket": {"port": 8080}}},
                {"name": "sidecar"}
            ]}),
        );
        assert_eq!(result, Evaluation::violated("container sidecar"));
    }

    #[test]
    fn test_readiness_and_liveness_same() {
        let same = json!({"httpGet": {"path": "/healthz", "port": 8080}});
        let result = evaluate(
            readiness_and_liveness_same,
            json!({"containers": [{"name": "web", "readinessProbe": same, "livenessProbe": same}]}),
        );
        assert_eq!(result, Evaluation::violated("container web"));

        let result = evaluate(
            readiness_and_liveness_same,
            json!({"containers": [{
                "name": "web",
                "readinessProbe": {"httpGet": {"path": "/ready", "port": 8080}},
                "livenessProbe": {"httpGet": {"path": "/healthz", "port": 8080}}
            }]}),
        );
        assert_eq!(result, Evaluation::Pass);
    }

    #[test]
    fn test_invalid_pod_is_reported() {
        let result = evaluate(missing_readiness_probe, json!({"containers": "web"}));
        let Evaluation::Violated(messages) = result else {
            panic!("expected a violation");
        };
        assert!(messages[0].starts_with("unable to decode Pod: "));
    }
}
