//! Ingress rules
//!
//! The DNS rules compare what public DNS says about each ingress host with
//! what the cluster expects: the load balancer address, and the owner id
//! external-dns writes into its TXT registry records.

use super::links;
use crate::check::dns::{DnsError, DnsResolver};
use crate::check::registry::RuleRegistry;
use crate::check::rule::{Evaluation, Predicate, Rule, RuleContext};
use crate::check::CheckError;
use crate::graph::{Graph, Node};
use crate::models::Payload;
use async_trait::async_trait;
use k8s_openapi::api::networking::v1::Ingress;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

const EXTERNAL_DNS_NAMESPACE: &str = "external-dns";
const EXTERNAL_DNS_NAME: &str = "external-dns";
const TXT_OWNER_ARG: &str = "--txt-owner-id=";
const TXT_OWNER_KEY: &str = "external-dns/owner=";

pub fn register(registry: &mut RuleRegistry, dns: Option<Arc<DnsResolver>>) -> Result<(), CheckError> {
    registry.register_fn(
        "ingress",
        Rule::new("NoClass", 3, "Ingress is missing a class.", links::INGRESS_CLASS),
        no_class,
    )?;
    registry.register_fn(
        "ingress",
        Rule::new(
            "NoTLS",
            6,
            "Ingress is missing TLS configuration.",
            links::INGRESS_TLS,
        ),
        no_tls,
    )?;

    let Some(dns) = dns else {
        return Ok(());
    };
    registry.register(
        "ingress",
        Rule::new(
            "HostResolvesToLoadBalancer",
            6,
            "Ingress hosts do not resolve to the ingress load balancer.",
            links::LOAD_BALANCER,
        ),
        Arc::new(HostResolvesToLoadBalancer::new(Arc::clone(&dns))),
    )?;
    registry.register(
        "ingress",
        Rule::new(
            "ExternalDnsOwner",
            5,
            "Ingress hosts are owned by another external-dns instance.",
            links::EXTERNAL_DNS,
        ),
        Arc::new(ExternalDnsOwner::new(dns)),
    )?;
    Ok(())
}

fn no_class(_: &RuleContext<'_>, node: &Node) -> Result<Evaluation, CheckError> {
    let ingress = project!(node, Ingress);
    let class = ingress
        .spec
        .as_ref()
        .and_then(|spec| spec.ingress_class_name.as_deref());
    Ok(Evaluation::violated_if(class.unwrap_or_default().is_empty()))
}

fn no_tls(_: &RuleContext<'_>, node: &Node) -> Result<Evaluation, CheckError> {
    let ingress = project!(node, Ingress);
    let has_tls = ingress
        .spec
        .as_ref()
        .and_then(|spec| spec.tls.as_ref())
        .is_some_and(|tls| !tls.is_empty());
    Ok(Evaluation::violated_if(!has_tls))
}

/// Non-empty rule hosts
fn hosts(ingress: &Ingress) -> Vec<&str> {
    ingress
        .spec
        .iter()
        .flat_map(|spec| spec.rules.iter().flatten())
        .filter_map(|rule| rule.host.as_deref())
        .filter(|host| !host.is_empty())
        .collect()
}

/// Load balancer IPs published in the ingress status
fn load_balancer_ips(ingress: &Ingress) -> Vec<&str> {
    ingress
        .status
        .iter()
        .filter_map(|status| status.load_balancer.as_ref())
        .flat_map(|lb| lb.ingress.iter().flatten())
        .filter_map(|entry| entry.ip.as_deref())
        .filter(|ip| !ip.is_empty())
        .collect()
}

/// Await a lookup unless the run is cancelled first
async fn cancellable<T>(
    ctx: &RuleContext<'_>,
    lookup: impl Future<Output = Result<T, DnsError>>,
) -> Result<Result<T, DnsError>, CheckError> {
    tokio::select! {
        _ = ctx.cancel.cancelled() => Err(CheckError::Cancelled),
        result = lookup => Ok(result),
    }
}

pub struct HostResolvesToLoadBalancer {
    dns: Arc<DnsResolver>,
}

impl HostResolvesToLoadBalancer {
    pub fn new(dns: Arc<DnsResolver>) -> Self {
        Self { dns }
    }
}

#[async_trait]
impl Predicate for HostResolvesToLoadBalancer {
    async fn evaluate(&self, ctx: &RuleContext<'_>, node: &Node) -> Result<Evaluation, CheckError> {
        let ingress = project!(node, Ingress);
        let expected = load_balancer_ips(ingress);
        if expected.is_empty() {
            return Ok(Evaluation::Pass);
        }

        let mut messages = Vec::new();
        for host in hosts(ingress) {
            let ips = match cancellable(ctx, self.dns.ipv4(host)).await? {
                Ok(ips) => ips,
                Err(e) => {
                    messages.push(format!("unable to lookup ip for {:?}: {}", host, e));
                    continue;
                }
            };
            if ips.iter().any(|ip| expected.contains(&ip.to_string().as_str())) {
                continue;
            }
            let received = ips
                .iter()
                .map(|ip| ip.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            messages.push(format!(
                "lookup of {:?} expected ip {:?} but received: {}",
                host,
                expected.join(", "),
                received
            ));
        }
        Ok(Evaluation::from_messages(messages))
    }
}

/// Checks TXT registry records against the cluster's external-dns owner id
///
/// The owner id is read from the external-dns Deployment once and reused for
/// every ingress, so an instance must not be shared between graphs.
pub struct ExternalDnsOwner {
    dns: Arc<DnsResolver>,
    owner: OnceCell<Result<Option<String>, String>>,
}

impl ExternalDnsOwner {
    pub fn new(dns: Arc<DnsResolver>) -> Self {
        Self {
            dns,
            owner: OnceCell::new(),
        }
    }

    async fn owner(&self, graph: &Graph) -> &Result<Option<String>, String> {
        self.owner
            .get_or_init(|| async { txt_owner(graph) })
            .await
    }
}

/// The `--txt-owner-id` of the external-dns Deployment, if one is deployed
fn txt_owner(graph: &Graph) -> Result<Option<String>, String> {
    let Some(node) = graph.list("apps/v1", "Deployment").into_iter().find(|node| {
        node.reference().namespace == EXTERNAL_DNS_NAMESPACE
            && node.reference().name == EXTERNAL_DNS_NAME
    }) else {
        return Ok(None);
    };

    let deployment = match node.resource().payload() {
        Some(Payload::Deployment(deployment)) => deployment,
        _ => return Err(format!("unable to decode {}", node.reference())),
    };
    let containers: &[_] = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.template.spec.as_ref())
        .map(|spec| spec.containers.as_slice())
        .unwrap_or_default();
    let [container] = containers else {
        return Err(format!(
            "expected external-dns to have 1 container, received: {}",
            containers.len()
        ));
    };

    let args = container.args.as_deref().unwrap_or_default();
    args.iter()
        .find_map(|arg| arg.strip_prefix(TXT_OWNER_ARG))
        .map(|owner| Some(owner.to_string()))
        .ok_or_else(|| format!("unable to locate {} in args: {:?}", TXT_OWNER_ARG, args))
}

/// Owner ids found in TXT records
fn record_owners(records: &[String]) -> impl Iterator<Item = &str> {
    records
        .iter()
        .flat_map(|record| record.split(','))
        .filter_map(|entry| entry.strip_prefix(TXT_OWNER_KEY))
}

#[async_trait]
impl Predicate for ExternalDnsOwner {
    async fn evaluate(&self, ctx: &RuleContext<'_>, node: &Node) -> Result<Evaluation, CheckError> {
        let ingress = project!(node, Ingress);
        let expected = match self.owner(ctx.graph).await {
            Ok(Some(owner)) => owner,
            Ok(None) => return Ok(Evaluation::Pass),
            Err(e) => {
                return Ok(Evaluation::violated(format!(
                    "unable to get txt owner from external-dns: {}",
                    e
                )))
            }
        };

        let mut messages = Vec::new();
        for host in hosts(ingress) {
            let records = match cancellable(ctx, self.dns.txt(host)).await? {
                Ok(records) => records,
                Err(e) => {
                    messages.push(format!("unable to lookup txt record for {:?}: {}", host, e));
                    continue;
                }
            };
            if let Some(found) = record_owners(&records).find(|found| *found != expected.as_str()) {
                messages.push(format!(
                    "expected external dns owner {:?} but found {:?}",
                    expected, found
                ));
            }
        }
        Ok(Evaluation::from_messages(messages))
    }
}
