//! Rule evaluation
//!
//! Structure:
//! - `rule.rs` - Rules, violations and the predicate contract
//! - `registry.rs` - Rules indexed by kind
//! - `deprecation.rs` - API version deprecation catalog
//! - `dns.rs` - Resolver used by the DNS based ingress rules
//! - `rules/` - Built-in predicates
//!
//! The [`Checker`] walks a linked [`Graph`] once. Every node is first matched
//! against the deprecation catalog, then against the rules registered for its
//! kind followed by the rules that apply to every kind. Violations are
//! attributed to the node's root owner and deduplicated per rule.

pub mod deprecation;
pub mod dns;
pub mod registry;
pub mod rule;
pub mod rules;

pub use deprecation::{Deprecation, DeprecationCatalog};
pub use dns::{DnsError, DnsLookup, DnsResolver, HickoryLookup};
pub use registry::{RegisteredRule, RuleRegistry, ALL_KINDS};
pub use rule::{
    merge_result, Evaluation, FnPredicate, Predicate, Rule, RuleContext, RuleResult, RuleResults,
    Violation,
};

use crate::graph::Graph;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

/// Errors raised while loading rules or evaluating them
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("invalid deprecation catalog: {0}")]
    Catalog(String),

    #[error("invalid rule {id:?}: {reason}")]
    InvalidRule { id: String, reason: String },

    #[error("{reference} has no typed {kind} payload")]
    MissingProjection { kind: String, reference: String },

    #[error("rule {rule} failed on {reference}")]
    Predicate {
        rule: String,
        reference: String,
        #[source]
        source: Box<CheckError>,
    },

    #[error("evaluation cancelled")]
    Cancelled,
}

/// Evaluates rules against a graph
pub struct Checker {
    rules: RuleRegistry,
    deprecations: DeprecationCatalog,
    cancel: CancellationToken,
}

impl Checker {
    pub fn new(rules: RuleRegistry, deprecations: DeprecationCatalog) -> Self {
        Self {
            rules,
            deprecations,
            cancel: CancellationToken::new(),
        }
    }

    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    pub fn deprecations(&self) -> &DeprecationCatalog {
        &self.deprecations
    }

    pub async fn evaluate(&self, graph: &Graph) -> Result<RuleResults, CheckError> {
        self.evaluate_at(graph, Utc::now()).await
    }

    /// Evaluate with a fixed clock
    ///
    /// Any predicate error aborts the run.
    pub async fn evaluate_at(
        &self,
        graph: &Graph,
        now: DateTime<Utc>,
    ) -> Result<RuleResults, CheckError> {
        tracing::info!(
            "Evaluating {} rules against {} nodes",
            self.rules.len(),
            graph.len()
        );
        let ctx = RuleContext {
            graph,
            now,
            cancel: &self.cancel,
        };
        let mut results = RuleResults::new();

        for node in graph.nodes() {
            if self.cancel.is_cancelled() {
                return Err(CheckError::Cancelled);
            }

            if let Some(result) = self.deprecations.check(node.resource()) {
                merge_result(&mut results, result);
            }

            for entry in self.rules.rules_for(node.resource().kind()) {
                let evaluation = entry
                    .predicate
                    .evaluate(&ctx, node)
                    .await
                    .map_err(|e| match e {
                        CheckError::Cancelled => e,
                        other => CheckError::Predicate {
                            rule: entry.rule.id.clone(),
                            reference: node.reference().id(),
                            source: Box::new(other),
                        },
                    })?;
                let Evaluation::Violated(messages) = evaluation else {
                    continue;
                };

                let root = graph.find_root_owner(node);
                let added = results
                    .entry(entry.rule.id.clone())
                    .or_insert_with(|| RuleResult::new(entry.rule.clone()))
                    .add_violation(Violation {
                        reference: root.reference().clone(),
                        message: messages.join(", "),
                    });
                if !added {
                    tracing::debug!(
                        "{} already reported for {}, skipping {}",
                        entry.rule.id,
                        root.reference(),
                        node.reference()
                    );
                }
            }
        }

        tracing::info!("Evaluation produced {} rule results", results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{KindRegistry, Node};
    use serde_json::{json, Value};

    fn uid(n: u64) -> String {
        format!("00000000-0000-0000-0000-{:012x}", n)
    }

    fn graph(objects: Vec<Value>) -> Graph {
        Graph::from_objects(&KindRegistry::builtin(), objects).unwrap()
    }

    fn config_map(name: &str, n: u64) -> Value {
        json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": name, "namespace": "default", "uid": uid(n)}
        })
    }

    fn always(_: &RuleContext<'_>, _: &Node) -> Result<Evaluation, CheckError> {
        Ok(Evaluation::violated("always"))
    }

    fn failing(_: &RuleContext<'_>, node: &Node) -> Result<Evaluation, CheckError> {
        Err(CheckError::MissingProjection {
            kind: "ConfigMap".into(),
            reference: node.reference().id(),
        })
    }

    fn rule(id: &str) -> Rule {
        Rule::new(id, 1, "Test rule.", "https://example.com")
    }

    #[tokio::test]
    async fn test_evaluate_collects_violations() {
        let mut rules = RuleRegistry::new();
        rules.register_fn("configmap", rule("Always"), always).unwrap();
        let checker = Checker::new(rules, DeprecationCatalog::default());

        let results = checker
            .evaluate(&graph(vec![config_map("a", 1), config_map("b", 2)]))
            .await
            .unwrap();

        let result = &results["Always"];
        assert_eq!(result.violations.len(), 2);
        assert_eq!(result.violations[0].message, "always");
    }

    #[tokio::test]
    async fn test_predicate_error_aborts() {
        let mut rules = RuleRegistry::new();
        rules.register_fn(ALL_KINDS, rule("Failing"), failing).unwrap();
        let checker = Checker::new(rules, DeprecationCatalog::default());

        let err = checker
            .evaluate(&graph(vec![config_map("a", 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::Predicate { rule, .. } if rule == "Failing"));
    }

    #[tokio::test]
    async fn test_cancelled_evaluation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let checker = Checker::new(RuleRegistry::new(), DeprecationCatalog::default())
            .cancellation(cancel);

        let err = checker
            .evaluate(&graph(vec![config_map("a", 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::Cancelled));
    }

    #[tokio::test]
    async fn test_empty_graph_has_no_results() {
        let checker = Checker::new(
            RuleRegistry::builtin(None).unwrap(),
            DeprecationCatalog::embedded().unwrap(),
        );
        assert!(checker.evaluate(&Graph::new()).await.unwrap().is_empty());
    }
}
