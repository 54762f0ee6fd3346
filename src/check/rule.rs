//! Rule model and predicate contract

use super::CheckError;
use crate::graph::{Graph, Node};
use crate::models::ObjectReference;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

/// Highest severity a rule may carry
pub const MAX_SEVERITY: u8 = 10;

/// A check applied to graph nodes
///
/// Severity ranges from 1 to 10. Severity 0 marks an informational check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub severity: u8,
    pub description: String,
    pub link: String,
}

impl Rule {
    pub fn new(
        id: impl Into<String>,
        severity: u8,
        description: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            severity,
            description: description.into(),
            link: link.into(),
        }
    }

    /// Check the rule is well formed
    pub fn validate(&self) -> Result<(), CheckError> {
        let invalid = |reason: String| CheckError::InvalidRule {
            id: self.id.clone(),
            reason,
        };

        if self.id.is_empty() {
            return Err(invalid("id cannot be empty".to_string()));
        }
        if self.severity > MAX_SEVERITY {
            return Err(invalid(format!(
                "severity {} is greater than {}",
                self.severity, MAX_SEVERITY
            )));
        }
        if self.description.is_empty() {
            return Err(invalid("description cannot be empty".to_string()));
        }
        if self.link.is_empty() {
            return Err(invalid("link cannot be empty".to_string()));
        }
        url::Url::parse(&self.link)
            .map_err(|e| invalid(format!("link has to be a parseable url: {}", e)))?;
        Ok(())
    }

    /// Informational checks do not represent a problem to fix
    pub fn is_informational(&self) -> bool {
        self.severity == 0
    }
}

/// A rule violation, attributed to the resource responsible for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub reference: ObjectReference,
    pub message: String,
}

/// A rule and the violations it collected during one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleResult {
    pub rule: Rule,
    pub violations: Vec<Violation>,
}

impl RuleResult {
    pub fn new(rule: Rule) -> Self {
        Self {
            rule,
            violations: Vec::new(),
        }
    }

    /// Record a violation unless one for the same resource exists
    ///
    /// Returns whether the violation was added.
    pub fn add_violation(&mut self, violation: Violation) -> bool {
        if self
            .violations
            .iter()
            .any(|v| v.reference == violation.reference)
        {
            return false;
        }
        self.violations.push(violation);
        true
    }
}

/// Results of a run keyed by rule id
pub type RuleResults = BTreeMap<String, RuleResult>;

/// Merge a result into the run's results, deduplicating violations
pub fn merge_result(results: &mut RuleResults, result: RuleResult) {
    match results.get_mut(&result.rule.id) {
        Some(existing) => {
            for violation in result.violations {
                existing.add_violation(violation);
            }
        }
        None => {
            results.insert(result.rule.id.clone(), result);
        }
    }
}

/// Outcome of evaluating a predicate on one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    Pass,
    /// Violated, with detail messages
    Violated(Vec<String>),
}

impl Evaluation {
    pub fn violated(message: impl Into<String>) -> Self {
        Evaluation::Violated(vec![message.into()])
    }

    pub fn violated_if(condition: bool) -> Self {
        if condition {
            Evaluation::Violated(Vec::new())
        } else {
            Evaluation::Pass
        }
    }

    /// Violated when there is at least one message
    pub fn from_messages(messages: Vec<String>) -> Self {
        if messages.is_empty() {
            Evaluation::Pass
        } else {
            Evaluation::Violated(messages)
        }
    }

    pub fn is_violated(&self) -> bool {
        matches!(self, Evaluation::Violated(_))
    }
}

/// Read-only state shared by every predicate in a run
pub struct RuleContext<'a> {
    pub graph: &'a Graph,
    /// Evaluation time, fixed for the whole run
    pub now: DateTime<Utc>,
    pub cancel: &'a CancellationToken,
}

#[async_trait]
pub trait Predicate: Send + Sync {
    async fn evaluate(&self, ctx: &RuleContext<'_>, node: &Node) -> Result<Evaluation, CheckError>;
}

pub type PredicateFn = fn(&RuleContext<'_>, &Node) -> Result<Evaluation, CheckError>;

/// Adapter for predicates that need no I/O
pub struct FnPredicate(pub PredicateFn);

#[async_trait]
impl Predicate for FnPredicate {
    async fn evaluate(&self, ctx: &RuleContext<'_>, node: &Node) -> Result<Evaluation, CheckError> {
        (self.0)(ctx, node)
    }
}
