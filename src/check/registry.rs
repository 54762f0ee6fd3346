//! Rule registry
//!
//! Rules are indexed by lower-cased kind. Rules registered under
//! [`ALL_KINDS`] apply to every node after its kind's own rules.

use super::dns::DnsResolver;
use super::rule::{FnPredicate, Predicate, PredicateFn, Rule};
use super::rules;
use super::CheckError;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Key for rules evaluated on every node
pub const ALL_KINDS: &str = "all";

/// A validated rule and the predicate evaluating it
#[derive(Clone)]
pub struct RegisteredRule {
    pub rule: Rule,
    pub predicate: Arc<dyn Predicate>,
}

impl std::fmt::Debug for RegisteredRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredRule")
            .field("rule", &self.rule)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default, Clone)]
pub struct RuleRegistry {
    rules: HashMap<String, Vec<RegisteredRule>>,
    ids: HashSet<String>,
}

impl RuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule for a kind
    ///
    /// The rule is validated and its id must be unique across all kinds.
    pub fn register(
        &mut self,
        kind: &str,
        rule: Rule,
        predicate: Arc<dyn Predicate>,
    ) -> Result<(), CheckError> {
        rule.validate()?;
        if self.ids.contains(&rule.id) {
            return Err(CheckError::InvalidRule {
                id: rule.id,
                reason: "duplicate rule id".to_string(),
            });
        }
        self.ids.insert(rule.id.clone());
        self.rules
            .entry(kind.to_lowercase())
            .or_default()
            .push(RegisteredRule { rule, predicate });
        Ok(())
    }

    /// Register a predicate that needs no I/O
    pub fn register_fn(
        &mut self,
        kind: &str,
        rule: Rule,
        predicate: PredicateFn,
    ) -> Result<(), CheckError> {
        self.register(kind, rule, Arc::new(FnPredicate(predicate)))
    }

    /// Rules for a kind followed by the rules for every kind
    pub fn rules_for(&self, kind: &str) -> impl Iterator<Item = &RegisteredRule> {
        let kind = kind.to_lowercase();
        let specific = if kind == ALL_KINDS {
            None
        } else {
            self.rules.get(&kind)
        };
        specific
            .into_iter()
            .flatten()
            .chain(self.rules.get(ALL_KINDS).into_iter().flatten())
    }

    /// Find a rule by id
    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules
            .values()
            .flatten()
            .map(|entry| &entry.rule)
            .find(|rule| rule.id == id)
    }

    /// Remove rules by id, returning the ids that were not registered
    pub fn disable(&mut self, ids: &[String]) -> Vec<String> {
        let mut unknown = Vec::new();
        for id in ids {
            if !self.ids.remove(id) {
                unknown.push(id.clone());
                continue;
            }
            for entries in self.rules.values_mut() {
                entries.retain(|entry| &entry.rule.id != id);
            }
            tracing::debug!("Disabled rule {}", id);
        }
        self.rules.retain(|_, entries| !entries.is_empty());
        unknown
    }

    /// Sorted ids of every registered rule
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.ids.iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Registry with every built-in rule
    ///
    /// The DNS based ingress rules are only registered when a resolver is given.
    pub fn builtin(dns: Option<Arc<DnsResolver>>) -> Result<Self, CheckError> {
        let mut registry = Self::new();
        rules::all::register(&mut registry)?;
        rules::node::register(&mut registry)?;
        rules::pod::register(&mut registry)?;
        rules::daemonset::register(&mut registry)?;
        rules::ingress::register(&mut registry, dns)?;
        rules::certificate::register(&mut registry)?;
        Ok(registry)
    }
}
