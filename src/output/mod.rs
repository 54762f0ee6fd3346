//! Result rendering and persistence
//!
//! - `snapshot.rs` - Binary save and restore of rule results
//! - `table.rs` - Plain table printout
//! - `tui.rs` - Interactive list view (feature `tui`)

pub mod snapshot;
pub mod table;
#[cfg(feature = "tui")]
pub mod tui;

pub use snapshot::SnapshotError;

use crate::check::{RuleResult, RuleResults};

/// Results with at least one violation, most severe first, then by id
pub fn ranked(results: &RuleResults) -> Vec<&RuleResult> {
    let mut ranked: Vec<&RuleResult> = results
        .values()
        .filter(|result| !result.violations.is_empty())
        .collect();
    ranked.sort_by(|a, b| {
        b.rule
            .severity
            .cmp(&a.rule.severity)
            .then_with(|| a.rule.id.cmp(&b.rule.id))
    });
    ranked
}
