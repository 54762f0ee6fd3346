//! Table printout of rule results

use super::ranked;
use crate::check::RuleResults;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;

fn table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table
}

/// Render one rule table followed by its violations for every violated rule
pub fn render(results: &RuleResults) -> String {
    let mut out = String::new();
    for result in ranked(results) {
        let mut rule = table();
        rule.set_header(["ID", "Severity", "Description"]);
        rule.add_row([
            result.rule.id.clone(),
            result.rule.severity.to_string(),
            result.rule.description.clone(),
        ]);

        let mut violations = table();
        violations.set_header(["Api Version", "Kind", "Namespace", "Name", "Message"]);
        for violation in &result.violations {
            let reference = &violation.reference;
            violations.add_row([
                reference.api_version.as_str(),
                reference.kind.as_str(),
                reference.namespace.as_str(),
                reference.name.as_str(),
                violation.message.as_str(),
            ]);
        }

        out.push_str(&rule.to_string());
        out.push('\n');
        out.push_str(&violations.to_string());
        out.push_str("\n\n");
    }
    out
}

pub fn print(results: &RuleResults) {
    if results.values().all(|result| result.violations.is_empty()) {
        println!("No violations found");
        return;
    }
    print!("{}", render(results));
}
