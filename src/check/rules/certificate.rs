use super::links;
use crate::check::registry::RuleRegistry;
use crate::check::rule::{Evaluation, Rule, RuleContext};
use crate::check::CheckError;
use crate::graph::Node;
use chrono::Duration;

/// Certificates expiring within this window are reported
const EXPIRY_WINDOW_DAYS: i64 = 5;

pub fn register(registry: &mut RuleRegistry) -> Result<(), CheckError> {
    registry.register_fn(
        "certificate",
        Rule::new(
            "CertificateExpiry",
            8,
            "Certificate has expired or is about to expire.",
            links::CERTIFICATE,
        ),
        certificate_expiry,
    )
}

fn certificate_expiry(ctx: &RuleContext<'_>, node: &Node) -> Result<Evaluation, CheckError> {
    let certificate = project!(node, Certificate);
    let Some(not_after) = certificate
        .status
        .as_ref()
        .and_then(|status| status.not_after)
    else {
        return Ok(Evaluation::violated("certificate has not been issued"));
    };

    if ctx.now + Duration::days(EXPIRY_WINDOW_DAYS) > not_after {
        return Ok(Evaluation::violated(format!(
            "certificate has expired or is about to: {}",
            not_after
        )));
    }
    Ok(Evaluation::Pass)
}
