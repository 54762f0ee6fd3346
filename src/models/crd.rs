//! Minimal projections of the custom resources the checker inspects
//!
//! Only the fields used by relationship extraction and rules are modelled.
//! Unknown fields are ignored so these keep decoding across API revisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference to a source object, optionally in another namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossNamespaceReference {
    #[serde(default)]
    pub api_version: Option<String>,
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalObjectReference {
    pub name: String,
}

/// kustomize.toolkit.fluxcd.io Kustomization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Kustomization {
    #[serde(default)]
    pub spec: KustomizationSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KustomizationSpec {
    #[serde(default)]
    pub service_account_name: Option<String>,
    #[serde(default)]
    pub source_ref: Option<CrossNamespaceReference>,
    #[serde(default)]
    pub health_checks: Vec<CrossNamespaceReference>,
    #[serde(default)]
    pub path: Option<String>,
}

/// source.toolkit.fluxcd.io GitRepository
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitRepository {
    #[serde(default)]
    pub spec: GitRepositorySpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitRepositorySpec {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub secret_ref: Option<LocalObjectReference>,
}

/// helm.toolkit.fluxcd.io HelmRelease
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HelmRelease {
    #[serde(default)]
    pub spec: HelmReleaseSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmReleaseSpec {
    #[serde(default)]
    pub service_account_name: Option<String>,
    #[serde(default)]
    pub chart: Option<HelmChartTemplate>,
    #[serde(default)]
    pub chart_ref: Option<CrossNamespaceReference>,
    #[serde(default)]
    pub values_from: Vec<ValuesReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HelmChartTemplate {
    #[serde(default)]
    pub spec: HelmChartTemplateSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmChartTemplateSpec {
    #[serde(default)]
    pub chart: String,
    #[serde(default)]
    pub source_ref: Option<CrossNamespaceReference>,
}

/// A ConfigMap or Secret holding Helm values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuesReference {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub optional: bool,
}

/// cert-manager.io Certificate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    #[serde(default)]
    pub spec: CertificateSpec,
    #[serde(default)]
    pub status: Option<CertificateStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSpec {
    #[serde(default)]
    pub secret_name: Option<String>,
    #[serde(default)]
    pub dns_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateStatus {
    #[serde(default)]
    pub not_after: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_helm_release_chart_source() {
        let release: HelmRelease = serde_json::from_value(json!({
            "spec": {
                "serviceAccountName": "deployer",
                "chart": {"spec": {"chart": "podinfo",
                    "sourceRef": {"kind": "HelmRepository", "name": "podinfo", "namespace": "flux-system"}}},
                "valuesFrom": [{"kind": "ConfigMap", "name": "podinfo-values"}],
                "interval": "5m"
            }
        }))
        .unwrap();

        let source = release.spec.chart.unwrap().spec.source_ref.unwrap();
        assert_eq!(source.kind, "HelmRepository");
        assert_eq!(source.namespace.as_deref(), Some("flux-system"));
        assert_eq!(release.spec.values_from[0].name, "podinfo-values");
    }

    #[test]
    fn test_certificate_not_after() {
        let cert: Certificate = serde_json::from_value(json!({
            "spec": {"secretName": "web-tls"},
            "status": {"notAfter": "2026-01-02T03:04:05Z"}
        }))
        .unwrap();
        let not_after = cert.status.unwrap().not_after.unwrap();
        assert_eq!(not_after.to_rfc3339(), "2026-01-02T03:04:05+00:00");
    }

    #[test]
    fn test_kustomization_without_spec() {
        let kustomization: Kustomization = serde_json::from_value(json!({})).unwrap();
        assert!(kustomization.spec.source_ref.is_none());
        assert!(kustomization.spec.health_checks.is_empty());
    }
}
