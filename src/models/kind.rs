//! Projected resource kinds
//!
//! Centralized enum for every kind the checker decodes into a typed payload.
//! Kinds outside this list are kept in their generic form only.

use std::fmt;
use std::str::FromStr;

/// Enumeration of all kinds with a typed projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectedKind {
    // Core workloads
    Pod,
    Node,
    DaemonSet,
    Deployment,
    // Networking
    Ingress,
    EndpointSlice,
    // Identity and configuration
    ServiceAccount,
    RoleBinding,
    Secret,
    // Scaling
    HorizontalPodAutoscaler,
    // Flux resources
    Kustomization,
    GitRepository,
    HelmRelease,
    // cert-manager resources
    Certificate,
}

impl ProjectedKind {
    /// Get the kind name as reported by the API server
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectedKind::Pod => "Pod",
            ProjectedKind::Node => "Node",
            ProjectedKind::DaemonSet => "DaemonSet",
            ProjectedKind::Deployment => "Deployment",
            ProjectedKind::Ingress => "Ingress",
            ProjectedKind::EndpointSlice => "EndpointSlice",
            ProjectedKind::ServiceAccount => "ServiceAccount",
            ProjectedKind::RoleBinding => "RoleBinding",
            ProjectedKind::Secret => "Secret",
            ProjectedKind::HorizontalPodAutoscaler => "HorizontalPodAutoscaler",
            ProjectedKind::Kustomization => "Kustomization",
            ProjectedKind::GitRepository => "GitRepository",
            ProjectedKind::HelmRelease => "HelmRelease",
            ProjectedKind::Certificate => "Certificate",
        }
    }

    /// Try to parse a kind name, returning None for kinds without a projection
    pub fn parse_optional(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    /// Get all projected kinds
    pub fn all() -> &'static [Self] {
        &[
            ProjectedKind::Pod,
            ProjectedKind::Node,
            ProjectedKind::DaemonSet,
            ProjectedKind::Deployment,
            ProjectedKind::Ingress,
            ProjectedKind::EndpointSlice,
            ProjectedKind::ServiceAccount,
            ProjectedKind::RoleBinding,
            ProjectedKind::Secret,
            ProjectedKind::HorizontalPodAutoscaler,
            ProjectedKind::Kustomization,
            ProjectedKind::GitRepository,
            ProjectedKind::HelmRelease,
            ProjectedKind::Certificate,
        ]
    }
}

impl fmt::Display for ProjectedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ProjectedKind> for String {
    fn from(kind: ProjectedKind) -> Self {
        kind.as_str().to_string()
    }
}

impl FromStr for ProjectedKind {
    type Err = String;

    /// Exact, case-sensitive match on the kind name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProjectedKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("No typed projection for kind: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str() {
        assert_eq!(ProjectedKind::Pod.as_str(), "Pod");
        assert_eq!(
            ProjectedKind::HorizontalPodAutoscaler.as_str(),
            "HorizontalPodAutoscaler"
        );
    }

    #[test]
    fn test_parse_is_exact() {
        assert_eq!(
            ProjectedKind::parse_optional("Ingress"),
            Some(ProjectedKind::Ingress)
        );
        assert_eq!(ProjectedKind::parse_optional("ingress"), None);
        assert_eq!(ProjectedKind::parse_optional("ConfigMap"), None);
    }

    #[test]
    fn test_all_round_trips_through_display() {
        for kind in ProjectedKind::all() {
            assert_eq!(ProjectedKind::parse_optional(&kind.to_string()), Some(*kind));
        }
    }

    #[test]
    fn test_into_string() {
        let s: String = ProjectedKind::Kustomization.into();
        assert_eq!(s, "Kustomization");
    }
}
