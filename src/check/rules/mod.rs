//! Built-in rule predicates, one module per kind

/// Typed payload of a node, or an early return
///
/// Defined ahead of the rule modules so they pick it up by textual scope.
/// A payload that failed to decode is reported as a violation. A node with no
/// projection at all means the rule was registered for the wrong kind.
macro_rules! project {
    ($node:expr, $variant:ident) => {
        match $node.resource().projection() {
            $crate::models::Projection::Typed($crate::models::Payload::$variant(payload)) => {
                &**payload
            }
            $crate::models::Projection::Invalid(reason) => {
                return Ok($crate::check::Evaluation::violated(format!(
                    "unable to decode {}: {}",
                    stringify!($variant),
                    reason
                )));
            }
            _ => {
                return Err($crate::check::CheckError::MissingProjection {
                    kind: stringify!($variant).to_string(),
                    reference: $node.reference().id(),
                });
            }
        }
    };
}

pub mod all;
pub mod certificate;
pub mod daemonset;
pub mod ingress;
pub mod node;
pub mod pod;

/// Documentation links for the built-in rules
pub(crate) mod links {
    pub const MANAGED_FIELDS: &str =
        "https://kubernetes.io/docs/reference/using-api/server-side-apply/#field-management";
    pub const API_VERSIONS: &str =
        "https://kubernetes.io/docs/reference/using-api/deprecation-guide/";
    pub const OWNERS: &str =
        "https://kubernetes.io/docs/concepts/overview/working-with-objects/owners-dependents/";
    pub const FLUX: &str = "https://fluxcd.io/flux/components/kustomize/kustomizations/";
    pub const AKS_STORAGE: &str = "https://learn.microsoft.com/en-us/azure/virtual-machines/disks-types";
    pub const AKS_INSTANCE_TYPES: &str =
        "https://learn.microsoft.com/en-us/azure/virtual-machines/sizes-b-series-burstable";
    pub const AKS_SYSTEM_POOL: &str =
        "https://learn.microsoft.com/en-us/azure/aks/use-system-pools";
    pub const XKS: &str = "https://github.com/XenitAB/terraform-modules";
    pub const SERVICE_ACCOUNT_TOKEN: &str =
        "https://kubernetes.io/docs/tasks/configure-pod-container/configure-service-account/#opt-out-of-api-credential-automounting";
    pub const IMAGE_PULL_POLICY: &str =
        "https://kubernetes.io/docs/concepts/containers/images/#image-pull-policy";
    pub const PROBES: &str =
        "https://kubernetes.io/docs/tasks/configure-pod-container/configure-liveness-readiness-startup-probes/";
    pub const DAEMONSET: &str =
        "https://kubernetes.io/docs/concepts/workloads/controllers/daemonset/";
    pub const INGRESS_CLASS: &str =
        "https://kubernetes.io/docs/concepts/services-networking/ingress/#ingress-class";
    pub const INGRESS_TLS: &str =
        "https://kubernetes.io/docs/concepts/services-networking/ingress/#tls";
    pub const LOAD_BALANCER: &str =
        "https://kubernetes.io/docs/concepts/services-networking/ingress/#load-balancing";
    pub const EXTERNAL_DNS: &str =
        "https://kubernetes-sigs.github.io/external-dns/latest/docs/registry/txt/";
    pub const CERTIFICATE: &str = "https://cert-manager.io/docs/usage/certificate/";
}
