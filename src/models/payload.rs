//! Typed payloads attached to resources of projected kinds

use super::crd;
use super::kind::ProjectedKind;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::core::v1::{Node, Pod, Secret, ServiceAccount};
use k8s_openapi::api::discovery::v1::EndpointSlice;
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::rbac::v1::RoleBinding;

/// A decoded, kind-specific view of a resource
#[derive(Debug, Clone)]
pub enum Payload {
    Pod(Box<Pod>),
    Node(Box<Node>),
    DaemonSet(Box<DaemonSet>),
    Deployment(Box<Deployment>),
    Ingress(Box<Ingress>),
    EndpointSlice(Box<EndpointSlice>),
    ServiceAccount(Box<ServiceAccount>),
    RoleBinding(Box<RoleBinding>),
    Secret(Box<Secret>),
    HorizontalPodAutoscaler(Box<HorizontalPodAutoscaler>),
    Kustomization(Box<crd::Kustomization>),
    GitRepository(Box<crd::GitRepository>),
    HelmRelease(Box<crd::HelmRelease>),
    Certificate(Box<crd::Certificate>),
}

impl Payload {
    pub fn kind(&self) -> ProjectedKind {
        match self {
            Payload::Pod(_) => ProjectedKind::Pod,
            Payload::Node(_) => ProjectedKind::Node,
            Payload::DaemonSet(_) => ProjectedKind::DaemonSet,
            Payload::Deployment(_) => ProjectedKind::Deployment,
            Payload::Ingress(_) => ProjectedKind::Ingress,
            Payload::EndpointSlice(_) => ProjectedKind::EndpointSlice,
            Payload::ServiceAccount(_) => ProjectedKind::ServiceAccount,
            Payload::RoleBinding(_) => ProjectedKind::RoleBinding,
            Payload::Secret(_) => ProjectedKind::Secret,
            Payload::HorizontalPodAutoscaler(_) => ProjectedKind::HorizontalPodAutoscaler,
            Payload::Kustomization(_) => ProjectedKind::Kustomization,
            Payload::GitRepository(_) => ProjectedKind::GitRepository,
            Payload::HelmRelease(_) => ProjectedKind::HelmRelease,
            Payload::Certificate(_) => ProjectedKind::Certificate,
        }
    }
}

/// Outcome of decoding a resource into its typed form
#[derive(Debug, Clone, Default)]
pub enum Projection {
    /// The kind has no registered decoder
    #[default]
    Untyped,
    Typed(Payload),
    /// A decoder exists but the object did not match its shape
    Invalid(String),
}
