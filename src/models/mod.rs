//! Resource model layer
//!
//! Structure:
//! - `resource.rs` - Generic resource identity and metadata
//! - `kind.rs` - Kinds that decode into a typed payload
//! - `payload.rs` - The typed payloads themselves
//! - `crd.rs` - Projections of Flux and cert-manager custom resources

pub mod crd;
pub mod kind;
pub mod payload;
pub mod resource;

pub use kind::ProjectedKind;
pub use payload::{Payload, Projection};
pub use resource::{ManagedField, ObjectReference, OwnerReference, Resource, ResourceError};
