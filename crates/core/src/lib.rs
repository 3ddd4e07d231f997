//! `followup-core`: domain foundation for the follow-up plan publication pipeline.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod plan;

pub use error::{DomainError, DomainResult};
pub use id::{CounterpartyId, OrganizationId, PlanId, SubjectId};
pub use plan::{PublicationState, PublishableItem};
