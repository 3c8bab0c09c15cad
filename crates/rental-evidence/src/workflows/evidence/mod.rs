//! Rental evidence lifecycle: condition photos, checklists and signatures captured at check-in
//! and check-out, phase completion gating, and before/after comparison.

pub mod catalog;
pub mod checklists;
pub mod clock;
pub mod comparison;
pub mod domain;
pub mod errors;
pub mod geolocation;
pub mod image;
pub mod lifecycle;
pub mod photos;
pub mod router;
pub mod service;
pub mod signature;
pub mod store;
pub mod validator;

#[cfg(test)]
mod tests;

pub use catalog::{areas_for, Area, AreaCatalog, ChecklistPolicy};
pub use domain::{
    Actor, ChecklistAnswer, ChecklistEntry, GeoPoint, Phase, PhaseKind, PhotoRecord, Rental,
    RentalId, RentalKind, RentalStatus, Role, SignatureArtifact, UserId,
};
pub use errors::{CompletionBlocker, EvidenceError, NotFoundError, ValidationError};
pub use router::evidence_router;
pub use service::EvidenceService;
pub use store::{EvidenceStore, InMemoryEvidenceStore, StoreError};
