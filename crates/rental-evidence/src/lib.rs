//! Condition evidence for rentals: photographs, checklists and signatures captured at
//! check-in and check-out, the rules that gate each phase, and the before/after comparison
//! used to settle disputes.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
