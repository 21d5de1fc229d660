//! Webhook admission: dedup lock, envelope parsing and lifecycle checks.

pub mod dedup;
pub mod envelope;
pub mod progression;
pub mod service;

pub use dedup::DedupGuard;
pub use progression::StatusProgressionGate;
pub use service::{AdmissionService, AdmissionSettings};
