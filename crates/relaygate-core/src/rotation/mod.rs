//! Secret rotation across the secret store and its downstream consumer.

pub mod coordinator;

pub use coordinator::{RotationCoordinator, RotationSettings};
