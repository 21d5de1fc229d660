//! Port trait definitions.
//!
//! These traits define the storage and downstream interfaces that the
//! infrastructure layer (relaygate-infra) implements. The core crate never
//! depends on any specific storage technology.

pub mod client;
pub mod credential;
pub mod lock;
pub mod secret_store;
