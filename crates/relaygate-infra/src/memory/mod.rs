//! In-memory port implementations.
//!
//! `DashMap`-backed stores for `rgate serve --in-memory` and single-process
//! deployments. Clones share state. Nothing survives a restart.

pub mod client;
pub mod lock;
pub mod secret;

pub use client::MemoryClientRegistry;
pub use lock::MemoryLockTable;
pub use secret::MemorySecretStore;
