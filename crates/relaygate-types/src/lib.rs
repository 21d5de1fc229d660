//! Shared domain types for relaygate.
//!
//! Tokens and authorizer policies, versioned secrets and rotation requests,
//! admission decisions and client status records, configuration, and the
//! error enums shared by every other crate.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod admission;
pub mod config;
pub mod error;
pub mod rotation;
pub mod secret;
pub mod token;
