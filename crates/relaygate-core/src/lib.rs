//! Business logic and port trait definitions for relaygate.
//!
//! This crate defines the "ports" (store, consumer and registry traits) that
//! the infrastructure layer implements, plus the three decision engines built
//! on them: token authorization, secret rotation and webhook admission. It
//! depends only on `relaygate-types` -- never on `relaygate-infra` or any
//! database/IO crate.

pub mod admission;
pub mod auth;
pub mod clock;
pub mod repository;
pub mod rotation;

#[cfg(test)]
mod testing;
