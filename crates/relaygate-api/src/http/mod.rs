//! HTTP/REST API layer for relaygate.
//!
//! Axum routes for the gateway authorizer, status webhooks, rotation and the
//! client registry, with bearer authentication and an envelope response
//! format.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
