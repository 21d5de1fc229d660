//! HTTP request handlers for the REST API.

pub mod authorize;
pub mod client;
pub mod rotation;
pub mod webhook;
