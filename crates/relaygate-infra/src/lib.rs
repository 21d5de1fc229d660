//! Infrastructure layer for relaygate.
//!
//! Implements the port traits defined in `relaygate-core`: SQLite and
//! in-memory stores, the HTTP credential consumer, configuration loading
//! and webhook signature checks.

pub mod backend;
pub mod config;
pub mod credential;
pub mod memory;
pub mod sqlite;
pub mod webhook;
