//! Logging and trace export setup shared by the relaygate binaries.

pub mod tracing_setup;
