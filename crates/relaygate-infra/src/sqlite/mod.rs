//! SQLite storage layer.
//!
//! Port implementations backed by SQLite with WAL mode and split read/write
//! connection pools.

pub mod client;
pub mod lock;
pub mod pool;
pub mod secret;

pub use client::SqliteClientRegistry;
pub use lock::SqliteLockTable;
pub use pool::DatabasePool;
pub use secret::SqliteSecretStore;
