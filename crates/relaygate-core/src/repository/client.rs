//! Client registry trait.

use chrono::{DateTime, Utc};
use relaygate_types::admission::ClientStatusRecord;
use relaygate_types::error::RepositoryError;

/// Registry of clients and the last lifecycle status processed for each.
pub trait ClientRegistry: Send + Sync {
    /// Find the client bound to a task, ignoring `claiming` placeholders.
    fn find_by_task(
        &self,
        task_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<ClientStatusRecord>, RepositoryError>> + Send;

    fn get(
        &self,
        client_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<ClientStatusRecord>, RepositoryError>> + Send;

    /// Insert or replace a record keyed by `client_id`.
    fn upsert(
        &self,
        record: &ClientStatusRecord,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn list(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<ClientStatusRecord>, RepositoryError>> + Send;

    /// Record a successful admission. `NotFound` if the client is unknown.
    fn record_processed(
        &self,
        client_id: &str,
        status: &str,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
