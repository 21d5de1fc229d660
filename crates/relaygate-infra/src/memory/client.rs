//! In-memory client registry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use relaygate_core::repository::client::ClientRegistry;
use relaygate_types::admission::ClientStatusRecord;
use relaygate_types::error::RepositoryError;

#[derive(Clone, Default)]
pub struct MemoryClientRegistry {
    records: Arc<DashMap<String, ClientStatusRecord>>,
}

impl MemoryClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClientRegistry for MemoryClientRegistry {
    async fn find_by_task(&self, task_id: &str) -> Result<Option<ClientStatusRecord>, RepositoryError> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.task_id == task_id && !r.is_claiming())
            .max_by_key(|r| r.updated_at)
            .map(|r| r.value().clone()))
    }

    async fn get(&self, client_id: &str) -> Result<Option<ClientStatusRecord>, RepositoryError> {
        Ok(self.records.get(client_id).map(|r| r.value().clone()))
    }

    async fn upsert(&self, record: &ClientStatusRecord) -> Result<(), RepositoryError> {
        self.records.insert(record.client_id.clone(), record.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ClientStatusRecord>, RepositoryError> {
        let mut records: Vec<ClientStatusRecord> =
            self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| {
            a.client_name
                .cmp(&b.client_name)
                .then_with(|| a.client_id.cmp(&b.client_id))
        });
        Ok(records)
    }

    async fn record_processed(
        &self,
        client_id: &str,
        status: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut record = self
            .records
            .get_mut(client_id)
            .ok_or(RepositoryError::NotFound)?;
        record.last_processed_status = Some(status.to_string());
        record.last_execution_timestamp = Some(at);
        record.updated_at = at;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_by_task_skips_claiming() {
        let registry = MemoryClientRegistry::new();
        let mut claiming = ClientStatusRecord::new("c0", "Placeholder", "abc123");
        claiming.status = ClientStatusRecord::CLAIMING.to_string();
        registry.upsert(&claiming).await.unwrap();
        assert!(registry.find_by_task("abc123").await.unwrap().is_none());

        registry
            .upsert(&ClientStatusRecord::new("c1", "Acme Ltd", "abc123"))
            .await
            .unwrap();
        let found = registry.find_by_task("abc123").await.unwrap().unwrap();
        assert_eq!(found.client_id, "c1");
    }

    #[tokio::test]
    async fn test_record_processed_unknown_client() {
        let registry = MemoryClientRegistry::new();
        let err = registry
            .record_processed("missing", "reply", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }
}
