//! SQLite client registry.

use chrono::{DateTime, Utc};
use relaygate_core::repository::client::ClientRegistry;
use relaygate_types::admission::ClientStatusRecord;
use relaygate_types::error::RepositoryError;
use serde_json::{Map, Value};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::pool::DatabasePool;

#[derive(Clone)]
pub struct SqliteClientRegistry {
    pool: DatabasePool,
}

impl SqliteClientRegistry {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn query_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn row_to_record(row: &SqliteRow) -> Result<ClientStatusRecord, RepositoryError> {
    let workflow_ids: String = row.try_get("workflow_ids").map_err(query_err)?;
    let workflow_ids: Map<String, Value> = serde_json::from_str(&workflow_ids)
        .map_err(|e| RepositoryError::Query(format!("invalid workflow_ids: {e}")))?;
    let last_execution: Option<String> =
        row.try_get("last_execution_timestamp").map_err(query_err)?;
    let created_at: String = row.try_get("created_at").map_err(query_err)?;
    let updated_at: String = row.try_get("updated_at").map_err(query_err)?;

    Ok(ClientStatusRecord {
        client_id: row.try_get("client_id").map_err(query_err)?,
        client_name: row.try_get("client_name").map_err(query_err)?,
        task_id: row.try_get("task_id").map_err(query_err)?,
        status: row.try_get("status").map_err(query_err)?,
        last_processed_status: row.try_get("last_processed_status").map_err(query_err)?,
        last_execution_timestamp: last_execution.as_deref().map(parse_datetime).transpose()?,
        workflow_ids,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

impl ClientRegistry for SqliteClientRegistry {
    async fn find_by_task(&self, task_id: &str) -> Result<Option<ClientStatusRecord>, RepositoryError> {
        let row = sqlx::query(
            "SELECT * FROM clients WHERE task_id = ? AND status != 'claiming'
             ORDER BY updated_at DESC LIMIT 1",
        )
        .bind(task_id)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_err)?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn get(&self, client_id: &str) -> Result<Option<ClientStatusRecord>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM clients WHERE client_id = ?")
            .bind(client_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn upsert(&self, record: &ClientStatusRecord) -> Result<(), RepositoryError> {
        let workflow_ids = serde_json::to_string(&record.workflow_ids)
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query(
            "INSERT INTO clients (client_id, client_name, task_id, status, last_processed_status,
                                  last_execution_timestamp, workflow_ids, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(client_id) DO UPDATE SET
                client_name = excluded.client_name,
                task_id = excluded.task_id,
                status = excluded.status,
                last_processed_status = excluded.last_processed_status,
                last_execution_timestamp = excluded.last_execution_timestamp,
                workflow_ids = excluded.workflow_ids,
                updated_at = excluded.updated_at",
        )
        .bind(&record.client_id)
        .bind(&record.client_name)
        .bind(&record.task_id)
        .bind(&record.status)
        .bind(&record.last_processed_status)
        .bind(record.last_execution_timestamp.map(|t| t.to_rfc3339()))
        .bind(&workflow_ids)
        .bind(record.created_at.to_rfc3339())
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<ClientStatusRecord>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM clients ORDER BY client_name, client_id")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;

        rows.iter().map(row_to_record).collect()
    }

    async fn record_processed(
        &self,
        client_id: &str,
        status: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let at = at.to_rfc3339();
        let result = sqlx::query(
            "UPDATE clients SET last_processed_status = ?, last_execution_timestamp = ?, updated_at = ?
             WHERE client_id = ?",
        )
        .bind(status)
        .bind(&at)
        .bind(&at)
        .bind(client_id)
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::test_support::temp_pool;
    use serde_json::json;

    #[tokio::test]
    async fn test_upsert_and_find_by_task() {
        let (_dir, pool) = temp_pool().await;
        let registry = SqliteClientRegistry::new(pool);

        let mut record = ClientStatusRecord::new("c1", "Acme Ltd", "abc123");
        record.workflow_ids.insert("reply".to_string(), json!("wf-9"));
        registry.upsert(&record).await.unwrap();

        let found = registry.find_by_task("abc123").await.unwrap().unwrap();
        assert_eq!(found.client_id, "c1");
        assert_eq!(found.workflow_ids["reply"], json!("wf-9"));
        assert!(found.last_processed_status.is_none());
        assert!(registry.find_by_task("zzz").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_claiming_records_are_ignored() {
        let (_dir, pool) = temp_pool().await;
        let registry = SqliteClientRegistry::new(pool);

        let mut record = ClientStatusRecord::new("c1", "Acme Ltd", "abc123");
        record.status = ClientStatusRecord::CLAIMING.to_string();
        registry.upsert(&record).await.unwrap();

        assert!(registry.find_by_task("abc123").await.unwrap().is_none());
        assert!(registry.get("c1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_record_processed() {
        let (_dir, pool) = temp_pool().await;
        let registry = SqliteClientRegistry::new(pool);
        registry
            .upsert(&ClientStatusRecord::new("c1", "Acme Ltd", "abc123"))
            .await
            .unwrap();

        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        registry.record_processed("c1", "reply", at).await.unwrap();

        let record = registry.get("c1").await.unwrap().unwrap();
        assert_eq!(record.last_processed_status.as_deref(), Some("reply"));
        assert_eq!(record.last_execution_timestamp, Some(at));

        let err = registry.record_processed("nope", "reply", at).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let (_dir, pool) = temp_pool().await;
        let registry = SqliteClientRegistry::new(pool);
        registry.upsert(&ClientStatusRecord::new("c2", "Zeta", "t2")).await.unwrap();
        registry.upsert(&ClientStatusRecord::new("c1", "Alpha", "t1")).await.unwrap();

        let names: Vec<String> = registry.list().await.unwrap().into_iter().map(|r| r.client_name).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }
}
