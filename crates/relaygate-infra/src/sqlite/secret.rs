//! SQLite versioned secret store.
//!
//! Versions live in `secret_versions`; stage labels live in `secret_stages`
//! keyed by `(secret_id, stage)`, so moving a label is a single upsert.
//! Values are never logged.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use relaygate_core::repository::secret_store::SecretStore;
use relaygate_types::error::RepositoryError;
use relaygate_types::secret::{Redacted, SecretStage, SecretVersion, VersionStages};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SecretStore`.
#[derive(Clone)]
pub struct SqliteSecretStore {
    pool: DatabasePool,
}

impl SqliteSecretStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn stages_of(
        &self,
        secret_id: &str,
        version_id: &str,
    ) -> Result<Vec<SecretStage>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT stage FROM secret_stages WHERE secret_id = ? AND version_id = ? ORDER BY stage",
        )
        .bind(secret_id)
        .bind(version_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        rows.iter().map(|row| parse_stage(row, "stage")).collect()
    }

    async fn with_stages(&self, secret_id: &str, row: SqliteRow) -> Result<SecretVersion, RepositoryError> {
        let version_id: String = row.try_get("version_id").map_err(query_err)?;
        let value: String = row.try_get("value").map_err(query_err)?;
        let created_at: String = row.try_get("created_at").map_err(query_err)?;
        let stages = self.stages_of(secret_id, &version_id).await?;

        Ok(SecretVersion {
            secret_id: secret_id.to_string(),
            version_id,
            value: Redacted::new(value),
            stages,
            created_at: parse_datetime(&created_at)?,
        })
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

fn parse_stage(row: &SqliteRow, column: &str) -> Result<SecretStage, RepositoryError> {
    let raw: String = row.try_get(column).map_err(query_err)?;
    raw.parse::<SecretStage>().map_err(RepositoryError::Query)
}

/// Point `stage` of `secret_id` at `version_id`, detaching it from any other version.
async fn set_stage(
    tx: &mut Transaction<'_, Sqlite>,
    secret_id: &str,
    stage: SecretStage,
    version_id: &str,
    now: &str,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO secret_stages (secret_id, stage, version_id, updated_at)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(secret_id, stage) DO UPDATE SET version_id = excluded.version_id, updated_at = excluded.updated_at",
    )
    .bind(secret_id)
    .bind(stage.as_str())
    .bind(version_id)
    .bind(now)
    .execute(&mut **tx)
    .await
    .map_err(query_err)?;
    Ok(())
}

impl SecretStore for SqliteSecretStore {
    async fn get(
        &self,
        secret_id: &str,
        stage: SecretStage,
    ) -> Result<Option<SecretVersion>, RepositoryError> {
        let row = sqlx::query(
            "SELECT v.version_id, v.value, v.created_at
             FROM secret_stages s
             JOIN secret_versions v ON v.secret_id = s.secret_id AND v.version_id = s.version_id
             WHERE s.secret_id = ? AND s.stage = ?",
        )
        .bind(secret_id)
        .bind(stage.as_str())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_err)?;

        match row {
            Some(row) => Ok(Some(self.with_stages(secret_id, row).await?)),
            None => Ok(None),
        }
    }

    async fn get_version(
        &self,
        secret_id: &str,
        version_id: &str,
    ) -> Result<Option<SecretVersion>, RepositoryError> {
        let row = sqlx::query(
            "SELECT version_id, value, created_at FROM secret_versions WHERE secret_id = ? AND version_id = ?",
        )
        .bind(secret_id)
        .bind(version_id)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_err)?;

        match row {
            Some(row) => Ok(Some(self.with_stages(secret_id, row).await?)),
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        secret_id: &str,
        version_id: &str,
        value: &str,
        stages: &[SecretStage],
    ) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        let existing: Option<(String,)> = sqlx::query_as(
            "SELECT value FROM secret_versions WHERE secret_id = ? AND version_id = ?",
        )
        .bind(secret_id)
        .bind(version_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(query_err)?;

        match existing {
            Some((stored,)) if stored != value => {
                return Err(RepositoryError::Conflict(format!(
                    "version {version_id} of {secret_id} already exists with a different value"
                )));
            }
            Some(_) => {}
            None => {
                sqlx::query(
                    "INSERT INTO secret_versions (secret_id, version_id, value, created_at) VALUES (?, ?, ?, ?)",
                )
                .bind(secret_id)
                .bind(version_id)
                .bind(value)
                .bind(&now)
                .execute(&mut *tx)
                .await
                .map_err(query_err)?;
            }
        }

        for stage in stages {
            set_stage(&mut tx, secret_id, *stage, version_id, &now).await?;
        }

        tx.commit().await.map_err(query_err)?;
        Ok(())
    }

    async fn list_versions(&self, secret_id: &str) -> Result<Vec<VersionStages>, RepositoryError> {
        let version_rows = sqlx::query(
            "SELECT version_id, created_at FROM secret_versions WHERE secret_id = ? ORDER BY created_at, rowid",
        )
        .bind(secret_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        let stage_rows = sqlx::query("SELECT stage, version_id FROM secret_stages WHERE secret_id = ?")
            .bind(secret_id)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;

        let mut labels: HashMap<String, Vec<SecretStage>> = HashMap::new();
        for row in &stage_rows {
            let version_id: String = row.try_get("version_id").map_err(query_err)?;
            labels.entry(version_id).or_default().push(parse_stage(row, "stage")?);
        }

        let mut versions = Vec::with_capacity(version_rows.len());
        for row in &version_rows {
            let version_id: String = row.try_get("version_id").map_err(query_err)?;
            let created_at: String = row.try_get("created_at").map_err(query_err)?;
            versions.push(VersionStages {
                stages: labels.remove(&version_id).unwrap_or_default(),
                version_id,
                created_at: parse_datetime(&created_at)?,
            });
        }
        Ok(versions)
    }

    async fn promote(
        &self,
        secret_id: &str,
        to_version: &str,
        from_version: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        let target: Option<(String,)> = sqlx::query_as(
            "SELECT version_id FROM secret_versions WHERE secret_id = ? AND version_id = ?",
        )
        .bind(secret_id)
        .bind(to_version)
        .fetch_optional(&mut *tx)
        .await
        .map_err(query_err)?;
        if target.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let holder: Option<(String,)> = sqlx::query_as(
            "SELECT version_id FROM secret_stages WHERE secret_id = ? AND stage = 'CURRENT'",
        )
        .bind(secret_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(query_err)?;
        let holder = holder.map(|(v,)| v);
        if holder.as_deref() != from_version {
            return Err(RepositoryError::Conflict(format!(
                "CURRENT of {secret_id} is held by {}, expected {}",
                holder.as_deref().unwrap_or("no version"),
                from_version.unwrap_or("no version")
            )));
        }

        set_stage(&mut tx, secret_id, SecretStage::Current, to_version, &now).await?;

        sqlx::query(
            "DELETE FROM secret_stages WHERE secret_id = ? AND version_id = ? AND stage IN ('PENDING', 'PREVIOUS')",
        )
        .bind(secret_id)
        .bind(to_version)
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;

        if let Some(previous) = from_version {
            set_stage(&mut tx, secret_id, SecretStage::Previous, previous, &now).await?;
        }

        tx.commit().await.map_err(query_err)?;
        Ok(())
    }
}
