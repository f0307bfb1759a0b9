use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use almox_core::{ChangeId, UserId};

use crate::store::{Page, Pagination, StoreError};

use super::{ChangeLog, ChangeLogEntry, ChangeLogFilter};

/// Postgres-backed change log (`change_log` table).
#[derive(Debug, Clone)]
pub struct PostgresChangeLog {
    pool: Arc<PgPool>,
}

impl PostgresChangeLog {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait::async_trait]
impl ChangeLog for PostgresChangeLog {
    #[instrument(
        skip(self, entry),
        fields(
            entity_kind = entry.entity_kind.as_str(),
            entity_id = %entry.entity_id,
            action = entry.action.as_str()
        ),
        err
    )]
    async fn append(&self, entry: ChangeLogEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO change_log (id, entity_kind, entity_id, action, actor_id, recorded_at, snapshot)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.entity_kind.as_str())
        .bind(entry.entity_id)
        .bind(entry.action.as_str())
        .bind(entry.actor.as_uuid())
        .bind(entry.recorded_at)
        .bind(&entry.snapshot)
        .execute(&*self.pool)
        .await
        .map_err(|e| StoreError::Backend(format!("database error in append_change: {e}")))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list(
        &self,
        filter: &ChangeLogFilter,
        pagination: Pagination,
    ) -> Result<Page<ChangeLogEntry>, StoreError> {
        let kind = filter.entity_kind.map(|k| k.as_str());
        const WHERE: &str = r#"
            WHERE ($1::text IS NULL OR entity_kind = $1)
              AND ($2::uuid IS NULL OR entity_id = $2)
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM change_log {WHERE}"))
            .bind(kind)
            .bind(filter.entity_id)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("database error in count_changes: {e}")))?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT id, entity_kind, entity_id, action, actor_id, recorded_at, snapshot
            FROM change_log
            {WHERE}
            ORDER BY recorded_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(kind)
        .bind(filter.entity_id)
        .bind(pagination.limit as i64)
        .bind(pagination.offset as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| StoreError::Backend(format!("database error in list_changes: {e}")))?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            let change = ChangeRow::from_row(row)
                .map_err(|e| StoreError::Corrupt(format!("failed to decode change row: {e}")))?;
            items.push(change.try_into()?);
        }
        Ok(Page::new(items, total as u64, pagination))
    }
}

#[derive(Debug)]
struct ChangeRow {
    id: Uuid,
    entity_kind: String,
    entity_id: Uuid,
    action: String,
    actor_id: Uuid,
    recorded_at: DateTime<Utc>,
    snapshot: serde_json::Value,
}

impl<'r> FromRow<'r, PgRow> for ChangeRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ChangeRow {
            id: row.try_get("id")?,
            entity_kind: row.try_get("entity_kind")?,
            entity_id: row.try_get("entity_id")?,
            action: row.try_get("action")?,
            actor_id: row.try_get("actor_id")?,
            recorded_at: row.try_get("recorded_at")?,
            snapshot: row.try_get("snapshot")?,
        })
    }
}

impl TryFrom<ChangeRow> for ChangeLogEntry {
    type Error = StoreError;

    fn try_from(row: ChangeRow) -> Result<Self, Self::Error> {
        Ok(ChangeLogEntry {
            id: ChangeId::from_uuid(row.id),
            entity_kind: row.entity_kind.parse().map_err(StoreError::Corrupt)?,
            entity_id: row.entity_id,
            action: row.action.parse().map_err(StoreError::Corrupt)?,
            actor: UserId::from_uuid(row.actor_id),
            recorded_at: row.recorded_at,
            snapshot: row.snapshot,
        })
    }
}
