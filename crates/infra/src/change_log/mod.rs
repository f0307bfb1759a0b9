//! Append-only change log.
//!
//! Every mutating service operation records who changed what, with a JSON
//! snapshot of the resulting state. Entries are written after the change has
//! committed and are never updated or deleted.

pub mod in_memory;
pub mod postgres;

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use almox_core::{ChangeId, UserId};

use crate::store::{Page, Pagination, StoreError};

pub use in_memory::InMemoryChangeLog;
pub use postgres::PostgresChangeLog;

/// Kind of record a change-log entry refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    UnitOfMeasure,
    Category,
    Product,
    StockMovement,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::UnitOfMeasure => "unit_of_measure",
            EntityKind::Category => "category",
            EntityKind::Product => "product",
            EntityKind::StockMovement => "stock_movement",
        }
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unit_of_measure" => Ok(EntityKind::UnitOfMeasure),
            "category" => Ok(EntityKind::Category),
            "product" => Ok(EntityKind::Product),
            "stock_movement" => Ok(EntityKind::StockMovement),
            other => Err(format!("unknown entity kind: {other}")),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Create => "create",
            ChangeAction::Update => "update",
            ChangeAction::Delete => "delete",
        }
    }
}

impl FromStr for ChangeAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(ChangeAction::Create),
            "update" => Ok(ChangeAction::Update),
            "delete" => Ok(ChangeAction::Delete),
            other => Err(format!("unknown change action: {other}")),
        }
    }
}

/// One recorded change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub id: ChangeId,
    pub entity_kind: EntityKind,
    pub entity_id: Uuid,
    pub action: ChangeAction,
    pub actor: UserId,
    pub recorded_at: DateTime<Utc>,
    pub snapshot: serde_json::Value,
}

impl ChangeLogEntry {
    /// Build an entry with a JSON snapshot of `state`.
    ///
    /// A state that fails to serialize is recorded as `null` rather than
    /// dropping the entry.
    pub fn record<T: Serialize>(
        entity_kind: EntityKind,
        entity_id: impl Into<Uuid>,
        action: ChangeAction,
        actor: UserId,
        state: &T,
    ) -> Self {
        Self {
            id: ChangeId::new(),
            entity_kind,
            entity_id: entity_id.into(),
            action,
            actor,
            recorded_at: Utc::now(),
            snapshot: serde_json::to_value(state).unwrap_or(serde_json::Value::Null),
        }
    }
}

/// Filter for listing change-log entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLogFilter {
    pub entity_kind: Option<EntityKind>,
    pub entity_id: Option<Uuid>,
}

impl ChangeLogFilter {
    pub(crate) fn matches(&self, entry: &ChangeLogEntry) -> bool {
        self.entity_kind.is_none_or(|k| k == entry.entity_kind)
            && self.entity_id.is_none_or(|id| id == entry.entity_id)
    }
}

/// Append-only change-log writer and reader.
#[async_trait::async_trait]
pub trait ChangeLog: Send + Sync {
    async fn append(&self, entry: ChangeLogEntry) -> Result<(), StoreError>;

    /// Newest first.
    async fn list(
        &self,
        filter: &ChangeLogFilter,
        pagination: Pagination,
    ) -> Result<Page<ChangeLogEntry>, StoreError>;
}

/// Append `entry` after a committed change. Failures are logged, not returned:
/// the change itself already happened.
pub(crate) async fn append_after_commit(log: &dyn ChangeLog, entry: ChangeLogEntry) {
    let kind = entry.entity_kind.as_str();
    let entity_id = entry.entity_id;
    if let Err(error) = log.append(entry).await {
        tracing::warn!(
            entity_kind = kind,
            entity_id = %entity_id,
            error = %error,
            "failed to append change log entry"
        );
    }
}
