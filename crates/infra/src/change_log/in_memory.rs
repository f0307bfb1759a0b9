use std::sync::RwLock;

use crate::store::{Page, Pagination, StoreError};

use super::{ChangeLog, ChangeLogEntry, ChangeLogFilter};

/// In-memory change log. Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryChangeLog {
    entries: RwLock<Vec<ChangeLogEntry>>,
}

impl InMemoryChangeLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ChangeLog for InMemoryChangeLog {
    async fn append(&self, entry: ChangeLogEntry) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        entries.push(entry);
        Ok(())
    }

    async fn list(
        &self,
        filter: &ChangeLogFilter,
        pagination: Pagination,
    ) -> Result<Page<ChangeLogEntry>, StoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        // Appended in commit order, so reversing gives newest first.
        let matching: Vec<ChangeLogEntry> = entries
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        Ok(Page::from_sorted(matching, pagination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change_log::{ChangeAction, EntityKind};
    use almox_core::UserId;
    use uuid::Uuid;

    #[tokio::test]
    async fn list_is_newest_first_and_filtered() {
        let log = InMemoryChangeLog::new();
        let actor = UserId::new();
        let product = Uuid::now_v7();

        log.append(ChangeLogEntry::record(EntityKind::Product, product, ChangeAction::Create, actor, &()))
            .await
            .unwrap();
        log.append(ChangeLogEntry::record(EntityKind::Category, Uuid::now_v7(), ChangeAction::Create, actor, &()))
            .await
            .unwrap();
        log.append(ChangeLogEntry::record(EntityKind::Product, product, ChangeAction::Update, actor, &()))
            .await
            .unwrap();

        let page = log
            .list(
                &ChangeLogFilter {
                    entity_kind: Some(EntityKind::Product),
                    entity_id: Some(product),
                },
                Pagination::default(),
            )
            .await
            .unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].action, ChangeAction::Update);
        assert_eq!(page.items[1].action, ChangeAction::Create);
    }
}
