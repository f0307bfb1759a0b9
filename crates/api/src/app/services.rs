use std::sync::Arc;

use almox_infra::store::{
    InMemoryInventoryStore, InventoryStore, PostgresInventoryStore, StoreError,
};
use almox_infra::{Catalog, ChangeLog, InMemoryChangeLog, PostgresChangeLog, StockLedger};

use crate::config::StorageConfig;

/// Services shared by every handler.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Catalog,
    pub ledger: StockLedger,
    pub changes: Arc<dyn ChangeLog>,
}

impl AppServices {
    pub fn new(store: Arc<dyn InventoryStore>, changes: Arc<dyn ChangeLog>) -> Self {
        let ledger = StockLedger::new(store.clone(), changes.clone());
        let catalog = Catalog::new(store, changes.clone(), ledger.clone());
        Self {
            catalog,
            ledger,
            changes,
        }
    }

    /// Dev/test wiring: everything in process memory.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryInventoryStore::new()),
            Arc::new(InMemoryChangeLog::new()),
        )
    }

    /// Postgres wiring. Applies the schema before returning.
    pub async fn postgres(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let store = PostgresInventoryStore::connect(database_url, max_connections).await?;
        store.ensure_schema().await?;
        let changes = PostgresChangeLog::new(store.pool().clone());
        Ok(Self::new(Arc::new(store), Arc::new(changes)))
    }
}

pub async fn build_services(storage: &StorageConfig) -> Result<AppServices, StoreError> {
    match storage {
        StorageConfig::InMemory => {
            tracing::warn!("using in-memory stores; data is lost on restart");
            Ok(AppServices::in_memory())
        }
        StorageConfig::Postgres {
            database_url,
            max_connections,
        } => AppServices::postgres(database_url, *max_connections).await,
    }
}
