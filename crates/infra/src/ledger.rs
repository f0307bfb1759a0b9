//! Stock ledger service: applies movements through the store and records them
//! in the change log.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use almox_core::{MovementId, ProductId};
use almox_inventory::{MovementRequest, validate_quantity};

use crate::change_log::{ChangeAction, ChangeLog, ChangeLogEntry, EntityKind, append_after_commit};
use crate::error::ServiceResult;
use crate::store::{
    InventoryStore, MovementError, MovementFilter, MovementOutcome, MovementRecord, Page,
    Pagination,
};

/// Number of movements shown on a product's detail view.
pub const RECENT_MOVEMENTS: u32 = 10;

#[derive(Clone)]
pub struct StockLedger {
    store: Arc<dyn InventoryStore>,
    changes: Arc<dyn ChangeLog>,
}

impl StockLedger {
    pub fn new(store: Arc<dyn InventoryStore>, changes: Arc<dyn ChangeLog>) -> Self {
        Self { store, changes }
    }

    /// Apply one entry or exit.
    ///
    /// The balance check and update happen inside the store under the product
    /// lock. A rejection leaves no trace besides a `warn` log line.
    #[instrument(
        skip(self, request),
        fields(
            product_id = %request.product_id,
            direction = %request.direction,
            actor = %request.actor
        ),
        err
    )]
    pub async fn apply_movement(&self, request: MovementRequest) -> ServiceResult<MovementOutcome> {
        validate_quantity(request.quantity)?;

        let movement_id = MovementId::new();
        let outcome = match self
            .store
            .apply_movement(&request, movement_id, Utc::now())
            .await
        {
            Ok(outcome) => outcome,
            Err(MovementError::Rejected(reason)) => {
                warn!(
                    product_id = %request.product_id,
                    quantity = %request.quantity,
                    reason = %reason,
                    "stock movement rejected"
                );
                return Err(reason.into());
            }
            Err(other) => return Err(other.into()),
        };

        info!(
            movement_id = %movement_id,
            quantity = %outcome.movement.quantity(),
            quantity_after = %outcome.movement.quantity_after(),
            low_stock = outcome.product.is_low_stock(),
            "stock movement applied"
        );

        append_after_commit(
            self.changes.as_ref(),
            ChangeLogEntry::record(
                EntityKind::StockMovement,
                movement_id,
                ChangeAction::Create,
                request.actor,
                &outcome.movement,
            ),
        )
        .await;
        append_after_commit(
            self.changes.as_ref(),
            ChangeLogEntry::record(
                EntityKind::Product,
                outcome.product.id_typed(),
                ChangeAction::Update,
                request.actor,
                &outcome.product,
            ),
        )
        .await;

        Ok(outcome)
    }

    /// The newest movements of one product, newest first.
    pub async fn recent_movements(&self, product_id: ProductId) -> ServiceResult<Vec<MovementRecord>> {
        let page = self
            .store
            .list_movements(
                &MovementFilter::for_product(product_id),
                Pagination::first(RECENT_MOVEMENTS),
            )
            .await?;
        Ok(page.items)
    }

    pub async fn list_movements(
        &self,
        filter: &MovementFilter,
        pagination: Pagination,
    ) -> ServiceResult<Page<MovementRecord>> {
        Ok(self.store.list_movements(filter, pagination).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use almox_core::{UnitId, UserId};
    use almox_inventory::{
        LedgerError, MovementDirection, Product, ProductDraft, UnitDraft, UnitOfMeasure,
    };
    use rust_decimal_macros::dec;

    use crate::change_log::{ChangeLogFilter, InMemoryChangeLog};
    use crate::error::ServiceError;
    use crate::store::{InMemoryInventoryStore, LookupStore, ProductStore};

    async fn ledger_with_product() -> (StockLedger, Arc<InMemoryChangeLog>, Product) {
        let store = Arc::new(InMemoryInventoryStore::new());
        let unit = UnitOfMeasure::create(
            UnitId::new(),
            UnitDraft {
                name: "Resma".to_string(),
                symbol: "rs".to_string(),
                description: String::new(),
                active: true,
            },
        )
        .unwrap();
        store.insert_unit(&unit).await.unwrap();
        let product = Product::create(
            ProductId::new(),
            ProductDraft {
                code: "PAP-001".to_string(),
                name: "Papel A4".to_string(),
                description: String::new(),
                category_id: None,
                unit_id: unit.id,
                quantity_minimum: dec!(5),
                location: String::new(),
                notes: String::new(),
                active: true,
            },
            Utc::now(),
        )
        .unwrap();
        store.insert_product(&product).await.unwrap();

        let changes = Arc::new(InMemoryChangeLog::new());
        (StockLedger::new(store, changes.clone()), changes, product)
    }

    fn request(product: &Product, direction: MovementDirection, quantity: rust_decimal::Decimal) -> MovementRequest {
        MovementRequest {
            product_id: product.id_typed(),
            direction,
            quantity,
            actor: UserId::new(),
            notes: "requisição".to_string(),
        }
    }

    #[tokio::test]
    async fn applied_movement_is_logged_twice() {
        let (ledger, changes, product) = ledger_with_product().await;
        let outcome = ledger
            .apply_movement(request(&product, MovementDirection::In, dec!(10)))
            .await
            .unwrap();
        assert_eq!(outcome.movement.quantity_after().value(), dec!(10));

        let logged = changes
            .list(&ChangeLogFilter::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(logged.total, 2);
        assert_eq!(logged.items[0].entity_kind, EntityKind::Product);
        assert_eq!(logged.items[1].entity_kind, EntityKind::StockMovement);
    }

    #[tokio::test]
    async fn rejected_movement_is_not_logged() {
        let (ledger, changes, product) = ledger_with_product().await;
        let err = ledger
            .apply_movement(request(&product, MovementDirection::Out, dec!(1)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Ledger(LedgerError::InsufficientStock { .. })
        ));
        assert_eq!(
            changes
                .list(&ChangeLogFilter::default(), Pagination::default())
                .await
                .unwrap()
                .total,
            0
        );
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected_before_the_store() {
        let (ledger, _, product) = ledger_with_product().await;
        let err = ledger
            .apply_movement(request(&product, MovementDirection::In, dec!(0)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Ledger(LedgerError::InvalidQuantity(_))));
    }

    #[tokio::test]
    async fn recent_movements_caps_at_ten_newest_first() {
        let (ledger, _, product) = ledger_with_product().await;
        for i in 1..=12 {
            ledger
                .apply_movement(request(&product, MovementDirection::In, rust_decimal::Decimal::from(i)))
                .await
                .unwrap();
        }

        let recent = ledger.recent_movements(product.id_typed()).await.unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].movement.quantity().value(), dec!(12));
        assert_eq!(recent[9].movement.quantity().value(), dec!(3));
    }
}
