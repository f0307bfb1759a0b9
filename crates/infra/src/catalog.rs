//! Catalog service: units of measure, categories, products, and the read
//! views built on top of them (product detail, movement-form lookup,
//! dashboard).

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument, warn};

use almox_core::{CategoryId, DomainError, MovementId, ProductId, UnitId, UserId};
use almox_inventory::{
    Category, CategoryDraft, MovementDirection, MovementRequest, Product, ProductDraft, Quantity,
    UnitDraft, UnitOfMeasure,
};

use crate::change_log::{ChangeAction, ChangeLog, ChangeLogEntry, EntityKind, append_after_commit};
use crate::error::ServiceResult;
use crate::ledger::StockLedger;
use crate::store::{
    InventoryStore, LookupFilter, MovementError, MovementFilter, MovementRecord, Page, Pagination,
    ProductFilter,
};

/// Notes recorded on the movement created for a product's opening balance.
pub const OPENING_BALANCE_NOTES: &str = "opening balance";

/// Number of low-stock products and recent movements shown on the dashboard.
pub const DASHBOARD_ITEMS: u32 = 10;

/// Product detail view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductDetail {
    pub product: Product,
    pub unit: UnitOfMeasure,
    pub category: Option<Category>,
    pub low_stock: bool,
    pub recent_movements: Vec<MovementRecord>,
}

/// What the movement form needs to know about a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductInfo {
    pub id: ProductId,
    pub code: String,
    pub name: String,
    pub quantity_current: Quantity,
    pub unit_symbol: String,
    pub unit_name: String,
    pub low_stock: bool,
}

/// Product list plus the count of active products at or below their minimum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductListing {
    pub page: Page<Product>,
    pub low_stock_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub active_products: u64,
    pub active_categories: u64,
    pub low_stock_count: u64,
    pub low_stock: Vec<Product>,
    pub recent_movements: Vec<MovementRecord>,
}

#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn InventoryStore>,
    changes: Arc<dyn ChangeLog>,
    ledger: StockLedger,
}

impl Catalog {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        changes: Arc<dyn ChangeLog>,
        ledger: StockLedger,
    ) -> Self {
        Self {
            store,
            changes,
            ledger,
        }
    }

    async fn log<T: Serialize + Sync>(
        &self,
        kind: EntityKind,
        id: impl Into<uuid::Uuid>,
        action: ChangeAction,
        actor: UserId,
        state: &T,
    ) {
        append_after_commit(
            self.changes.as_ref(),
            ChangeLogEntry::record(kind, id, action, actor, state),
        )
        .await;
    }

    // Units of measure

    #[instrument(skip(self, draft), fields(actor = %actor), err)]
    pub async fn create_unit(&self, actor: UserId, draft: UnitDraft) -> ServiceResult<UnitOfMeasure> {
        let unit = UnitOfMeasure::create(UnitId::new(), draft)?;
        self.store.insert_unit(&unit).await?;
        info!(unit_id = %unit.id, symbol = %unit.symbol, "unit of measure created");
        self.log(EntityKind::UnitOfMeasure, unit.id, ChangeAction::Create, actor, &unit)
            .await;
        Ok(unit)
    }

    #[instrument(skip(self, draft), fields(actor = %actor, unit_id = %id), err)]
    pub async fn update_unit(
        &self,
        actor: UserId,
        id: UnitId,
        draft: UnitDraft,
    ) -> ServiceResult<UnitOfMeasure> {
        let mut unit = self.get_unit(id).await?;
        unit.update(draft)?;
        self.store.update_unit(&unit).await?;
        self.log(EntityKind::UnitOfMeasure, id, ChangeAction::Update, actor, &unit)
            .await;
        Ok(unit)
    }

    pub async fn get_unit(&self, id: UnitId) -> ServiceResult<UnitOfMeasure> {
        self.store
            .get_unit(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("unit {id}")).into())
    }

    pub async fn list_units(
        &self,
        filter: &LookupFilter,
        pagination: Pagination,
    ) -> ServiceResult<Page<UnitOfMeasure>> {
        Ok(self.store.list_units(filter, pagination).await?)
    }

    #[instrument(skip(self), fields(actor = %actor, unit_id = %id), err)]
    pub async fn delete_unit(&self, actor: UserId, id: UnitId) -> ServiceResult<()> {
        let unit = self.get_unit(id).await?;
        self.store.delete_unit(id).await?;
        self.log(EntityKind::UnitOfMeasure, id, ChangeAction::Delete, actor, &unit)
            .await;
        Ok(())
    }

    // Categories

    #[instrument(skip(self, draft), fields(actor = %actor), err)]
    pub async fn create_category(
        &self,
        actor: UserId,
        draft: CategoryDraft,
    ) -> ServiceResult<Category> {
        let category = Category::create(CategoryId::new(), draft)?;
        self.store.insert_category(&category).await?;
        info!(category_id = %category.id, "category created");
        self.log(EntityKind::Category, category.id, ChangeAction::Create, actor, &category)
            .await;
        Ok(category)
    }

    #[instrument(skip(self, draft), fields(actor = %actor, category_id = %id), err)]
    pub async fn update_category(
        &self,
        actor: UserId,
        id: CategoryId,
        draft: CategoryDraft,
    ) -> ServiceResult<Category> {
        let mut category = self.get_category(id).await?;
        category.update(draft)?;
        self.store.update_category(&category).await?;
        self.log(EntityKind::Category, id, ChangeAction::Update, actor, &category)
            .await;
        Ok(category)
    }

    pub async fn get_category(&self, id: CategoryId) -> ServiceResult<Category> {
        self.store
            .get_category(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("category {id}")).into())
    }

    pub async fn list_categories(
        &self,
        filter: &LookupFilter,
        pagination: Pagination,
    ) -> ServiceResult<Page<Category>> {
        Ok(self.store.list_categories(filter, pagination).await?)
    }

    /// Delete a category. Products in it keep existing without a category.
    #[instrument(skip(self), fields(actor = %actor, category_id = %id), err)]
    pub async fn delete_category(&self, actor: UserId, id: CategoryId) -> ServiceResult<()> {
        let category = self.get_category(id).await?;
        self.store.delete_category(id).await?;
        self.log(EntityKind::Category, id, ChangeAction::Delete, actor, &category)
            .await;
        Ok(())
    }

    // Products

    /// Only active units and categories may be assigned to a product.
    async fn check_references(&self, draft: &ProductDraft) -> ServiceResult<()> {
        match self.store.get_unit(draft.unit_id).await? {
            Some(unit) if unit.active => {}
            Some(_) => {
                return Err(DomainError::validation(format!(
                    "unit {} is inactive",
                    draft.unit_id
                ))
                .into());
            }
            None => {
                return Err(DomainError::validation(format!(
                    "unit {} does not exist",
                    draft.unit_id
                ))
                .into());
            }
        }

        if let Some(category_id) = draft.category_id {
            match self.store.get_category(category_id).await? {
                Some(category) if category.active => {}
                Some(_) => {
                    return Err(DomainError::validation(format!(
                        "category {category_id} is inactive"
                    ))
                    .into());
                }
                None => {
                    return Err(DomainError::validation(format!(
                        "category {category_id} does not exist"
                    ))
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Create a product. A positive `opening_balance` is booked as an entry
    /// movement by `actor`, so the balance always equals the sum of movements.
    ///
    /// The product and its opening entry are stored as one unit: when the
    /// entry is rejected (e.g. the draft is inactive) nothing is persisted or
    /// logged.
    #[instrument(skip(self, draft, opening_balance), fields(actor = %actor), err)]
    pub async fn create_product(
        &self,
        actor: UserId,
        draft: ProductDraft,
        opening_balance: Option<Decimal>,
    ) -> ServiceResult<Product> {
        let opening = opening_balance.unwrap_or(Decimal::ZERO);
        if opening < Decimal::ZERO {
            return Err(DomainError::validation("opening_balance cannot be negative").into());
        }
        if opening > Decimal::ZERO {
            almox_inventory::validate_quantity(opening)?;
        }

        self.check_references(&draft).await?;
        let product = Product::create(ProductId::new(), draft, Utc::now())?;

        if opening.is_zero() {
            self.store.insert_product(&product).await?;
            info!(product_id = %product.id_typed(), code = product.code(), "product created");
            self.log(
                EntityKind::Product,
                product.id_typed(),
                ChangeAction::Create,
                actor,
                &product,
            )
            .await;
            return Ok(product);
        }

        // Product and opening entry commit together or not at all.
        let movement_id = MovementId::new();
        let opening_request = MovementRequest {
            product_id: product.id_typed(),
            direction: MovementDirection::In,
            quantity: opening,
            actor,
            notes: OPENING_BALANCE_NOTES.to_string(),
        };
        let outcome = match self
            .store
            .insert_product_with_opening(&product, &opening_request, movement_id, Utc::now())
            .await
        {
            Ok(outcome) => outcome,
            Err(MovementError::Rejected(reason)) => {
                warn!(
                    code = product.code(),
                    opening_balance = %opening,
                    reason = %reason,
                    "opening balance rejected; product not created"
                );
                return Err(reason.into());
            }
            Err(other) => return Err(other.into()),
        };

        info!(
            product_id = %product.id_typed(),
            code = product.code(),
            opening_balance = %outcome.movement.quantity(),
            "product created"
        );
        self.log(
            EntityKind::Product,
            product.id_typed(),
            ChangeAction::Create,
            actor,
            &outcome.product,
        )
        .await;
        self.log(
            EntityKind::StockMovement,
            movement_id,
            ChangeAction::Create,
            actor,
            &outcome.movement,
        )
        .await;
        Ok(outcome.product)
    }

    /// Apply form edits. The current balance is never touched here.
    #[instrument(skip(self, draft), fields(actor = %actor, product_id = %id), err)]
    pub async fn update_product(
        &self,
        actor: UserId,
        id: ProductId,
        draft: ProductDraft,
    ) -> ServiceResult<Product> {
        let mut product = self.get_product(id).await?;
        self.check_references(&draft).await?;
        product.update(draft, Utc::now())?;
        self.store.update_product(&product).await?;

        // Re-read so the response carries the balance as committed.
        let product = self.get_product(id).await?;
        self.log(EntityKind::Product, id, ChangeAction::Update, actor, &product)
            .await;
        Ok(product)
    }

    pub async fn get_product(&self, id: ProductId) -> ServiceResult<Product> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("product {id}")).into())
    }

    pub async fn list_products(
        &self,
        filter: &ProductFilter,
        pagination: Pagination,
    ) -> ServiceResult<ProductListing> {
        let page = self.store.list_products(filter, pagination).await?;
        let low_stock_count = self.count_active_low_stock().await?;
        Ok(ProductListing {
            page,
            low_stock_count,
        })
    }

    /// Hard delete. Products with movement history must be deactivated instead.
    #[instrument(skip(self), fields(actor = %actor, product_id = %id), err)]
    pub async fn delete_product(&self, actor: UserId, id: ProductId) -> ServiceResult<()> {
        let product = self.get_product(id).await?;
        self.store.delete_product(id).await?;
        info!(code = product.code(), "product deleted");
        self.log(EntityKind::Product, id, ChangeAction::Delete, actor, &product)
            .await;
        Ok(())
    }

    pub async fn product_detail(&self, id: ProductId) -> ServiceResult<ProductDetail> {
        let product = self.get_product(id).await?;
        let unit = self.get_unit(product.unit_id()).await?;
        let category = match product.category_id() {
            Some(category_id) => self.store.get_category(category_id).await?,
            None => None,
        };
        let recent_movements = self.ledger.recent_movements(id).await?;

        Ok(ProductDetail {
            low_stock: product.is_low_stock(),
            product,
            unit,
            category,
            recent_movements,
        })
    }

    /// Lookup for the movement form. Inactive products are reported as missing.
    pub async fn product_info(&self, id: ProductId) -> ServiceResult<ProductInfo> {
        let product = self
            .store
            .get_product(id)
            .await?
            .filter(Product::is_active)
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))?;
        let unit = self.get_unit(product.unit_id()).await?;

        Ok(ProductInfo {
            id,
            code: product.code().to_string(),
            name: product.name().to_string(),
            quantity_current: product.quantity_current(),
            unit_symbol: unit.symbol,
            unit_name: unit.name,
            low_stock: product.is_low_stock(),
        })
    }

    async fn count_active_low_stock(&self) -> ServiceResult<u64> {
        let page = self
            .store
            .list_products(&active_low_stock(), Pagination::first(1))
            .await?;
        Ok(page.total)
    }

    pub async fn dashboard(&self) -> ServiceResult<Dashboard> {
        let active = LookupFilter {
            search: None,
            active: Some(true),
        };
        let active_products = self
            .store
            .list_products(
                &ProductFilter {
                    active: Some(true),
                    ..ProductFilter::default()
                },
                Pagination::first(1),
            )
            .await?
            .total;
        let active_categories = self
            .store
            .list_categories(&active, Pagination::first(1))
            .await?
            .total;
        let low_stock = self
            .store
            .list_products(&active_low_stock(), Pagination::first(DASHBOARD_ITEMS))
            .await?;
        let recent_movements = self
            .ledger
            .list_movements(&MovementFilter::default(), Pagination::first(DASHBOARD_ITEMS))
            .await?
            .items;

        Ok(Dashboard {
            active_products,
            active_categories,
            low_stock_count: low_stock.total,
            low_stock: low_stock.items,
            recent_movements,
        })
    }
}

fn active_low_stock() -> ProductFilter {
    ProductFilter {
        active: Some(true),
        low_stock_only: true,
        ..ProductFilter::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use almox_inventory::LedgerError;
    use rust_decimal_macros::dec;

    use crate::change_log::{ChangeLogFilter, InMemoryChangeLog};
    use crate::error::ServiceError;
    use crate::store::{InMemoryInventoryStore, StoreError};

    fn catalog() -> (Catalog, Arc<InMemoryChangeLog>) {
        let store: Arc<dyn InventoryStore> = Arc::new(InMemoryInventoryStore::new());
        let changes = Arc::new(InMemoryChangeLog::new());
        let ledger = StockLedger::new(store.clone(), changes.clone());
        (Catalog::new(store, changes.clone(), ledger), changes)
    }

    fn unit_draft(name: &str, symbol: &str) -> UnitDraft {
        UnitDraft {
            name: name.to_string(),
            symbol: symbol.to_string(),
            description: String::new(),
            active: true,
        }
    }

    fn product_draft(code: &str, unit_id: UnitId) -> ProductDraft {
        ProductDraft {
            code: code.to_string(),
            name: format!("Produto {code}"),
            description: String::new(),
            category_id: None,
            unit_id,
            quantity_minimum: dec!(5),
            location: String::new(),
            notes: String::new(),
            active: true,
        }
    }

    #[tokio::test]
    async fn opening_balance_is_booked_as_one_entry() {
        let (catalog, changes) = catalog();
        let actor = UserId::new();
        let unit = catalog.create_unit(actor, unit_draft("Unidade", "un")).await.unwrap();

        let product = catalog
            .create_product(actor, product_draft("CAN-001", unit.id), Some(dec!(10)))
            .await
            .unwrap();
        assert_eq!(product.quantity_current().value(), dec!(10));

        let detail = catalog.product_detail(product.id_typed()).await.unwrap();
        assert_eq!(detail.recent_movements.len(), 1);
        let opening = &detail.recent_movements[0].movement;
        assert_eq!(opening.direction(), MovementDirection::In);
        assert_eq!(opening.notes(), OPENING_BALANCE_NOTES);
        assert_eq!(opening.actor(), actor);
        assert!(!detail.low_stock);

        let logged = changes
            .list(&ChangeLogFilter::default(), Pagination::default())
            .await
            .unwrap();
        let kinds: Vec<_> = logged.items.iter().map(|e| (e.entity_kind, e.action)).collect();
        assert_eq!(
            kinds,
            vec![
                (EntityKind::StockMovement, ChangeAction::Create),
                (EntityKind::Product, ChangeAction::Create),
                (EntityKind::UnitOfMeasure, ChangeAction::Create),
            ]
        );
        assert_eq!(logged.items[1].snapshot["quantity_current"], "10.00");
    }

    #[tokio::test]
    async fn negative_opening_balance_creates_nothing() {
        let (catalog, _) = catalog();
        let actor = UserId::new();
        let unit = catalog.create_unit(actor, unit_draft("Unidade", "un")).await.unwrap();

        let err = catalog
            .create_product(actor, product_draft("CAN-001", unit.id), Some(dec!(-1)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
        let listing = catalog
            .list_products(&ProductFilter::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(listing.page.total, 0);
    }

    #[tokio::test]
    async fn rejected_opening_balance_leaves_no_product_behind() {
        let (catalog, changes) = catalog();
        let actor = UserId::new();
        let unit = catalog.create_unit(actor, unit_draft("Unidade", "un")).await.unwrap();

        let err = catalog
            .create_product(
                actor,
                ProductDraft {
                    active: false,
                    ..product_draft("CAN-001", unit.id)
                },
                Some(dec!(5)),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Ledger(LedgerError::ProductInactive(_))
        ));

        let listing = catalog
            .list_products(&ProductFilter::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(listing.page.total, 0);
        let movements = catalog
            .ledger
            .list_movements(&MovementFilter::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(movements.total, 0);

        // Only the unit creation was logged.
        let logged = changes
            .list(&ChangeLogFilter::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(logged.total, 1);
        assert_eq!(logged.items[0].entity_kind, EntityKind::UnitOfMeasure);

        // The code is still free.
        let product = catalog
            .create_product(actor, product_draft("CAN-001", unit.id), Some(dec!(5)))
            .await
            .unwrap();
        assert_eq!(product.quantity_current().value(), dec!(5));
    }

    #[tokio::test]
    async fn inactive_unit_cannot_be_assigned() {
        let (catalog, _) = catalog();
        let actor = UserId::new();
        let unit = catalog
            .create_unit(
                actor,
                UnitDraft {
                    active: false,
                    ..unit_draft("Galão", "gl")
                },
            )
            .await
            .unwrap();

        let err = catalog
            .create_product(actor, product_draft("DET-001", unit.id), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn update_never_changes_balance() {
        let (catalog, _) = catalog();
        let actor = UserId::new();
        let unit = catalog.create_unit(actor, unit_draft("Unidade", "un")).await.unwrap();
        let product = catalog
            .create_product(actor, product_draft("CAN-001", unit.id), Some(dec!(7)))
            .await
            .unwrap();

        let updated = catalog
            .update_product(
                actor,
                product.id_typed(),
                ProductDraft {
                    quantity_minimum: dec!(8),
                    ..product_draft("CAN-001", unit.id)
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.quantity_current().value(), dec!(7));
        assert!(updated.is_low_stock());
    }

    #[tokio::test]
    async fn product_with_history_must_be_deactivated_instead() {
        let (catalog, _) = catalog();
        let actor = UserId::new();
        let unit = catalog.create_unit(actor, unit_draft("Unidade", "un")).await.unwrap();
        let product = catalog
            .create_product(actor, product_draft("CAN-001", unit.id), Some(dec!(1)))
            .await
            .unwrap();

        let err = catalog.delete_product(actor, product.id_typed()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Store(StoreError::Conflict(_))));

        let untouched = catalog
            .create_product(actor, product_draft("CAN-002", unit.id), None)
            .await
            .unwrap();
        catalog.delete_product(actor, untouched.id_typed()).await.unwrap();
        assert!(matches!(
            catalog.get_product(untouched.id_typed()).await,
            Err(ServiceError::Domain(DomainError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn info_hides_inactive_products_and_ledger_rejects_them() {
        let (catalog, _) = catalog();
        let actor = UserId::new();
        let unit = catalog.create_unit(actor, unit_draft("Unidade", "un")).await.unwrap();
        let product = catalog
            .create_product(actor, product_draft("CAN-001", unit.id), Some(dec!(3)))
            .await
            .unwrap();

        let info = catalog.product_info(product.id_typed()).await.unwrap();
        assert_eq!(info.unit_symbol, "un");
        assert!(info.low_stock);

        catalog
            .update_product(
                actor,
                product.id_typed(),
                ProductDraft {
                    active: false,
                    ..product_draft("CAN-001", unit.id)
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            catalog.product_info(product.id_typed()).await,
            Err(ServiceError::Domain(DomainError::NotFound(_)))
        ));
        let err = catalog
            .ledger
            .apply_movement(MovementRequest {
                product_id: product.id_typed(),
                direction: MovementDirection::In,
                quantity: dec!(1),
                actor,
                notes: String::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ServiceError::Ledger(LedgerError::ProductInactive(product.id_typed()))
        );
    }

    #[tokio::test]
    async fn dashboard_counts_active_records() {
        let (catalog, _) = catalog();
        let actor = UserId::new();
        let unit = catalog.create_unit(actor, unit_draft("Unidade", "un")).await.unwrap();
        catalog
            .create_category(
                actor,
                CategoryDraft {
                    name: "Escritório".to_string(),
                    description: String::new(),
                    active: true,
                },
            )
            .await
            .unwrap();
        catalog
            .create_product(actor, product_draft("CAN-001", unit.id), Some(dec!(2)))
            .await
            .unwrap();
        catalog
            .create_product(actor, product_draft("LAP-001", unit.id), Some(dec!(50)))
            .await
            .unwrap();

        let dashboard = catalog.dashboard().await.unwrap();
        assert_eq!(dashboard.active_products, 2);
        assert_eq!(dashboard.active_categories, 1);
        assert_eq!(dashboard.low_stock_count, 1);
        assert_eq!(dashboard.low_stock[0].code(), "CAN-001");
        assert_eq!(dashboard.recent_movements.len(), 2);
    }

    #[tokio::test]
    async fn every_mutation_is_logged() {
        let (catalog, changes) = catalog();
        let actor = UserId::new();
        let unit = catalog.create_unit(actor, unit_draft("Unidade", "un")).await.unwrap();
        catalog
            .update_unit(actor, unit.id, unit_draft("Unidade", "und"))
            .await
            .unwrap();
        let spare = catalog.create_unit(actor, unit_draft("Caixa", "cx")).await.unwrap();
        catalog.delete_unit(actor, spare.id).await.unwrap();

        let unit_changes = changes
            .list(
                &ChangeLogFilter {
                    entity_kind: Some(EntityKind::UnitOfMeasure),
                    entity_id: Some(*unit.id.as_uuid()),
                },
                Pagination::default(),
            )
            .await
            .unwrap();
        let actions: Vec<_> = unit_changes.items.iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![ChangeAction::Update, ChangeAction::Create]);
        assert!(unit_changes.items.iter().all(|e| e.actor == actor));

        let all = changes
            .list(&ChangeLogFilter::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(all.total, 4);
        assert_eq!(all.items[0].action, ChangeAction::Delete);
    }
}
