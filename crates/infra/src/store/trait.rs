use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use almox_core::{CategoryId, DomainError, MovementId, ProductId, UnitId};
use almox_inventory::{Category, LedgerError, MovementRequest, Product, StockMovement, UnitOfMeasure};

use super::query::{LookupFilter, MovementFilter, MovementRecord, Page, Pagination, ProductFilter};

/// Storage operation error.
///
/// These are **infrastructure errors** as opposed to ledger rejections
/// ([`LedgerError`]), which are business outcomes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The addressed record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Unique key taken, or the record is still referenced elsewhere.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored row failed domain validation on the way back in.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// Connection, lock, or other backend failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<DomainError> for StoreError {
    fn from(value: DomainError) -> Self {
        StoreError::Corrupt(value.to_string())
    }
}

/// Failure of [`MovementStore::apply_movement`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MovementError {
    #[error(transparent)]
    Rejected(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The committed result of one movement: the product as it now stands and the
/// appended record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovementOutcome {
    pub product: Product,
    pub movement: StockMovement,
}

/// Units of measure and product categories.
#[async_trait::async_trait]
pub trait LookupStore: Send + Sync {
    /// Insert a unit. Duplicate name or symbol is a `Conflict`.
    async fn insert_unit(&self, unit: &UnitOfMeasure) -> Result<(), StoreError>;

    async fn update_unit(&self, unit: &UnitOfMeasure) -> Result<(), StoreError>;

    async fn get_unit(&self, id: UnitId) -> Result<Option<UnitOfMeasure>, StoreError>;

    /// Ordered by name.
    async fn list_units(
        &self,
        filter: &LookupFilter,
        pagination: Pagination,
    ) -> Result<Page<UnitOfMeasure>, StoreError>;

    /// Delete a unit. Rejected with `Conflict` while any product references it.
    async fn delete_unit(&self, id: UnitId) -> Result<(), StoreError>;

    /// Insert a category. Duplicate name is a `Conflict`.
    async fn insert_category(&self, category: &Category) -> Result<(), StoreError>;

    async fn update_category(&self, category: &Category) -> Result<(), StoreError>;

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, StoreError>;

    /// Ordered by name.
    async fn list_categories(
        &self,
        filter: &LookupFilter,
        pagination: Pagination,
    ) -> Result<Page<Category>, StoreError>;

    /// Delete a category; products that referenced it lose their category.
    async fn delete_category(&self, id: CategoryId) -> Result<(), StoreError>;
}

/// Product records (everything except the balance, which belongs to the ledger).
#[async_trait::async_trait]
pub trait ProductStore: Send + Sync {
    /// Insert a product. Duplicate code is a `Conflict`.
    async fn insert_product(&self, product: &Product) -> Result<(), StoreError>;

    /// Persist form fields of an existing product.
    ///
    /// Never writes `quantity_current`: a movement committed between the read
    /// and this write must not be lost.
    async fn update_product(&self, product: &Product) -> Result<(), StoreError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Ordered by name.
    async fn list_products(
        &self,
        filter: &ProductFilter,
        pagination: Pagination,
    ) -> Result<Page<Product>, StoreError>;

    /// Hard delete. Rejected with `Conflict` when the product has movements.
    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError>;
}

/// The append-only movement log plus the atomic balance update.
#[async_trait::async_trait]
pub trait MovementStore: Send + Sync {
    /// Lock the product, run [`almox_inventory::apply_movement`], and persist the
    /// new balance with the new movement as one atomic unit.
    ///
    /// Implementations must hold an exclusive lock on the product from the
    /// balance read until commit, so concurrent movements on the same product
    /// serialize. Movements on different products must not block each other.
    async fn apply_movement(
        &self,
        request: &MovementRequest,
        movement_id: MovementId,
        occurred_at: DateTime<Utc>,
    ) -> Result<MovementOutcome, MovementError>;

    /// Insert a new product together with its opening entry as one atomic
    /// unit. A rejected opening movement or a failed insert leaves neither
    /// the product nor the movement behind.
    async fn insert_product_with_opening(
        &self,
        product: &Product,
        opening: &MovementRequest,
        movement_id: MovementId,
        occurred_at: DateTime<Utc>,
    ) -> Result<MovementOutcome, MovementError>;

    /// Newest first.
    async fn list_movements(
        &self,
        filter: &MovementFilter,
        pagination: Pagination,
    ) -> Result<Page<MovementRecord>, StoreError>;

    async fn count_movements(&self, product_id: ProductId) -> Result<u64, StoreError>;
}

/// Everything the inventory services need from storage.
pub trait InventoryStore: LookupStore + ProductStore + MovementStore {}

impl<T> InventoryStore for T where T: LookupStore + ProductStore + MovementStore + ?Sized {}
