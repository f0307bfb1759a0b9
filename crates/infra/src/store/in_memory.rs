use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};

use almox_core::{CategoryId, MovementId, ProductId, UnitId};
use almox_inventory::{
    Category, LedgerError, MovementRequest, Product, StockMovement, UnitOfMeasure,
};

use super::query::{
    LookupFilter, MovementFilter, MovementRecord, Page, Pagination, ProductFilter, contains_ci,
    search_needle,
};
use super::r#trait::{
    LookupStore, MovementError, MovementOutcome, MovementStore, ProductStore, StoreError,
};

#[derive(Debug, Default)]
struct Catalog {
    units: HashMap<UnitId, UnitOfMeasure>,
    categories: HashMap<CategoryId, Category>,
    products: HashMap<ProductId, Arc<Mutex<Product>>>,
}

/// In-memory inventory store.
///
/// Intended for tests/dev. Locks are always taken in the order
/// catalog, product, movements; the movement log is never held while a
/// product lock is being acquired.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    catalog: RwLock<Catalog>,
    movements: Mutex<Vec<StockMovement>>,
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_catalog(&self) -> Result<std::sync::RwLockReadGuard<'_, Catalog>, StoreError> {
        self.catalog.read().map_err(poisoned)
    }

    fn write_catalog(&self) -> Result<std::sync::RwLockWriteGuard<'_, Catalog>, StoreError> {
        self.catalog.write().map_err(poisoned)
    }

    fn snapshot_product(cell: &Mutex<Product>) -> Result<Product, StoreError> {
        Ok(cell.lock().map_err(poisoned)?.clone())
    }

    fn check_unit_unique(catalog: &Catalog, unit: &UnitOfMeasure) -> Result<(), StoreError> {
        for other in catalog.units.values().filter(|u| u.id != unit.id) {
            if other.name == unit.name {
                return Err(StoreError::Conflict(format!(
                    "unit name '{}' already exists",
                    unit.name
                )));
            }
            if other.symbol == unit.symbol {
                return Err(StoreError::Conflict(format!(
                    "unit symbol '{}' already exists",
                    unit.symbol
                )));
            }
        }
        Ok(())
    }

    fn check_category_unique(catalog: &Catalog, category: &Category) -> Result<(), StoreError> {
        if catalog
            .categories
            .values()
            .any(|c| c.id != category.id && c.name == category.name)
        {
            return Err(StoreError::Conflict(format!(
                "category name '{}' already exists",
                category.name
            )));
        }
        Ok(())
    }

    fn check_code_unique(catalog: &Catalog, product: &Product) -> Result<(), StoreError> {
        for (id, cell) in &catalog.products {
            if *id == product.id_typed() {
                continue;
            }
            if cell.lock().map_err(poisoned)?.code() == product.code() {
                return Err(StoreError::Conflict(format!(
                    "product code '{}' already exists",
                    product.code()
                )));
            }
        }
        Ok(())
    }
}

fn lookup_matches(needle: Option<&str>, active: Option<bool>, is_active: bool, fields: &[&str]) -> bool {
    if active.is_some_and(|a| a != is_active) {
        return false;
    }
    match needle {
        Some(n) => fields.iter().any(|f| contains_ci(f, n)),
        None => true,
    }
}

#[async_trait::async_trait]
impl LookupStore for InMemoryInventoryStore {
    async fn insert_unit(&self, unit: &UnitOfMeasure) -> Result<(), StoreError> {
        let mut catalog = self.write_catalog()?;
        if catalog.units.contains_key(&unit.id) {
            return Err(StoreError::Conflict(format!("unit {} already exists", unit.id)));
        }
        Self::check_unit_unique(&catalog, unit)?;
        catalog.units.insert(unit.id, unit.clone());
        Ok(())
    }

    async fn update_unit(&self, unit: &UnitOfMeasure) -> Result<(), StoreError> {
        let mut catalog = self.write_catalog()?;
        if !catalog.units.contains_key(&unit.id) {
            return Err(StoreError::NotFound(format!("unit {}", unit.id)));
        }
        Self::check_unit_unique(&catalog, unit)?;
        catalog.units.insert(unit.id, unit.clone());
        Ok(())
    }

    async fn get_unit(&self, id: UnitId) -> Result<Option<UnitOfMeasure>, StoreError> {
        Ok(self.read_catalog()?.units.get(&id).cloned())
    }

    async fn list_units(
        &self,
        filter: &LookupFilter,
        pagination: Pagination,
    ) -> Result<Page<UnitOfMeasure>, StoreError> {
        let needle = search_needle(filter.search.as_deref());
        let catalog = self.read_catalog()?;
        let mut units: Vec<UnitOfMeasure> = catalog
            .units
            .values()
            .filter(|u| {
                lookup_matches(
                    needle.as_deref(),
                    filter.active,
                    u.active,
                    &[u.name.as_str(), u.symbol.as_str(), u.description.as_str()],
                )
            })
            .cloned()
            .collect();
        units.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Page::from_sorted(units, pagination))
    }

    async fn delete_unit(&self, id: UnitId) -> Result<(), StoreError> {
        let mut catalog = self.write_catalog()?;
        if !catalog.units.contains_key(&id) {
            return Err(StoreError::NotFound(format!("unit {id}")));
        }
        for cell in catalog.products.values() {
            if cell.lock().map_err(poisoned)?.unit_id() == id {
                return Err(StoreError::Conflict(format!(
                    "unit {id} is still used by products"
                )));
            }
        }
        catalog.units.remove(&id);
        Ok(())
    }

    async fn insert_category(&self, category: &Category) -> Result<(), StoreError> {
        let mut catalog = self.write_catalog()?;
        if catalog.categories.contains_key(&category.id) {
            return Err(StoreError::Conflict(format!(
                "category {} already exists",
                category.id
            )));
        }
        Self::check_category_unique(&catalog, category)?;
        catalog.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn update_category(&self, category: &Category) -> Result<(), StoreError> {
        let mut catalog = self.write_catalog()?;
        if !catalog.categories.contains_key(&category.id) {
            return Err(StoreError::NotFound(format!("category {}", category.id)));
        }
        Self::check_category_unique(&catalog, category)?;
        catalog.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        Ok(self.read_catalog()?.categories.get(&id).cloned())
    }

    async fn list_categories(
        &self,
        filter: &LookupFilter,
        pagination: Pagination,
    ) -> Result<Page<Category>, StoreError> {
        let needle = search_needle(filter.search.as_deref());
        let catalog = self.read_catalog()?;
        let mut categories: Vec<Category> = catalog
            .categories
            .values()
            .filter(|c| {
                lookup_matches(
                    needle.as_deref(),
                    filter.active,
                    c.active,
                    &[c.name.as_str(), c.description.as_str()],
                )
            })
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Page::from_sorted(categories, pagination))
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), StoreError> {
        let mut catalog = self.write_catalog()?;
        if catalog.categories.remove(&id).is_none() {
            return Err(StoreError::NotFound(format!("category {id}")));
        }
        let now = Utc::now();
        for cell in catalog.products.values() {
            let mut product = cell.lock().map_err(poisoned)?;
            if product.category_id() == Some(id) {
                product.clear_category(now);
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProductStore for InMemoryInventoryStore {
    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut catalog = self.write_catalog()?;
        let id = product.id_typed();
        if catalog.products.contains_key(&id) {
            return Err(StoreError::Conflict(format!("product {id} already exists")));
        }
        Self::check_code_unique(&catalog, product)?;
        catalog
            .products
            .insert(id, Arc::new(Mutex::new(product.clone())));
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> Result<(), StoreError> {
        let catalog = self.write_catalog()?;
        let id = product.id_typed();
        let cell = catalog
            .products
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("product {id}")))?;
        Self::check_code_unique(&catalog, product)?;

        let mut stored = cell.lock().map_err(poisoned)?;
        let mut record = product.to_record();
        record.quantity_current = stored.quantity_current().value();
        *stored = Product::restore(record)?;
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let catalog = self.read_catalog()?;
        match catalog.products.get(&id) {
            Some(cell) => Ok(Some(Self::snapshot_product(cell)?)),
            None => Ok(None),
        }
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
        pagination: Pagination,
    ) -> Result<Page<Product>, StoreError> {
        let needle = search_needle(filter.search.as_deref());
        let catalog = self.read_catalog()?;

        let mut products = Vec::new();
        for cell in catalog.products.values() {
            let p = Self::snapshot_product(cell)?;
            if filter.category_id.is_some() && p.category_id() != filter.category_id {
                continue;
            }
            if filter.unit_id.is_some_and(|u| u != p.unit_id()) {
                continue;
            }
            if filter.low_stock_only && !p.is_low_stock() {
                continue;
            }
            if !lookup_matches(
                needle.as_deref(),
                filter.active,
                p.is_active(),
                &[p.code(), p.name(), p.description()],
            ) {
                continue;
            }
            products.push(p);
        }
        products.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.code().cmp(b.code())));
        Ok(Page::from_sorted(products, pagination))
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        let mut catalog = self.write_catalog()?;
        if !catalog.products.contains_key(&id) {
            return Err(StoreError::NotFound(format!("product {id}")));
        }
        let has_movements = self
            .movements
            .lock()
            .map_err(poisoned)?
            .iter()
            .any(|m| m.product_id() == id);
        if has_movements {
            return Err(StoreError::Conflict(format!(
                "product {id} has stock movements; deactivate it instead"
            )));
        }
        catalog.products.remove(&id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl MovementStore for InMemoryInventoryStore {
    async fn apply_movement(
        &self,
        request: &MovementRequest,
        movement_id: MovementId,
        occurred_at: DateTime<Utc>,
    ) -> Result<MovementOutcome, MovementError> {
        let catalog = self.read_catalog()?;
        let cell = catalog
            .products
            .get(&request.product_id)
            .ok_or(LedgerError::ProductNotFound(request.product_id))?;

        // Held until the movement is appended.
        let mut product = cell.lock().map_err(poisoned)?;
        let unit_symbol = catalog
            .units
            .get(&product.unit_id())
            .map(|u| u.symbol.clone())
            .ok_or_else(|| {
                StoreError::Corrupt(format!(
                    "product {} references missing unit {}",
                    product.id_typed(),
                    product.unit_id()
                ))
            })?;

        let movement = almox_inventory::apply_movement(
            &mut product,
            &unit_symbol,
            request,
            movement_id,
            occurred_at,
        )?;

        self.movements
            .lock()
            .map_err(poisoned)?
            .push(movement.clone());

        Ok(MovementOutcome {
            product: product.clone(),
            movement,
        })
    }

    async fn insert_product_with_opening(
        &self,
        product: &Product,
        opening: &MovementRequest,
        movement_id: MovementId,
        occurred_at: DateTime<Utc>,
    ) -> Result<MovementOutcome, MovementError> {
        // The write lock keeps the product invisible until both records exist.
        let mut catalog = self.write_catalog()?;
        let id = product.id_typed();
        if catalog.products.contains_key(&id) {
            return Err(StoreError::Conflict(format!("product {id} already exists")).into());
        }
        Self::check_code_unique(&catalog, product)?;
        let unit_symbol = catalog
            .units
            .get(&product.unit_id())
            .map(|u| u.symbol.clone())
            .ok_or_else(|| StoreError::Conflict(format!("unit {} does not exist", product.unit_id())))?;

        let mut created = product.clone();
        let movement = almox_inventory::apply_movement(
            &mut created,
            &unit_symbol,
            opening,
            movement_id,
            occurred_at,
        )?;

        self.movements
            .lock()
            .map_err(poisoned)?
            .push(movement.clone());
        catalog
            .products
            .insert(id, Arc::new(Mutex::new(created.clone())));

        Ok(MovementOutcome {
            product: created,
            movement,
        })
    }

    async fn list_movements(
        &self,
        filter: &MovementFilter,
        pagination: Pagination,
    ) -> Result<Page<MovementRecord>, StoreError> {
        let needle = search_needle(filter.search.as_deref());

        // Product labels first, so the movement log is never held with a product lock.
        let catalog = self.read_catalog()?;
        let mut labels: HashMap<ProductId, (String, String, String)> = HashMap::new();
        for (id, cell) in &catalog.products {
            let p = cell.lock().map_err(poisoned)?;
            let symbol = catalog
                .units
                .get(&p.unit_id())
                .map(|u| u.symbol.clone())
                .unwrap_or_default();
            labels.insert(*id, (p.code().to_string(), p.name().to_string(), symbol));
        }

        let movements = self.movements.lock().map_err(poisoned)?;
        let mut records = Vec::new();
        for m in movements.iter() {
            if filter.product_id.is_some_and(|id| id != m.product_id()) {
                continue;
            }
            if filter.direction.is_some_and(|d| d != m.direction()) {
                continue;
            }
            let day = m.occurred_at().date_naive();
            if filter.from.is_some_and(|from| day < from) || filter.to.is_some_and(|to| day > to) {
                continue;
            }
            let (code, name, symbol) = labels.get(&m.product_id()).cloned().unwrap_or_default();
            if let Some(n) = needle.as_deref() {
                if !(contains_ci(&code, n) || contains_ci(&name, n) || contains_ci(m.notes(), n)) {
                    continue;
                }
            }
            records.push(MovementRecord {
                movement: m.clone(),
                product_code: code,
                product_name: name,
                unit_symbol: symbol,
            });
        }
        drop(movements);

        records.sort_by(|a, b| {
            b.movement
                .occurred_at()
                .cmp(&a.movement.occurred_at())
                .then_with(|| b.movement.id_typed().as_uuid().cmp(a.movement.id_typed().as_uuid()))
        });
        Ok(Page::from_sorted(records, pagination))
    }

    async fn count_movements(&self, product_id: ProductId) -> Result<u64, StoreError> {
        let movements = self.movements.lock().map_err(poisoned)?;
        Ok(movements.iter().filter(|m| m.product_id() == product_id).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use almox_core::UserId;
    use almox_inventory::{CategoryDraft, MovementDirection, ProductDraft, Quantity, UnitDraft};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    async fn seeded() -> (InMemoryInventoryStore, UnitOfMeasure, Product) {
        let store = InMemoryInventoryStore::new();
        let unit = UnitOfMeasure::create(
            UnitId::new(),
            UnitDraft {
                name: "Unidade".to_string(),
                symbol: "un".to_string(),
                description: String::new(),
                active: true,
            },
        )
        .unwrap();
        store.insert_unit(&unit).await.unwrap();

        let product = Product::create(ProductId::new(), draft("CAN-001", "Caneta azul", unit.id), Utc::now()).unwrap();
        store.insert_product(&product).await.unwrap();
        (store, unit, product)
    }

    fn draft(code: &str, name: &str, unit_id: UnitId) -> ProductDraft {
        ProductDraft {
            code: code.to_string(),
            name: name.to_string(),
            description: String::new(),
            category_id: None,
            unit_id,
            quantity_minimum: dec!(5),
            location: String::new(),
            notes: String::new(),
            active: true,
        }
    }

    fn request(product_id: ProductId, direction: MovementDirection, quantity: Decimal) -> MovementRequest {
        MovementRequest {
            product_id,
            direction,
            quantity,
            actor: UserId::new(),
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn movement_updates_balance_and_appends_record() {
        let (store, _, product) = seeded().await;
        let outcome = store
            .apply_movement(
                &request(product.id_typed(), MovementDirection::In, dec!(10)),
                MovementId::new(),
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.product.quantity_current(), Quantity::new(dec!(10)).unwrap());
        let stored = store.get_product(product.id_typed()).await.unwrap().unwrap();
        assert_eq!(stored.quantity_current(), outcome.product.quantity_current());
        assert_eq!(store.count_movements(product.id_typed()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rejected_movement_leaves_no_trace() {
        let (store, _, product) = seeded().await;
        let err = store
            .apply_movement(
                &request(product.id_typed(), MovementDirection::Out, dec!(1)),
                MovementId::new(),
                Utc::now(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MovementError::Rejected(LedgerError::InsufficientStock { .. })
        ));
        assert_eq!(store.count_movements(product.id_typed()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_product_is_rejected() {
        let (store, _, _) = seeded().await;
        let missing = ProductId::new();
        let err = store
            .apply_movement(&request(missing, MovementDirection::In, dec!(1)), MovementId::new(), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err, MovementError::Rejected(LedgerError::ProductNotFound(missing)));
    }

    #[tokio::test]
    async fn update_product_keeps_stored_balance() {
        let (store, _, product) = seeded().await;
        store
            .apply_movement(
                &request(product.id_typed(), MovementDirection::In, dec!(8)),
                MovementId::new(),
                Utc::now(),
            )
            .await
            .unwrap();

        // `product` is the stale pre-movement copy with a zero balance.
        let mut edited = product.clone();
        edited
            .update(draft("CAN-001", "Caneta azul fina", product.unit_id()), Utc::now())
            .unwrap();
        store.update_product(&edited).await.unwrap();

        let stored = store.get_product(product.id_typed()).await.unwrap().unwrap();
        assert_eq!(stored.name(), "Caneta azul fina");
        assert_eq!(stored.quantity_current(), Quantity::new(dec!(8)).unwrap());
    }

    #[tokio::test]
    async fn duplicate_product_code_conflicts() {
        let (store, unit, _) = seeded().await;
        let dup = Product::create(ProductId::new(), draft("CAN-001", "Outra", unit.id), Utc::now()).unwrap();
        assert!(matches!(
            store.insert_product(&dup).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn unit_in_use_cannot_be_deleted() {
        let (store, unit, _) = seeded().await;
        assert!(matches!(
            store.delete_unit(unit.id).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn product_with_movements_cannot_be_deleted() {
        let (store, _, product) = seeded().await;
        store
            .apply_movement(
                &request(product.id_typed(), MovementDirection::In, dec!(1)),
                MovementId::new(),
                Utc::now(),
            )
            .await
            .unwrap();
        assert!(matches!(
            store.delete_product(product.id_typed()).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn deleting_category_clears_product_reference() {
        let (store, unit, _) = seeded().await;
        let category = Category::create(
            CategoryId::new(),
            CategoryDraft {
                name: "Escritório".to_string(),
                description: String::new(),
                active: true,
            },
        )
        .unwrap();
        store.insert_category(&category).await.unwrap();

        let product = Product::create(
            ProductId::new(),
            ProductDraft {
                category_id: Some(category.id),
                ..draft("GRA-001", "Grampeador", unit.id)
            },
            Utc::now(),
        )
        .unwrap();
        store.insert_product(&product).await.unwrap();

        store.delete_category(category.id).await.unwrap();
        let stored = store.get_product(product.id_typed()).await.unwrap().unwrap();
        assert_eq!(stored.category_id(), None);
    }

    #[tokio::test]
    async fn movement_list_is_newest_first_and_searchable() {
        let (store, _, product) = seeded().await;
        let t0 = Utc::now();
        for (i, notes) in ["nota fiscal 1", "requisição 7"].iter().enumerate() {
            store
                .apply_movement(
                    &MovementRequest {
                        notes: notes.to_string(),
                        ..request(product.id_typed(), MovementDirection::In, dec!(1))
                    },
                    MovementId::new(),
                    t0 + chrono::Duration::seconds(i as i64),
                )
                .await
                .unwrap();
        }

        let all = store
            .list_movements(&MovementFilter::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.items[0].movement.notes(), "requisição 7");
        assert_eq!(all.items[0].product_code, "CAN-001");
        assert_eq!(all.items[0].unit_symbol, "un");

        let found = store
            .list_movements(
                &MovementFilter {
                    search: Some("FISCAL".to_string()),
                    ..MovementFilter::default()
                },
                Pagination::default(),
            )
            .await
            .unwrap();
        assert_eq!(found.total, 1);
    }

    #[tokio::test]
    async fn low_stock_filter_uses_minimum() {
        let (store, unit, product) = seeded().await;
        let stocked = Product::create(ProductId::new(), draft("LAP-001", "Lápis", unit.id), Utc::now()).unwrap();
        store.insert_product(&stocked).await.unwrap();
        store
            .apply_movement(
                &request(stocked.id_typed(), MovementDirection::In, dec!(50)),
                MovementId::new(),
                Utc::now(),
            )
            .await
            .unwrap();

        let low = store
            .list_products(
                &ProductFilter {
                    low_stock_only: true,
                    ..ProductFilter::default()
                },
                Pagination::default(),
            )
            .await
            .unwrap();
        assert_eq!(low.total, 1);
        assert_eq!(low.items[0].id_typed(), product.id_typed());
    }

    #[tokio::test]
    async fn product_with_opening_entry_is_stored_together() {
        let (store, unit, _) = seeded().await;
        let product = Product::create(ProductId::new(), draft("BOR-001", "Borracha", unit.id), Utc::now()).unwrap();
        let outcome = store
            .insert_product_with_opening(
                &product,
                &request(product.id_typed(), MovementDirection::In, dec!(12)),
                MovementId::new(),
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.movement.quantity_after(), Quantity::new(dec!(12)).unwrap());
        let stored = store.get_product(product.id_typed()).await.unwrap().unwrap();
        assert_eq!(stored.quantity_current(), Quantity::new(dec!(12)).unwrap());
        assert_eq!(store.count_movements(product.id_typed()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rejected_opening_entry_stores_nothing() {
        let (store, unit, _) = seeded().await;
        let mut inactive = draft("BOR-001", "Borracha", unit.id);
        inactive.active = false;
        let product = Product::create(ProductId::new(), inactive, Utc::now()).unwrap();

        let err = store
            .insert_product_with_opening(
                &product,
                &request(product.id_typed(), MovementDirection::In, dec!(3)),
                MovementId::new(),
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MovementError::Rejected(LedgerError::ProductInactive(_))
        ));
        assert_eq!(store.get_product(product.id_typed()).await.unwrap(), None);
        assert_eq!(store.count_movements(product.id_typed()).await.unwrap(), 0);

        // Duplicate code fails before any entry is written.
        let dup = Product::create(ProductId::new(), draft("CAN-001", "Outra", unit.id), Utc::now()).unwrap();
        let err = store
            .insert_product_with_opening(
                &dup,
                &request(dup.id_typed(), MovementDirection::In, dec!(3)),
                MovementId::new(),
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MovementError::Store(StoreError::Conflict(_))));
        assert_eq!(store.count_movements(dup.id_typed()).await.unwrap(), 0);
    }
}
