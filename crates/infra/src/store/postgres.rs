//! Postgres-backed inventory store.
//!
//! The schema lives in `migrations/0001_inventory.sql` and is applied by
//! [`PostgresInventoryStore::ensure_schema`].
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Duplicate code, name or symbol |
//! | Database (foreign key violation) | `23503` | `Conflict` | Deleting a unit or product that is still referenced |
//! | Database (other) | Any other | `Backend` | Check constraints, trigger rejections, etc. |
//! | PoolClosed | N/A | `Backend` | Connection pool was closed |
//! | Other | N/A | `Backend` | Network errors, connection failures, etc. |
//!
//! ## Locking
//!
//! [`MovementStore::apply_movement`] reads the product with
//! `SELECT ... FOR UPDATE OF p` inside a transaction, so two movements on the
//! same product serialize on the row lock while movements on different
//! products proceed in parallel.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgConnection, PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use almox_core::{CategoryId, MovementId, ProductId, UnitId, UserId};
use almox_inventory::{
    Category, LedgerError, MovementDirection, MovementRequest, Product, ProductRecord,
    StockMovement, UnitOfMeasure,
};

use super::query::{
    LookupFilter, MovementFilter, MovementRecord, Page, Pagination, ProductFilter,
};
use super::r#trait::{
    LookupStore, MovementError, MovementOutcome, MovementStore, ProductStore, StoreError,
};

const SCHEMA: &str = include_str!("../../migrations/0001_inventory.sql");

const PRODUCT_COLUMNS: &str = r#"
    p.id, p.code, p.name, p.description, p.category_id, p.unit_id,
    p.quantity_current, p.quantity_minimum, p.location, p.notes, p.active,
    p.created_at, p.updated_at
"#;

const MOVEMENT_COLUMNS: &str = r#"
    m.id, m.product_id, m.direction, m.quantity, m.quantity_before, m.quantity_after,
    m.actor_id, m.occurred_at, m.notes,
    p.code AS product_code, p.name AS product_name, u.symbol AS unit_symbol
"#;

/// Postgres-backed inventory store.
///
/// Uses a SQLx connection pool, so the store is cheap to clone and safe to
/// share across tasks.
#[derive(Debug, Clone)]
pub struct PostgresInventoryStore {
    pool: Arc<PgPool>,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect a pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables, indexes and the append-only trigger if they are missing.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl LookupStore for PostgresInventoryStore {
    #[instrument(skip(self, unit), fields(unit_id = %unit.id), err)]
    async fn insert_unit(&self, unit: &UnitOfMeasure) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO units_of_measure (id, name, symbol, description, active)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(unit.id.as_uuid())
        .bind(&unit.name)
        .bind(&unit.symbol)
        .bind(&unit.description)
        .bind(unit.active)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_unit", e))?;
        Ok(())
    }

    #[instrument(skip(self, unit), fields(unit_id = %unit.id), err)]
    async fn update_unit(&self, unit: &UnitOfMeasure) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE units_of_measure
            SET name = $2, symbol = $3, description = $4, active = $5
            WHERE id = $1
            "#,
        )
        .bind(unit.id.as_uuid())
        .bind(&unit.name)
        .bind(&unit.symbol)
        .bind(&unit.description)
        .bind(unit.active)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_unit", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("unit {}", unit.id)));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(unit_id = %id), err)]
    async fn get_unit(&self, id: UnitId) -> Result<Option<UnitOfMeasure>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, symbol, description, active FROM units_of_measure WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_unit", e))?;

        row.map(|r| unit_from_row(&r)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_units(
        &self,
        filter: &LookupFilter,
        pagination: Pagination,
    ) -> Result<Page<UnitOfMeasure>, StoreError> {
        let pattern = like_pattern(filter.search.as_deref());
        const WHERE: &str = r#"
            WHERE ($1::text IS NULL
                   OR name ILIKE $1 ESCAPE '\'
                   OR symbol ILIKE $1 ESCAPE '\'
                   OR description ILIKE $1 ESCAPE '\')
              AND ($2::boolean IS NULL OR active = $2)
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM units_of_measure {WHERE}"))
            .bind(&pattern)
            .bind(filter.active)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_units", e))?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT id, name, symbol, description, active
            FROM units_of_measure
            {WHERE}
            ORDER BY name ASC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(&pattern)
        .bind(filter.active)
        .bind(pagination.limit as i64)
        .bind(pagination.offset as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_units", e))?;

        let items = rows.iter().map(unit_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, total as u64, pagination))
    }

    #[instrument(skip(self), fields(unit_id = %id), err)]
    async fn delete_unit(&self, id: UnitId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM units_of_measure WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_unit", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("unit {id}")));
        }
        Ok(())
    }

    #[instrument(skip(self, category), fields(category_id = %category.id), err)]
    async fn insert_category(&self, category: &Category) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO categories (id, name, description, active) VALUES ($1, $2, $3, $4)",
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.active)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_category", e))?;
        Ok(())
    }

    #[instrument(skip(self, category), fields(category_id = %category.id), err)]
    async fn update_category(&self, category: &Category) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE categories SET name = $2, description = $3, active = $4 WHERE id = $1",
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.active)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_category", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("category {}", category.id)));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        let row = sqlx::query("SELECT id, name, description, active FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_category", e))?;

        row.map(|r| category_from_row(&r)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_categories(
        &self,
        filter: &LookupFilter,
        pagination: Pagination,
    ) -> Result<Page<Category>, StoreError> {
        let pattern = like_pattern(filter.search.as_deref());
        const WHERE: &str = r#"
            WHERE ($1::text IS NULL
                   OR name ILIKE $1 ESCAPE '\'
                   OR description ILIKE $1 ESCAPE '\')
              AND ($2::boolean IS NULL OR active = $2)
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM categories {WHERE}"))
            .bind(&pattern)
            .bind(filter.active)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_categories", e))?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT id, name, description, active
            FROM categories
            {WHERE}
            ORDER BY name ASC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(&pattern)
        .bind(filter.active)
        .bind(pagination.limit as i64)
        .bind(pagination.offset as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_categories", e))?;

        let items = rows
            .iter()
            .map(category_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, total as u64, pagination))
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    async fn delete_category(&self, id: CategoryId) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query(
            "UPDATE products SET category_id = NULL, updated_at = NOW() WHERE category_id = $1",
        )
        .bind(id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("clear_product_category", e))?;

        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;

        if result.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::NotFound(format!("category {id}")));
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProductStore for PostgresInventoryStore {
    #[instrument(skip(self, product), fields(product_id = %product.id_typed()), err)]
    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        insert_product_row(&mut conn, product)
            .await
            .map_err(|e| map_sqlx_error("insert_product", e))
    }

    #[instrument(skip(self, product), fields(product_id = %product.id_typed()), err)]
    async fn update_product(&self, product: &Product) -> Result<(), StoreError> {
        let r = product.to_record();
        // quantity_current is left to the ledger.
        let result = sqlx::query(
            r#"
            UPDATE products
            SET code = $2, name = $3, description = $4, category_id = $5, unit_id = $6,
                quantity_minimum = $7, location = $8, notes = $9, active = $10,
                updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(r.id.as_uuid())
        .bind(&r.code)
        .bind(&r.name)
        .bind(&r.description)
        .bind(r.category_id.map(Uuid::from))
        .bind(r.unit_id.as_uuid())
        .bind(r.quantity_minimum)
        .bind(&r.location)
        .bind(&r.notes)
        .bind(r.active)
        .bind(r.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("product {}", r.id)));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;

        row.map(|r| product_from_row(&r)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_products(
        &self,
        filter: &ProductFilter,
        pagination: Pagination,
    ) -> Result<Page<Product>, StoreError> {
        let pattern = like_pattern(filter.search.as_deref());
        let category = filter.category_id.map(Uuid::from);
        let unit = filter.unit_id.map(Uuid::from);
        const WHERE: &str = r#"
            WHERE ($1::text IS NULL
                   OR p.code ILIKE $1 ESCAPE '\'
                   OR p.name ILIKE $1 ESCAPE '\'
                   OR p.description ILIKE $1 ESCAPE '\')
              AND ($2::uuid IS NULL OR p.category_id = $2)
              AND ($3::uuid IS NULL OR p.unit_id = $3)
              AND ($4::boolean IS NULL OR p.active = $4)
              AND ($5 = FALSE OR p.quantity_current <= p.quantity_minimum)
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM products p {WHERE}"))
            .bind(&pattern)
            .bind(category)
            .bind(unit)
            .bind(filter.active)
            .bind(filter.low_stock_only)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_products", e))?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products p
            {WHERE}
            ORDER BY p.name ASC, p.code ASC
            LIMIT $6 OFFSET $7
            "#
        ))
        .bind(&pattern)
        .bind(category)
        .bind(unit)
        .bind(filter.active)
        .bind(filter.low_stock_only)
        .bind(pagination.limit as i64)
        .bind(pagination.offset as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        let items = rows
            .iter()
            .map(product_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, total as u64, pagination))
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        if self.count_movements(id).await? > 0 {
            return Err(StoreError::Conflict(format!(
                "product {id} has stock movements; deactivate it instead"
            )));
        }

        // A movement racing the check above trips the RESTRICT foreign key.
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("product {id}")));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl MovementStore for PostgresInventoryStore {
    #[instrument(
        skip(self, request),
        fields(
            product_id = %request.product_id,
            direction = %request.direction,
            movement_id = %movement_id
        ),
        err
    )]
    async fn apply_movement(
        &self,
        request: &MovementRequest,
        movement_id: MovementId,
        occurred_at: DateTime<Utc>,
    ) -> Result<MovementOutcome, MovementError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}, u.symbol AS unit_symbol
            FROM products p
            JOIN units_of_measure u ON u.id = p.unit_id
            WHERE p.id = $1
            FOR UPDATE OF p
            "#
        ))
        .bind(request.product_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_product", e))?;

        let Some(row) = row else {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(LedgerError::ProductNotFound(request.product_id).into());
        };

        let mut product = product_from_row(&row)?;
        let unit_symbol: String = row
            .try_get("unit_symbol")
            .map_err(|e| StoreError::Corrupt(format!("failed to read unit_symbol: {e}")))?;

        let movement = match almox_inventory::apply_movement(
            &mut product,
            &unit_symbol,
            request,
            movement_id,
            occurred_at,
        ) {
            Ok(movement) => movement,
            Err(rejection) => {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(rejection.into());
            }
        };

        sqlx::query("UPDATE products SET quantity_current = $2, updated_at = $3 WHERE id = $1")
            .bind(product.id_typed().as_uuid())
            .bind(product.quantity_current().value())
            .bind(product.updated_at())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_balance", e))?;

        insert_movement_row(&mut tx, &movement)
            .await
            .map_err(|e| map_sqlx_error("insert_movement", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(MovementOutcome { product, movement })
    }

    #[instrument(
        skip(self, product, opening),
        fields(product_id = %product.id_typed(), movement_id = %movement_id),
        err
    )]
    async fn insert_product_with_opening(
        &self,
        product: &Product,
        opening: &MovementRequest,
        movement_id: MovementId,
        occurred_at: DateTime<Utc>,
    ) -> Result<MovementOutcome, MovementError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let unit_symbol: Option<String> =
            sqlx::query_scalar("SELECT symbol FROM units_of_measure WHERE id = $1")
                .bind(product.unit_id().as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("get_unit_symbol", e))?;
        let Some(unit_symbol) = unit_symbol else {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(
                StoreError::Conflict(format!("unit {} does not exist", product.unit_id())).into(),
            );
        };

        let mut created = product.clone();
        let movement = match almox_inventory::apply_movement(
            &mut created,
            &unit_symbol,
            opening,
            movement_id,
            occurred_at,
        ) {
            Ok(movement) => movement,
            Err(rejection) => {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(rejection.into());
            }
        };

        insert_product_row(&mut tx, &created)
            .await
            .map_err(|e| map_sqlx_error("insert_product", e))?;
        insert_movement_row(&mut tx, &movement)
            .await
            .map_err(|e| map_sqlx_error("insert_movement", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(MovementOutcome {
            product: created,
            movement,
        })
    }

    #[instrument(skip(self), err)]
    async fn list_movements(
        &self,
        filter: &MovementFilter,
        pagination: Pagination,
    ) -> Result<Page<MovementRecord>, StoreError> {
        let pattern = like_pattern(filter.search.as_deref());
        let product = filter.product_id.map(Uuid::from);
        let direction = filter.direction.map(|d| d.as_str());
        const FROM_WHERE: &str = r#"
            FROM stock_movements m
            JOIN products p ON p.id = m.product_id
            JOIN units_of_measure u ON u.id = p.unit_id
            WHERE ($1::uuid IS NULL OR m.product_id = $1)
              AND ($2::text IS NULL OR m.direction = $2)
              AND ($3::date IS NULL OR (m.occurred_at AT TIME ZONE 'UTC')::date >= $3)
              AND ($4::date IS NULL OR (m.occurred_at AT TIME ZONE 'UTC')::date <= $4)
              AND ($5::text IS NULL
                   OR p.code ILIKE $5 ESCAPE '\'
                   OR p.name ILIKE $5 ESCAPE '\'
                   OR m.notes ILIKE $5 ESCAPE '\')
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {FROM_WHERE}"))
            .bind(product)
            .bind(direction)
            .bind(filter.from)
            .bind(filter.to)
            .bind(&pattern)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_movements", e))?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            {FROM_WHERE}
            ORDER BY m.occurred_at DESC, m.id DESC
            LIMIT $6 OFFSET $7
            "#
        ))
        .bind(product)
        .bind(direction)
        .bind(filter.from)
        .bind(filter.to)
        .bind(&pattern)
        .bind(pagination.limit as i64)
        .bind(pagination.offset as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_movements", e))?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            let movement_row = MovementRow::from_row(row)
                .map_err(|e| StoreError::Corrupt(format!("failed to decode movement row: {e}")))?;
            items.push(movement_row.into_record()?);
        }
        Ok(Page::new(items, total as u64, pagination))
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn count_movements(&self, product_id: ProductId) -> Result<u64, StoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stock_movements WHERE product_id = $1")
                .bind(product_id.as_uuid())
                .fetch_one(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("count_movements", e))?;
        Ok(count as u64)
    }
}

/// `%needle%` with LIKE metacharacters escaped, or `None` for a blank search.
async fn insert_product_row(
    conn: &mut PgConnection,
    product: &Product,
) -> Result<(), sqlx::Error> {
    let r = product.to_record();
    sqlx::query(
        r#"
        INSERT INTO products (
            id, code, name, description, category_id, unit_id,
            quantity_current, quantity_minimum, location, notes, active,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(r.id.as_uuid())
    .bind(&r.code)
    .bind(&r.name)
    .bind(&r.description)
    .bind(r.category_id.map(Uuid::from))
    .bind(r.unit_id.as_uuid())
    .bind(r.quantity_current)
    .bind(r.quantity_minimum)
    .bind(&r.location)
    .bind(&r.notes)
    .bind(r.active)
    .bind(r.created_at)
    .bind(r.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_movement_row(
    conn: &mut PgConnection,
    movement: &StockMovement,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, product_id, direction, quantity, quantity_before, quantity_after,
            actor_id, occurred_at, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(movement.id_typed().as_uuid())
    .bind(movement.product_id().as_uuid())
    .bind(movement.direction().as_str())
    .bind(movement.quantity().value())
    .bind(movement.quantity_before().value())
    .bind(movement.quantity_after().value())
    .bind(movement.actor().as_uuid())
    .bind(movement.occurred_at())
    .bind(movement.notes())
    .execute(conn)
    .await?;
    Ok(())
}

fn like_pattern(search: Option<&str>) -> Option<String> {
    let needle = search.map(str::trim).filter(|s| !s.is_empty())?;
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    Some(escaped)
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23503") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

fn decode_err(what: &str) -> impl Fn(sqlx::Error) -> StoreError + '_ {
    move |e| StoreError::Corrupt(format!("failed to decode {what} row: {e}"))
}

fn unit_from_row(row: &PgRow) -> Result<UnitOfMeasure, StoreError> {
    let d = decode_err("unit");
    Ok(UnitOfMeasure {
        id: UnitId::from_uuid(row.try_get("id").map_err(&d)?),
        name: row.try_get("name").map_err(&d)?,
        symbol: row.try_get("symbol").map_err(&d)?,
        description: row.try_get("description").map_err(&d)?,
        active: row.try_get("active").map_err(&d)?,
    })
}

fn category_from_row(row: &PgRow) -> Result<Category, StoreError> {
    let d = decode_err("category");
    Ok(Category {
        id: CategoryId::from_uuid(row.try_get("id").map_err(&d)?),
        name: row.try_get("name").map_err(&d)?,
        description: row.try_get("description").map_err(&d)?,
        active: row.try_get("active").map_err(&d)?,
    })
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let d = decode_err("product");
    let category_id: Option<Uuid> = row.try_get("category_id").map_err(&d)?;
    let record = ProductRecord {
        id: ProductId::from_uuid(row.try_get("id").map_err(&d)?),
        code: row.try_get("code").map_err(&d)?,
        name: row.try_get("name").map_err(&d)?,
        description: row.try_get("description").map_err(&d)?,
        category_id: category_id.map(CategoryId::from_uuid),
        unit_id: UnitId::from_uuid(row.try_get("unit_id").map_err(&d)?),
        quantity_current: row.try_get("quantity_current").map_err(&d)?,
        quantity_minimum: row.try_get("quantity_minimum").map_err(&d)?,
        location: row.try_get("location").map_err(&d)?,
        notes: row.try_get("notes").map_err(&d)?,
        active: row.try_get("active").map_err(&d)?,
        created_at: row.try_get("created_at").map_err(&d)?,
        updated_at: row.try_get("updated_at").map_err(&d)?,
    };
    Ok(Product::restore(record)?)
}

// SQLx row types

#[derive(Debug)]
struct MovementRow {
    id: Uuid,
    product_id: Uuid,
    direction: String,
    quantity: Decimal,
    quantity_before: Decimal,
    quantity_after: Decimal,
    actor_id: Uuid,
    occurred_at: DateTime<Utc>,
    notes: String,
    product_code: String,
    product_name: String,
    unit_symbol: String,
}

impl<'r> FromRow<'r, PgRow> for MovementRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(MovementRow {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            direction: row.try_get("direction")?,
            quantity: row.try_get("quantity")?,
            quantity_before: row.try_get("quantity_before")?,
            quantity_after: row.try_get("quantity_after")?,
            actor_id: row.try_get("actor_id")?,
            occurred_at: row.try_get("occurred_at")?,
            notes: row.try_get("notes")?,
            product_code: row.try_get("product_code")?,
            product_name: row.try_get("product_name")?,
            unit_symbol: row.try_get("unit_symbol")?,
        })
    }
}

impl MovementRow {
    fn into_record(self) -> Result<MovementRecord, StoreError> {
        let direction: MovementDirection = self
            .direction
            .parse()
            .map_err(|e: LedgerError| StoreError::Corrupt(e.to_string()))?;
        let movement = StockMovement::restore(
            MovementId::from_uuid(self.id),
            ProductId::from_uuid(self.product_id),
            direction,
            self.quantity,
            self.quantity_before,
            self.quantity_after,
            UserId::from_uuid(self.actor_id),
            self.occurred_at,
            self.notes,
        )?;
        Ok(MovementRecord {
            movement,
            product_code: self.product_code,
            product_name: self.product_name,
            unit_symbol: self.unit_symbol,
        })
    }
}
