//! Inventory persistence boundary.
//!
//! Services depend on [`InventoryStore`]; the in-memory store backs dev and
//! tests, the Postgres store backs production.

pub mod in_memory;
pub mod postgres;
pub mod query;
pub mod r#trait;

pub use in_memory::InMemoryInventoryStore;
pub use postgres::PostgresInventoryStore;
pub use query::{
    LookupFilter, MovementFilter, MovementRecord, Page, Pagination, ProductFilter,
};
pub use r#trait::{
    InventoryStore, LookupStore, MovementError, MovementOutcome, MovementStore, ProductStore,
    StoreError,
};
