//! Warehouse inventory domain module.
//!
//! This crate contains business rules for the stock ledger, implemented purely
//! as deterministic domain logic (no IO, no HTTP, no storage). Persistence
//! adapters call [`ledger::apply_movement`] while holding whatever exclusive
//! lock their backend offers on the product.

pub mod category;
pub mod ledger;
pub mod low_stock;
pub mod movement;
pub mod product;
pub mod quantity;
pub mod unit;

pub use category::{Category, CategoryDraft};
pub use ledger::{apply_movement, plan_movement, validate_quantity, LedgerError, MovementPlan};
pub use low_stock::is_low_stock;
pub use movement::{MovementDirection, MovementRequest, StockMovement};
pub use product::{Product, ProductDraft, ProductRecord};
pub use quantity::Quantity;
pub use unit::{UnitDraft, UnitOfMeasure};
