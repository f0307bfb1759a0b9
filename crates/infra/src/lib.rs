//! Infrastructure layer: persistence, change log, and the inventory services.

pub mod catalog;
pub mod change_log;
pub mod error;
pub mod ledger;
pub mod store;

pub use catalog::{Catalog, Dashboard, ProductDetail, ProductInfo, ProductListing};
pub use change_log::{
    ChangeAction, ChangeLog, ChangeLogEntry, ChangeLogFilter, EntityKind, InMemoryChangeLog,
    PostgresChangeLog,
};
pub use error::{ServiceError, ServiceResult};
pub use ledger::StockLedger;
