use axum::{routing::get, Router};

pub mod categories;
pub mod changes;
pub mod common;
pub mod dashboard;
pub mod movements;
pub mod products;
pub mod system;
pub mod units;

/// Router for all endpoints that require an acting user.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/dashboard", get(dashboard::dashboard))
        .route("/changes", get(changes::list_changes))
        .nest("/units", units::router())
        .nest("/categories", categories::router())
        .nest("/products", products::router())
        .nest("/movements", movements::router())
}
