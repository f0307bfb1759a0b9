use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// GET /dashboard
pub async fn dashboard(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.catalog.dashboard().await {
        Ok(d) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "active_products": d.active_products,
                "active_categories": d.active_categories,
                "low_stock_count": d.low_stock_count,
                "low_stock": d.low_stock.into_iter().map(dto::product_to_json).collect::<Vec<_>>(),
                "recent_movements": d
                    .recent_movements
                    .into_iter()
                    .map(dto::movement_record_to_json)
                    .collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
