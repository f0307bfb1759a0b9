use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use almox_core::{CategoryId, DomainError, ProductId};
use almox_infra::store::ProductFilter;
use almox_inventory::ProductDraft;

use crate::app::routes::common::parse_id;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(product_detail).put(update_product).delete(delete_product),
        )
        .route("/:id/info", get(product_info))
}

fn product_filter(query: dto::ProductQuery) -> Result<ProductFilter, axum::response::Response> {
    let category_id = match dto::non_blank(query.category) {
        Some(raw) => Some(parse_id::<CategoryId>(&raw, "category")?),
        None => None,
    };

    let mut filter = ProductFilter {
        search: dto::non_blank(query.search),
        category_id,
        ..ProductFilter::default()
    };
    match dto::non_blank(query.status).as_deref() {
        None => {}
        Some("low") => filter.low_stock_only = true,
        Some("active") => filter.active = Some(true),
        Some("inactive") => filter.active = Some(false),
        Some(other) => {
            return Err(errors::domain_error_to_response(DomainError::validation(
                format!("unknown status {other:?}; expected low, active or inactive"),
            )));
        }
    }
    Ok(filter)
}

/// GET /products?search=&category=&status=&page=
///
/// Ordered by name. `low_stock_count` counts active low-stock products
/// regardless of the filter.
pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::ProductQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return dto::rejection_to_response(e),
    };
    let pagination = dto::page(query.page, dto::PRODUCT_PAGE_SIZE);
    let filter = match product_filter(query) {
        Ok(f) => f,
        Err(res) => return res,
    };

    match services.catalog.list_products(&filter, pagination).await {
        Ok(listing) => {
            let mut body = dto::page_to_json(listing.page, dto::product_to_json);
            body["low_stock_count"] = serde_json::json!(listing.low_stock_count);
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    body: Result<Json<dto::CreateProductRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return dto::rejection_to_response(e),
    };

    match services
        .catalog
        .create_product(actor.actor_id(), body.product, body.opening_balance)
        .await
    {
        Ok(product) => (StatusCode::CREATED, Json(dto::product_to_json(product))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// GET /products/:id
///
/// The product with its unit, category and 10 most recent movements.
pub async fn product_detail(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match parse_id(&id, "product") {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.catalog.product_detail(id).await {
        Ok(detail) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "product": dto::product_to_json(detail.product),
                "unit": dto::unit_to_json(detail.unit),
                "category": detail.category.map(dto::category_to_json),
                "low_stock": detail.low_stock,
                "recent_movements": detail
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

/// GET /products/:id/info
///
/// Lookup used by the movement form. 404 for inactive products.
pub async fn product_info(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match parse_id(&id, "product") {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.catalog.product_info(id).await {
        Ok(info) => (StatusCode::OK, Json(dto::product_info_to_json(info))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    body: Result<Json<ProductDraft>, JsonRejection>,
) -> axum::response::Response {
    let id: ProductId = match parse_id(&id, "product") {
        Ok(v) => v,
        Err(res) => return res,
    };
    let Json(draft) = match body {
        Ok(b) => b,
        Err(e) => return dto::rejection_to_response(e),
    };

    match services
        .catalog
        .update_product(actor.actor_id(), id, draft)
        .await
    {
        Ok(product) => (StatusCode::OK, Json(dto::product_to_json(product))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match parse_id(&id, "product") {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.catalog.delete_product(actor.actor_id(), id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
