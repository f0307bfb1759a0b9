use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use almox_core::CategoryId;
use almox_infra::store::LookupFilter;
use almox_inventory::CategoryDraft;

use crate::app::routes::common::parse_id;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/:id", get(get_category).put(update_category).delete(delete_category))
}

pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::LookupQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return dto::rejection_to_response(e),
    };
    let filter = LookupFilter {
        search: dto::non_blank(query.search),
        active: query.active,
    };

    match services
        .catalog
        .list_categories(&filter, dto::page(query.page, dto::LOOKUP_PAGE_SIZE))
        .await
    {
        Ok(page) => (StatusCode::OK, Json(dto::page_to_json(page, dto::category_to_json))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    body: Result<Json<CategoryDraft>, JsonRejection>,
) -> axum::response::Response {
    let Json(draft) = match body {
        Ok(b) => b,
        Err(e) => return dto::rejection_to_response(e),
    };

    match services.catalog.create_category(actor.actor_id(), draft).await {
        Ok(category) => (StatusCode::CREATED, Json(dto::category_to_json(category))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CategoryId = match parse_id(&id, "category") {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.catalog.get_category(id).await {
        Ok(category) => (StatusCode::OK, Json(dto::category_to_json(category))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    body: Result<Json<CategoryDraft>, JsonRejection>,
) -> axum::response::Response {
    let id: CategoryId = match parse_id(&id, "category") {
        Ok(v) => v,
        Err(res) => return res,
    };
    let Json(draft) = match body {
        Ok(b) => b,
        Err(e) => return dto::rejection_to_response(e),
    };

    match services.catalog.update_category(actor.actor_id(), id, draft).await {
        Ok(category) => (StatusCode::OK, Json(dto::category_to_json(category))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// DELETE /categories/:id
///
/// Products in the category keep existing without one.
pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CategoryId = match parse_id(&id, "category") {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.catalog.delete_category(actor.actor_id(), id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
