use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use almox_core::UnitId;
use almox_infra::store::LookupFilter;
use almox_inventory::UnitDraft;

use crate::app::routes::common::parse_id;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_units).post(create_unit))
        .route("/:id", get(get_unit).put(update_unit).delete(delete_unit))
}

/// GET /units?search=&active=&page=
pub async fn list_units(
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
        .list_units(&filter, dto::page(query.page, dto::LOOKUP_PAGE_SIZE))
        .await
    {
        Ok(page) => (StatusCode::OK, Json(dto::page_to_json(page, dto::unit_to_json))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_unit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    body: Result<Json<UnitDraft>, JsonRejection>,
) -> axum::response::Response {
    let Json(draft) = match body {
        Ok(b) => b,
        Err(e) => return dto::rejection_to_response(e),
    };

    match services.catalog.create_unit(actor.actor_id(), draft).await {
        Ok(unit) => (StatusCode::CREATED, Json(dto::unit_to_json(unit))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_unit(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: UnitId = match parse_id(&id, "unit") {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.catalog.get_unit(id).await {
        Ok(unit) => (StatusCode::OK, Json(dto::unit_to_json(unit))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_unit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    body: Result<Json<UnitDraft>, JsonRejection>,
) -> axum::response::Response {
    let id: UnitId = match parse_id(&id, "unit") {
        Ok(v) => v,
        Err(res) => return res,
    };
    let Json(draft) = match body {
        Ok(b) => b,
        Err(e) => return dto::rejection_to_response(e),
    };

    match services.catalog.update_unit(actor.actor_id(), id, draft).await {
        Ok(unit) => (StatusCode::OK, Json(dto::unit_to_json(unit))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// DELETE /units/:id
///
/// Rejected with 409 while any product still uses the unit.
pub async fn delete_unit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: UnitId = match parse_id(&id, "unit") {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.catalog.delete_unit(actor.actor_id(), id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
