use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use almox_core::ProductId;
use almox_infra::store::MovementFilter;
use almox_inventory::{validate_quantity, MovementDirection, MovementRequest};

use crate::app::routes::common::parse_id;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new().route("/", get(list_movements).post(create_movement))
}

/// GET /movements?product=&direction=&from=&to=&search=&page=
///
/// Newest first. `from`/`to` are inclusive UTC calendar dates.
pub async fn list_movements(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::MovementQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return dto::rejection_to_response(e),
    };

    let product_id = match dto::non_blank(query.product) {
        Some(raw) => match parse_id::<ProductId>(&raw, "product") {
            Ok(id) => Some(id),
            Err(res) => return res,
        },
        None => None,
    };
    let direction = match dto::non_blank(query.direction)
        .map(|d| d.parse::<MovementDirection>())
        .transpose()
    {
        Ok(d) => d,
        Err(e) => return errors::ledger_error_to_response(e),
    };
    let (from, to) = match (
        dto::parse_date("from", query.from),
        dto::parse_date("to", query.to),
    ) {
        (Ok(from), Ok(to)) => (from, to),
        (Err(e), _) | (_, Err(e)) => return errors::domain_error_to_response(e),
    };

    let filter = MovementFilter {
        product_id,
        direction,
        from,
        to,
        search: dto::non_blank(query.search),
    };

    match services
        .ledger
        .list_movements(&filter, dto::page(query.page, dto::MOVEMENT_PAGE_SIZE))
        .await
    {
        Ok(page) => (
            StatusCode::OK,
            Json(dto::page_to_json(page, dto::movement_record_to_json)),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// POST /movements
///
/// Body: `{"product_id", "direction": "in"|"out", "quantity", "notes"}`.
/// Direction and quantity are checked here; the balance check happens in the
/// ledger under the product lock.
pub async fn create_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    body: Result<Json<dto::CreateMovementRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return dto::rejection_to_response(e),
    };

    let product_id: ProductId = match parse_id(&body.product_id, "product") {
        Ok(v) => v,
        Err(res) => return res,
    };
    let direction: MovementDirection = match body.direction.parse() {
        Ok(d) => d,
        Err(e) => return errors::ledger_error_to_response(e),
    };
    if let Err(e) = validate_quantity(body.quantity) {
        return errors::ledger_error_to_response(e);
    }

    let request = MovementRequest {
        product_id,
        direction,
        quantity: body.quantity,
        actor: actor.actor_id(),
        notes: body.notes.unwrap_or_default(),
    };

    match services.ledger.apply_movement(request).await {
        Ok(outcome) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "movement": dto::movement_to_json(outcome.movement),
                "product": dto::product_to_json(outcome.product),
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
