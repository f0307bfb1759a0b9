use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use almox_infra::{ChangeLogFilter, EntityKind};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// GET /changes?entity_kind=&entity_id=&page=
///
/// Change log, newest first.
pub async fn list_changes(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::ChangesQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return dto::rejection_to_response(e),
    };

    let entity_kind = match dto::non_blank(query.entity_kind)
        .map(|k| k.trim().parse::<EntityKind>())
        .transpose()
    {
        Ok(k) => k,
        Err(msg) => return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
    };
    let entity_id = match dto::non_blank(query.entity_id)
        .map(|id| id.trim().parse::<Uuid>())
        .transpose()
    {
        Ok(id) => id,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid entity id"),
    };

    let filter = ChangeLogFilter {
        entity_kind,
        entity_id,
    };
    match services
        .changes
        .list(&filter, dto::page(query.page, dto::CHANGE_PAGE_SIZE))
        .await
    {
        Ok(page) => (StatusCode::OK, Json(dto::page_to_json(page, dto::change_to_json))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
