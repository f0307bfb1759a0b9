use axum::http::StatusCode;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use almox_core::DomainError;
use almox_infra::store::{MovementRecord, Page, Pagination};
use almox_infra::{ChangeLogEntry, ProductInfo};
use almox_inventory::{Category, Product, ProductDraft, StockMovement, UnitOfMeasure};

use crate::app::errors;

pub const LOOKUP_PAGE_SIZE: u32 = 10;
pub const PRODUCT_PAGE_SIZE: u32 = 15;
pub const MOVEMENT_PAGE_SIZE: u32 = 20;
pub const CHANGE_PAGE_SIZE: u32 = 50;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    #[serde(flatten)]
    pub product: ProductDraft,
    /// Booked as an entry movement when positive.
    pub opening_balance: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMovementRequest {
    pub product_id: String,
    pub direction: String,
    pub quantity: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
}

// -------------------------
// Query parameters
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct LookupQuery {
    pub search: Option<String>,
    pub active: Option<bool>,
    pub page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    /// `low`, `active` or `inactive`.
    pub status: Option<String>,
    pub page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MovementQuery {
    pub product: Option<String>,
    pub direction: Option<String>,
    /// `YYYY-MM-DD`, inclusive.
    pub from: Option<String>,
    /// `YYYY-MM-DD`, inclusive.
    pub to: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangesQuery {
    pub entity_kind: Option<String>,
    pub entity_id: Option<String>,
    pub page: Option<u32>,
}

/// Treat `?field=` the same as an absent field.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn parse_date(field: &str, value: Option<String>) -> Result<Option<NaiveDate>, DomainError> {
    non_blank(value)
        .map(|v| {
            NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").map_err(|_| {
                DomainError::validation(format!("{field} must be a date formatted as YYYY-MM-DD"))
            })
        })
        .transpose()
}

pub fn page(page: Option<u32>, per_page: u32) -> Pagination {
    Pagination::page(page, per_page)
}

/// Body or query string that failed to deserialize.
pub fn rejection_to_response(rejection: impl std::fmt::Display) -> axum::response::Response {
    errors::json_error(StatusCode::BAD_REQUEST, "invalid_request", rejection.to_string())
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn page_to_json<T>(page: Page<T>, f: impl FnMut(T) -> serde_json::Value) -> serde_json::Value {
    let page = page.map(f);
    serde_json::json!({
        "items": page.items,
        "total": page.total,
        "pagination": {
            "limit": page.pagination.limit,
            "offset": page.pagination.offset,
        },
        "has_more": page.has_more,
    })
}

pub fn unit_to_json(unit: UnitOfMeasure) -> serde_json::Value {
    serde_json::json!({
        "id": unit.id.to_string(),
        "name": unit.name,
        "symbol": unit.symbol,
        "description": unit.description,
        "active": unit.active,
    })
}

pub fn category_to_json(category: Category) -> serde_json::Value {
    serde_json::json!({
        "id": category.id.to_string(),
        "name": category.name,
        "description": category.description,
        "active": category.active,
    })
}

pub fn product_to_json(product: Product) -> serde_json::Value {
    serde_json::json!({
        "id": product.id_typed().to_string(),
        "code": product.code(),
        "name": product.name(),
        "description": product.description(),
        "category_id": product.category_id().map(|id| id.to_string()),
        "unit_id": product.unit_id().to_string(),
        "quantity_current": product.quantity_current().to_string(),
        "quantity_minimum": product.quantity_minimum().to_string(),
        "location": product.location(),
        "notes": product.notes(),
        "active": product.is_active(),
        "low_stock": product.is_low_stock(),
        "created_at": product.created_at().to_rfc3339(),
        "updated_at": product.updated_at().to_rfc3339(),
    })
}

pub fn product_info_to_json(info: ProductInfo) -> serde_json::Value {
    serde_json::json!({
        "id": info.id.to_string(),
        "code": info.code,
        "name": info.name,
        "quantity_current": info.quantity_current.to_string(),
        "unit_symbol": info.unit_symbol,
        "unit_name": info.unit_name,
        "low_stock": info.low_stock,
    })
}

pub fn movement_to_json(m: StockMovement) -> serde_json::Value {
    serde_json::json!({
        "id": m.id_typed().to_string(),
        "product_id": m.product_id().to_string(),
        "direction": m.direction().as_str(),
        "quantity": m.quantity().to_string(),
        "quantity_before": m.quantity_before().to_string(),
        "quantity_after": m.quantity_after().to_string(),
        "actor": m.actor().to_string(),
        "occurred_at": m.occurred_at().to_rfc3339(),
        "notes": m.notes(),
    })
}

pub fn movement_record_to_json(record: MovementRecord) -> serde_json::Value {
    let mut json = movement_to_json(record.movement);
    json["product_code"] = serde_json::json!(record.product_code);
    json["product_name"] = serde_json::json!(record.product_name);
    json["unit_symbol"] = serde_json::json!(record.unit_symbol);
    json
}

pub fn change_to_json(entry: ChangeLogEntry) -> serde_json::Value {
    serde_json::json!({
        "id": entry.id.to_string(),
        "entity_kind": entry.entity_kind.as_str(),
        "entity_id": entry.entity_id.to_string(),
        "action": entry.action.as_str(),
        "actor": entry.actor.to_string(),
        "recorded_at": entry.recorded_at.to_rfc3339(),
        "snapshot": entry.snapshot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_query_values_are_ignored() {
        assert_eq!(non_blank(Some("  ".to_string())), None);
        assert_eq!(parse_date("from", Some(String::new())), Ok(None));
        assert_eq!(
            parse_date("from", Some("2024-03-02".to_string())),
            Ok(NaiveDate::from_ymd_opt(2024, 3, 2))
        );
        assert!(parse_date("to", Some("02/03/2024".to_string())).is_err());
    }

    #[test]
    fn movement_quantity_accepts_strings_and_numbers() {
        let body: CreateMovementRequest = serde_json::from_str(
            r#"{"product_id":"x","direction":"in","quantity":"2.50"}"#,
        )
        .unwrap();
        assert_eq!(body.quantity, Decimal::new(250, 2));

        let body: CreateMovementRequest =
            serde_json::from_str(r#"{"product_id":"x","direction":"out","quantity":3}"#).unwrap();
        assert_eq!(body.quantity, Decimal::from(3));
        assert_eq!(body.notes, None);
    }

    #[test]
    fn page_json_keeps_paging_metadata() {
        let page = Page::from_sorted(vec!["a", "b", "c"], Pagination::page(Some(1), 2));
        let json = page_to_json(page, |s| serde_json::json!(s.to_uppercase()));
        assert_eq!(json["items"], serde_json::json!(["A", "B"]));
        assert_eq!(json["total"], 3);
        assert_eq!(json["pagination"]["limit"], 2);
        assert_eq!(json["pagination"]["offset"], 0);
        assert_eq!(json["has_more"], true);
    }
}
