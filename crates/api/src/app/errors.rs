use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use almox_core::DomainError;
use almox_infra::ServiceError;
use almox_infra::store::StoreError;
use almox_inventory::LedgerError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Ledger(e) => ledger_error_to_response(e),
        ServiceError::Store(e) => store_error_to_response(e),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
    }
}

pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        LedgerError::InvalidQuantity(_) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_quantity", message)
        }
        LedgerError::UnknownMovementDirection(_) => {
            json_error(StatusCode::BAD_REQUEST, "unknown_movement_direction", message)
        }
        LedgerError::ProductNotFound(_) => {
            json_error(StatusCode::NOT_FOUND, "product_not_found", message)
        }
        LedgerError::ProductInactive(_) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "product_inactive", message)
        }
        LedgerError::InsufficientStock { available, unit } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            axum::Json(json!({
                "error": "insufficient_stock",
                "message": message,
                "available": available.to_string(),
                "unit": unit,
            })),
        )
            .into_response(),
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::Corrupt(_) | StoreError::Backend(_) => {
            tracing::error!(error = %err, "storage failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_error",
                "storage failure",
            )
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use almox_inventory::Quantity;
    use rust_decimal::Decimal;

    #[test]
    fn ledger_rejections_map_to_client_errors() {
        let insufficient = LedgerError::InsufficientStock {
            available: Quantity::new(Decimal::new(300, 2)).unwrap(),
            unit: "kg".to_string(),
        };
        assert_eq!(
            ledger_error_to_response(insufficient).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ledger_error_to_response(LedgerError::InvalidQuantity("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ledger_error_to_response(LedgerError::UnknownMovementDirection("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn backend_failures_are_opaque_500s() {
        let res = store_error_to_response(StoreError::Backend("connection refused".into()));
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
