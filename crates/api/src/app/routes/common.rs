use core::str::FromStr;

use axum::http::StatusCode;

use almox_core::DomainError;

use crate::app::errors;

/// Parse a path or query identifier, answering `400 invalid_id` on failure.
pub fn parse_id<T>(raw: &str, what: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.trim().parse().map_err(|_| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_id",
            format!("invalid {what} id"),
        )
    })
}
