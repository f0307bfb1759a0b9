//! Stock movement ledger: the single authoritative balance check.
//!
//! [`apply_movement`] is pure. Storage adapters are responsible for calling it
//! while holding an exclusive lock on the product, and for persisting the
//! mutated product together with the returned movement as one atomic unit.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use almox_core::{MovementId, ProductId};

use crate::movement::{MovementDirection, MovementRequest, StockMovement};
use crate::product::Product;
use crate::quantity::Quantity;

/// Business rejection of a movement request. Never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("insufficient stock: available {available} {unit}")]
    InsufficientStock { available: Quantity, unit: String },

    #[error("unknown movement direction: {0:?}")]
    UnknownMovementDirection(String),

    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("product {0} is inactive")]
    ProductInactive(ProductId),
}

/// Balance before and after a movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MovementPlan {
    pub quantity_before: Quantity,
    pub quantity_after: Quantity,
}

/// Check that a requested quantity is strictly positive and representable.
pub fn validate_quantity(quantity: Decimal) -> Result<Quantity, LedgerError> {
    if quantity <= Decimal::ZERO {
        return Err(LedgerError::InvalidQuantity(
            "quantity must be greater than zero".to_string(),
        ));
    }
    Quantity::new(quantity).map_err(|e| LedgerError::InvalidQuantity(e.to_string()))
}

/// Compute the resulting balance without touching the product.
pub fn plan_movement(
    product: &Product,
    direction: MovementDirection,
    quantity: Quantity,
    unit_symbol: &str,
) -> Result<MovementPlan, LedgerError> {
    if quantity.is_zero() {
        return Err(LedgerError::InvalidQuantity(
            "quantity must be greater than zero".to_string(),
        ));
    }
    if !product.is_active() {
        return Err(LedgerError::ProductInactive(product.id_typed()));
    }

    let quantity_before = product.quantity_current();
    let quantity_after = match direction {
        MovementDirection::In => quantity_before.checked_add(quantity).ok_or_else(|| {
            LedgerError::InvalidQuantity("resulting balance exceeds the maximum".to_string())
        })?,
        MovementDirection::Out => {
            quantity_before
                .checked_sub(quantity)
                .ok_or_else(|| LedgerError::InsufficientStock {
                    available: quantity_before,
                    unit: unit_symbol.to_string(),
                })?
        }
    };

    Ok(MovementPlan {
        quantity_before,
        quantity_after,
    })
}

/// Apply a movement to `product` and return the record to append.
///
/// On error the product is left exactly as it was.
pub fn apply_movement(
    product: &mut Product,
    unit_symbol: &str,
    request: &MovementRequest,
    movement_id: MovementId,
    occurred_at: DateTime<Utc>,
) -> Result<StockMovement, LedgerError> {
    if request.product_id != product.id_typed() {
        return Err(LedgerError::ProductNotFound(request.product_id));
    }

    let quantity = validate_quantity(request.quantity)?;
    let plan = plan_movement(product, request.direction, quantity, unit_symbol)?;

    product.set_balance(plan.quantity_after, occurred_at);

    Ok(StockMovement::new(
        movement_id,
        request.product_id,
        request.direction,
        quantity,
        plan.quantity_before,
        plan.quantity_after,
        request.actor,
        occurred_at,
        request.notes.trim().to_string(),
    ))
}
