use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use almox_core::{DomainError, DomainResult, Entity, MovementId, ProductId, UserId};

use crate::ledger::LedgerError;
use crate::quantity::Quantity;

/// Direction of a stock movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementDirection {
    /// Entry: goods received into the warehouse.
    In,
    /// Exit: goods issued out of the warehouse.
    Out,
}

impl MovementDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementDirection::In => "in",
            MovementDirection::Out => "out",
        }
    }
}

impl core::fmt::Display for MovementDirection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementDirection {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in" => Ok(MovementDirection::In),
            "out" => Ok(MovementDirection::Out),
            _ => Err(LedgerError::UnknownMovementDirection(s.to_string())),
        }
    }
}

/// A request to move stock, as submitted by the movement form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementRequest {
    pub product_id: ProductId,
    pub direction: MovementDirection,
    pub quantity: Decimal,
    pub actor: UserId,
    pub notes: String,
}

/// Immutable record of one applied movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockMovement {
    id: MovementId,
    product_id: ProductId,
    direction: MovementDirection,
    quantity: Quantity,
    quantity_before: Quantity,
    quantity_after: Quantity,
    actor: UserId,
    occurred_at: DateTime<Utc>,
    notes: String,
}

impl StockMovement {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: MovementId,
        product_id: ProductId,
        direction: MovementDirection,
        quantity: Quantity,
        quantity_before: Quantity,
        quantity_after: Quantity,
        actor: UserId,
        occurred_at: DateTime<Utc>,
        notes: String,
    ) -> Self {
        Self {
            id,
            product_id,
            direction,
            quantity,
            quantity_before,
            quantity_after,
            actor,
            occurred_at,
            notes,
        }
    }

    /// Rebuild a movement from storage, re-checking `after == before ± quantity`.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: MovementId,
        product_id: ProductId,
        direction: MovementDirection,
        quantity: Decimal,
        quantity_before: Decimal,
        quantity_after: Decimal,
        actor: UserId,
        occurred_at: DateTime<Utc>,
        notes: String,
    ) -> DomainResult<Self> {
        let movement = Self::new(
            id,
            product_id,
            direction,
            Quantity::new(quantity)?,
            Quantity::new(quantity_before)?,
            Quantity::new(quantity_after)?,
            actor,
            occurred_at,
            notes,
        );
        if !movement.is_consistent() {
            return Err(DomainError::invariant(format!(
                "movement {id} does not balance: {} {} {} -> {}",
                quantity_before, direction, quantity, quantity_after
            )));
        }
        Ok(movement)
    }

    /// Whether the recorded before/after pair matches the moved quantity.
    pub fn is_consistent(&self) -> bool {
        if self.quantity.is_zero() {
            return false;
        }
        let expected = match self.direction {
            MovementDirection::In => self.quantity_before.checked_add(self.quantity),
            MovementDirection::Out => self.quantity_before.checked_sub(self.quantity),
        };
        expected == Some(self.quantity_after)
    }

    pub fn id_typed(&self) -> MovementId {
        self.id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn direction(&self) -> MovementDirection {
        self.direction
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn quantity_before(&self) -> Quantity {
        self.quantity_before
    }

    pub fn quantity_after(&self) -> Quantity {
        self.quantity_after
    }

    pub fn actor(&self) -> UserId {
        self.actor
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }
}

impl Entity for StockMovement {
    type Id = MovementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn direction_parses_case_insensitively() {
        assert_eq!("IN".parse::<MovementDirection>().unwrap(), MovementDirection::In);
        assert_eq!(" out ".parse::<MovementDirection>().unwrap(), MovementDirection::Out);
    }

    #[test]
    fn direction_rejects_unknown_values() {
        let err = "transfer".parse::<MovementDirection>().unwrap_err();
        assert_eq!(err, LedgerError::UnknownMovementDirection("transfer".to_string()));
    }

    #[test]
    fn direction_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MovementDirection::Out).unwrap(), "\"out\"");
    }

    #[test]
    fn restore_rejects_unbalanced_rows() {
        let result = StockMovement::restore(
            MovementId::new(),
            ProductId::new(),
            MovementDirection::Out,
            dec!(2),
            dec!(10),
            dec!(9),
            UserId::new(),
            Utc::now(),
            String::new(),
        );
        assert!(matches!(result, Err(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn restore_accepts_balanced_rows() {
        let movement = StockMovement::restore(
            MovementId::new(),
            ProductId::new(),
            MovementDirection::In,
            dec!(2.5),
            dec!(10),
            dec!(12.5),
            UserId::new(),
            Utc::now(),
            "nota fiscal 123".to_string(),
        )
        .unwrap();
        assert!(movement.is_consistent());
        assert_eq!(movement.quantity_after().to_string(), "12.50");
    }
}
