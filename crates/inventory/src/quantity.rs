//! Stock quantities.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use almox_core::{DomainError, DomainResult, ValueObject};

/// Fractional digits kept for every stored quantity (form step is 0.01).
pub const QUANTITY_SCALE: u32 = 2;

/// Largest representable quantity: ten significant digits, two of them fractional.
pub fn max_quantity() -> Decimal {
    Decimal::new(9_999_999_999, QUANTITY_SCALE)
}

/// A non-negative stock quantity with at most two fractional digits.
///
/// Always carries scale 2, so `3` and `3.0` both display as `3.00`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Quantity(Decimal);

impl ValueObject for Quantity {}

impl Quantity {
    pub const ZERO: Quantity = Quantity(Decimal::from_parts(0, 0, 0, false, QUANTITY_SCALE));

    pub fn new(value: Decimal) -> DomainResult<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        if value.normalize().scale() > QUANTITY_SCALE {
            return Err(DomainError::validation(format!(
                "quantity supports at most {QUANTITY_SCALE} decimal places"
            )));
        }
        if value > max_quantity() {
            return Err(DomainError::validation(format!(
                "quantity cannot exceed {}",
                max_quantity()
            )));
        }

        let mut scaled = value.abs();
        scaled.rescale(QUANTITY_SCALE);
        Ok(Self(scaled))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Sum of two quantities, `None` if it would leave the representable range.
    pub fn checked_add(self, other: Quantity) -> Option<Quantity> {
        let sum = self.0.checked_add(other.0)?;
        Quantity::new(sum).ok()
    }

    /// Difference of two quantities, `None` if it would go negative.
    pub fn checked_sub(self, other: Quantity) -> Option<Quantity> {
        if other.0 > self.0 {
            return None;
        }
        Quantity::new(self.0 - other.0).ok()
    }
}

impl TryFrom<Decimal> for Quantity {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Quantity::new(value)
    }
}

impl From<Quantity> for Decimal {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}
