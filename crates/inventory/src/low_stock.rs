//! Low-stock evaluation.
//!
//! Derived on every read from the product's current state; never stored, so it
//! cannot go stale after a concurrent movement.

use crate::quantity::Quantity;

/// A product is low on stock when its balance is at or below its minimum.
pub fn is_low_stock(current: Quantity, minimum: Quantity) -> bool {
    current <= minimum
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn q(value: Decimal) -> Quantity {
        Quantity::new(value).unwrap()
    }

    #[test]
    fn boundary_counts_as_low() {
        assert!(is_low_stock(q(dec!(5)), q(dec!(5))));
    }

    #[test]
    fn zero_minimum_only_flags_empty_stock() {
        assert!(is_low_stock(Quantity::ZERO, Quantity::ZERO));
        assert!(!is_low_stock(q(dec!(0.01)), Quantity::ZERO));
    }

    proptest! {
        #[test]
        fn low_iff_current_at_or_below_minimum(
            current in 0i64..10_000_000,
            minimum in 0i64..10_000_000,
        ) {
            let c = q(Decimal::new(current, 2));
            let m = q(Decimal::new(minimum, 2));
            prop_assert_eq!(is_low_stock(c, m), current <= minimum);
        }
    }
}
