//! Borrow-capacity math
//!
//! Turns the pool's available-borrow value (common valuation unit) and an
//! oracle price (common units per one borrow-asset unit) into an amount of
//! the borrow asset. All divisions truncate so the result never exceeds
//! what the capacity covers.

use borrowflow_types::{Amount, BorrowflowError, BorrowflowResult};
use num_bigint::BigUint;

use crate::fixed_point::convert;
use crate::safe::{pow10, safe_div};

/// Amount of the borrow asset purchasable with `available` at `price`.
///
/// `available / price` is taken in whole borrow-asset units (both sides
/// widened to a shared precision first) and the quotient is then converted
/// to `asset_decimals`. A zero price is a `PrecisionError`.
pub fn borrowable_amount(
    available: &Amount,
    price: &Amount,
    asset_decimals: u8,
) -> BorrowflowResult<Amount> {
    if price.is_zero() {
        return Err(BorrowflowError::precision(
            &price.to_base_units(),
            "price quote is zero, cannot compute borrow capacity",
        ));
    }

    // Widen only: narrowing the price would round it down and overstate capacity
    let shared = available.decimals().max(price.decimals());
    let available = convert(available, shared)?;
    let price = convert(price, shared)?;

    let units = safe_div(available.value(), price.value())?;
    convert(&Amount::new(units, 0), asset_decimals)
}

/// Value of `amount` at `price`, expressed at `value_decimals`.
///
/// `price` is common units per one whole token; the product is truncated.
pub fn value_of(amount: &Amount, price: &Amount, value_decimals: u8) -> BorrowflowResult<Amount> {
    let product: BigUint = amount.value() * price.value();
    let product_decimals = u32::from(amount.decimals()) + u32::from(price.decimals());
    let target = u32::from(value_decimals);

    let value = if target >= product_decimals {
        product * pow10(target - product_decimals)
    } else {
        safe_div(&product, &pow10(product_decimals - target))?
    };
    Ok(Amount::new(value, value_decimals))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_scenario() {
        // 0.05 ETH of capacity at 0.005 ETH per token -> 10 tokens at 6 decimals
        let available = Amount::from_u128(50_000_000_000_000_000, 18);
        let price = Amount::from_u128(5_000_000_000_000_000, 18);
        let amount = borrowable_amount(&available, &price, 6).unwrap();
        assert_eq!(amount, Amount::from_u128(10_000_000, 6));
    }

    #[test]
    fn test_price_at_feed_precision() {
        // Same price reported by an 8-decimal feed
        let available = Amount::from_u128(50_000_000_000_000_000, 18);
        let price = Amount::from_u128(500_000, 8);
        let amount = borrowable_amount(&available, &price, 6).unwrap();
        assert_eq!(amount, Amount::from_u128(10_000_000, 6));
    }

    #[test]
    fn test_truncates_partial_units() {
        let available = Amount::from_u128(19, 0);
        let price = Amount::from_u128(10, 0);
        let amount = borrowable_amount(&available, &price, 2).unwrap();
        assert_eq!(amount, Amount::from_u128(100, 2));
    }

    #[test]
    fn test_zero_price_is_precision_error() {
        let available = Amount::from_u128(1, 18);
        let err = borrowable_amount(&available, &Amount::zero(18), 6).unwrap_err();
        assert!(matches!(err, BorrowflowError::PrecisionError { .. }));
    }

    #[test]
    fn test_zero_capacity() {
        let price = Amount::from_u128(5_000_000_000_000_000, 18);
        let amount = borrowable_amount(&Amount::zero(18), &price, 6).unwrap();
        assert!(amount.is_zero());
    }

    #[test]
    fn test_value_of() {
        // 10 tokens (6dp) at 0.005 ETH each = 0.05 ETH
        let amount = Amount::from_u128(10_000_000, 6);
        let price = Amount::from_u128(5_000_000_000_000_000, 18);
        assert_eq!(
            value_of(&amount, &price, 18).unwrap(),
            Amount::from_u128(50_000_000_000_000_000, 18)
        );
    }
}
