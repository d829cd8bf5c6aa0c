//! # Conversion Property Tests
//!
//! Precision conversion and borrow-capacity invariants checked over
//! generated inputs.

use borrowflow_math::*;
use borrowflow_types::Amount;
use num_bigint::BigUint;
use proptest::prelude::*;

proptest! {
    #[test]
    fn widen_then_narrow_is_lossless(value in any::<u128>(), p1 in 0u8..=30, extra in 0u8..=30) {
        let p2 = p1 + extra;
        let original = Amount::from_u128(value, p1);
        let widened = convert(&original, p2).unwrap();
        let back = convert(&widened, p1).unwrap();
        prop_assert_eq!(back, original);
    }

    #[test]
    fn narrowing_never_increases_value(value in any::<u128>(), p1 in 0u8..=36, drop in 0u8..=36) {
        let p2 = p1.saturating_sub(drop);
        let original = Amount::from_u128(value, p1);
        let narrowed = convert(&original, p2).unwrap();
        let restored = convert(&narrowed, p1).unwrap();
        prop_assert!(restored.value() <= original.value());
    }

    #[test]
    fn borrowable_never_exceeds_capacity(
        available in 1u128..=u128::MAX,
        price in 1u128..=u128::MAX,
        price_decimals in 0u8..=27,
        asset_decimals in 0u8..=18,
    ) {
        let available = Amount::from_u128(available, 18);
        let price = Amount::from_u128(price, price_decimals);
        let borrowable = borrowable_amount(&available, &price, asset_decimals).unwrap();

        // Value of what we would borrow, at the finer of the two precisions
        let shared = 18u8.max(price_decimals);
        let borrowed_value = value_of(&borrowable, &price, shared).unwrap();
        let capacity = convert(&available, shared).unwrap();
        prop_assert!(borrowed_value.value() <= capacity.value());
    }

    #[test]
    fn parse_accepts_every_digit_string(digits in "[0-9]{1,90}") {
        let amount = Amount::parse(&digits, 18).unwrap();
        let expected = BigUint::parse_bytes(digits.as_bytes(), 10).unwrap();
        prop_assert_eq!(amount.value(), &expected);
    }

    #[test]
    fn parse_rejects_signed_literals(digits in "[0-9]{1,30}") {
        let negative = format!("-{}", digits);
        prop_assert!(Amount::parse(&negative, 18).is_err());
    }
}

#[test]
fn truncation_not_rounding() {
    let amount = Amount::from_u128(105, 2);
    assert_eq!(convert(&amount, 0).unwrap(), Amount::from_u128(1, 0));
}
