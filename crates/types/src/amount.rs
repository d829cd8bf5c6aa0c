//! Fixed-precision token amounts
//!
//! An [`Amount`] is a non-negative integer of base units tagged with the
//! number of fractional digits those units carry. Two amounts only combine
//! when their precisions match; cross-precision work goes through the
//! converter in `borrowflow-math`.

use std::cmp::Ordering;
use std::fmt;

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::{BorrowflowError, BorrowflowResult};

/// Non-negative integer amount with an implicit decimal precision
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "AmountRepr", into = "AmountRepr")]
pub struct Amount {
    value: BigUint,
    decimals: u8,
}

impl Amount {
    pub fn new(value: BigUint, decimals: u8) -> Self {
        Self { value, decimals }
    }

    pub fn zero(decimals: u8) -> Self {
        Self::new(BigUint::zero(), decimals)
    }

    pub fn from_u128(value: u128, decimals: u8) -> Self {
        Self::new(BigUint::from(value), decimals)
    }

    /// Parse a base-unit integer literal such as `"100000000000000000"`.
    ///
    /// Only ASCII digits are accepted. Signs, whitespace, decimal points and
    /// exponents are rejected with `PrecisionError`.
    pub fn parse(literal: &str, decimals: u8) -> BorrowflowResult<Self> {
        if literal.is_empty() {
            return Err(BorrowflowError::precision(literal, "empty amount literal"));
        }
        if literal.starts_with('-') {
            return Err(BorrowflowError::precision(literal, "amount must be non-negative"));
        }
        if !literal.bytes().all(|b| b.is_ascii_digit()) {
            return Err(BorrowflowError::precision(
                literal,
                "amount must be a non-negative integer literal",
            ));
        }

        let value = BigUint::parse_bytes(literal.as_bytes(), 10)
            .ok_or_else(|| BorrowflowError::precision(literal, "unparseable integer literal"))?;
        Ok(Self::new(value, decimals))
    }

    pub fn value(&self) -> &BigUint {
        &self.value
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Same base units reinterpreted at another precision (no rescaling)
    pub fn with_decimals(&self, decimals: u8) -> Self {
        Self::new(self.value.clone(), decimals)
    }

    /// Base-unit integer as a decimal string
    pub fn to_base_units(&self) -> String {
        self.value.to_str_radix(10)
    }

    /// Add two amounts of the same precision
    pub fn checked_add(&self, other: &Amount) -> BorrowflowResult<Amount> {
        self.ensure_same_precision(other, "add")?;
        Ok(Self::new(&self.value + &other.value, self.decimals))
    }

    /// Subtract two amounts of the same precision; fails rather than going negative
    pub fn checked_sub(&self, other: &Amount) -> BorrowflowResult<Amount> {
        self.ensure_same_precision(other, "sub")?;
        if other.value > self.value {
            return Err(BorrowflowError::precision(
                &format!("{} - {}", self.to_base_units(), other.to_base_units()),
                "subtraction would go negative",
            ));
        }
        Ok(Self::new(&self.value - &other.value, self.decimals))
    }

    /// The smaller of two amounts of the same precision
    pub fn checked_min(&self, other: &Amount) -> BorrowflowResult<Amount> {
        self.ensure_same_precision(other, "min")?;
        Ok(if self.value <= other.value { self.clone() } else { other.clone() })
    }

    /// Compare two amounts of the same precision
    pub fn checked_cmp(&self, other: &Amount) -> BorrowflowResult<Ordering> {
        self.ensure_same_precision(other, "compare")?;
        Ok(self.value.cmp(&other.value))
    }

    fn ensure_same_precision(&self, other: &Amount, operation: &str) -> BorrowflowResult<()> {
        if self.decimals != other.decimals {
            return Err(BorrowflowError::precision(
                &format!("{} {} {}", self, operation, other),
                &format!(
                    "precision mismatch: {} vs {} decimals",
                    self.decimals, other.decimals
                ),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Amount {
    /// Human-readable decimal form with trailing zeros stripped, e.g. `0.1`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.to_base_units();
        let decimals = self.decimals as usize;
        if decimals == 0 {
            return f.write_str(&digits);
        }

        let padded = if digits.len() <= decimals {
            format!("{}{}", "0".repeat(decimals - digits.len() + 1), digits)
        } else {
            digits
        };
        let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
        let frac_part = frac_part.trim_end_matches('0');

        if frac_part.is_empty() {
            f.write_str(int_part)
        } else {
            write!(f, "{}.{}", int_part, frac_part)
        }
    }
}

/// Wire form: base units as a string so no JSON/TOML number limits apply
#[derive(Serialize, Deserialize)]
struct AmountRepr {
    value: String,
    decimals: u8,
}

impl TryFrom<AmountRepr> for Amount {
    type Error = BorrowflowError;

    fn try_from(repr: AmountRepr) -> Result<Self, Self::Error> {
        Amount::parse(&repr.value, repr.decimals)
    }
}

impl From<Amount> for AmountRepr {
    fn from(amount: Amount) -> Self {
        Self {
            value: amount.to_base_units(),
            decimals: amount.decimals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_integer_literals() {
        let amount = Amount::parse("100000000000000000", 18).unwrap();
        assert_eq!(amount.to_base_units(), "100000000000000000");
        assert_eq!(amount.decimals(), 18);

        // Larger than u128
        let huge = "1".repeat(60);
        assert_eq!(Amount::parse(&huge, 0).unwrap().to_base_units(), huge);
    }

    #[test]
    fn test_parse_rejects_malformed_literals() {
        for bad in ["", "-1", "+1", "1.5", "1e18", " 1", "0x10", "abc"] {
            let err = Amount::parse(bad, 18).unwrap_err();
            assert!(
                matches!(err, BorrowflowError::PrecisionError { .. }),
                "expected precision error for {:?}, got {:?}",
                bad,
                err
            );
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Amount::from_u128(100_000_000_000_000_000, 18).to_string(), "0.1");
        assert_eq!(Amount::from_u128(10_000_000, 6).to_string(), "10");
        assert_eq!(Amount::from_u128(105, 2).to_string(), "1.05");
        assert_eq!(Amount::from_u128(5, 0).to_string(), "5");
        assert_eq!(Amount::zero(18).to_string(), "0");
    }

    #[test]
    fn test_precision_mismatch() {
        let a = Amount::from_u128(1, 18);
        let b = Amount::from_u128(1, 6);
        assert!(a.checked_add(&b).is_err());
        assert!(a.checked_cmp(&b).is_err());
    }

    #[test]
    fn test_checked_sub_never_negative() {
        let a = Amount::from_u128(5, 6);
        let b = Amount::from_u128(7, 6);
        assert!(a.checked_sub(&b).is_err());
        assert_eq!(b.checked_sub(&a).unwrap(), Amount::from_u128(2, 6));
    }

    #[test]
    fn test_serde_uses_string_value() {
        let amount = Amount::from_u128(u128::MAX, 18);
        let json = serde_json::to_string(&amount).unwrap();
        assert!(json.contains(&format!("\"{}\"", u128::MAX)));
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amount);

        let negative = r#"{"value":"-1","decimals":18}"#;
        assert!(serde_json::from_str::<Amount>(negative).is_err());
    }
}
