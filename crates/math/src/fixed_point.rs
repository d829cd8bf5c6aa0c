//! Decimal fixed-point conversions between token precisions

use borrowflow_types::{Amount, BorrowflowError, BorrowflowResult};

use crate::safe::{pow10, safe_div};

// ============================================================================
// Precision Conversion
// ============================================================================

/// Rescale `amount` to `target_decimals` fractional digits.
///
/// Widening multiplies by `10^(target - source)`. Narrowing divides by
/// `10^(source - target)` and truncates, so a conversion never reports more
/// value than the source holds.
pub fn convert(amount: &Amount, target_decimals: u8) -> BorrowflowResult<Amount> {
    let source_decimals = amount.decimals();

    let value = if target_decimals >= source_decimals {
        let scale = pow10(u32::from(target_decimals - source_decimals));
        amount.value() * scale
    } else {
        let scale = pow10(u32::from(source_decimals - target_decimals));
        safe_div(amount.value(), &scale)?
    };

    Ok(Amount::new(value, target_decimals))
}

// ============================================================================
// Human Units
// ============================================================================

/// Parse a human decimal string such as `"0.1"` into base units at `decimals`.
///
/// More fractional digits than `decimals` is a `PrecisionError`, never a
/// silent truncation.
pub fn parse_units(text: &str, decimals: u8) -> BorrowflowResult<Amount> {
    let (int_part, frac_part) = match text.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (text, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(BorrowflowError::precision(text, "empty amount"));
    }
    if frac_part.len() > decimals as usize {
        return Err(BorrowflowError::precision(
            text,
            &format!("more than {} fractional digits", decimals),
        ));
    }

    let padded_frac = format!("{:0<width$}", frac_part, width = decimals as usize);
    let int_part = if int_part.is_empty() { "0" } else { int_part };
    Amount::parse(&format!("{}{}", int_part, padded_frac), decimals)
        .map_err(|_| BorrowflowError::precision(text, "not a non-negative decimal number"))
}

/// Render `amount` with exactly `display_decimals` fractional digits, truncating.
pub fn format_units(amount: &Amount, display_decimals: u8) -> BorrowflowResult<String> {
    let rescaled = convert(amount, display_decimals)?;
    let digits = rescaled.to_base_units();
    let width = display_decimals as usize;

    if width == 0 {
        return Ok(digits);
    }

    let padded = format!("{:0>width$}", digits, width = width + 1);
    let (int_part, frac_part) = padded.split_at(padded.len() - width);
    Ok(format!("{}.{}", int_part, frac_part))
}

/// `10^decimals` base units, i.e. one whole token
pub fn one_unit(decimals: u8) -> Amount {
    Amount::new(pow10(u32::from(decimals)), decimals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_widen() {
        let amount = Amount::from_u128(10, 0);
        assert_eq!(convert(&amount, 6).unwrap(), Amount::from_u128(10_000_000, 6));
    }

    #[test]
    fn test_convert_truncates() {
        let amount = Amount::from_u128(105, 2);
        assert_eq!(convert(&amount, 0).unwrap(), Amount::from_u128(1, 0));

        let amount = Amount::from_u128(199, 2);
        assert_eq!(convert(&amount, 0).unwrap(), Amount::from_u128(1, 0));
    }

    #[test]
    fn test_convert_same_precision() {
        let amount = Amount::from_u128(12345, 4);
        assert_eq!(convert(&amount, 4).unwrap(), amount);
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(
            parse_units("0.1", 18).unwrap(),
            Amount::from_u128(100_000_000_000_000_000, 18)
        );
        assert_eq!(parse_units("10", 6).unwrap(), Amount::from_u128(10_000_000, 6));
        assert_eq!(parse_units(".5", 1).unwrap(), Amount::from_u128(5, 1));
        assert!(parse_units("0.1234567", 6).is_err());
        assert!(parse_units("-1", 18).is_err());
        assert!(parse_units("1.2.3", 18).is_err());
        assert!(parse_units(".", 18).is_err());
    }

    #[test]
    fn test_format_units() {
        let wrapped = Amount::from_u128(100_000_000_000_000_000, 18);
        assert_eq!(format_units(&wrapped, 6).unwrap(), "0.100000");

        let borrowed = Amount::from_u128(10_000_000, 6);
        assert_eq!(format_units(&borrowed, 2).unwrap(), "10.00");
        assert_eq!(format_units(&borrowed, 0).unwrap(), "10");

        let dust = Amount::from_u128(1, 18);
        assert_eq!(format_units(&dust, 6).unwrap(), "0.000000");
    }

    #[test]
    fn test_one_unit() {
        assert_eq!(one_unit(6), Amount::from_u128(1_000_000, 6));
    }
}
