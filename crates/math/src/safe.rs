//! Checked arithmetic on arbitrary-precision integers
//!
//! Big integers cannot overflow, so division by zero is the only failure
//! mode left and it is reported instead of panicking.

use borrowflow_types::{BorrowflowError, BorrowflowResult};
use num_bigint::BigUint;
use num_traits::{One, Zero};

// ============================================================================
// Safe Basic Arithmetic
// ============================================================================

/// Truncating division for big integers
pub fn safe_div(a: &BigUint, b: &BigUint) -> BorrowflowResult<BigUint> {
    if b.is_zero() {
        return Err(BorrowflowError::precision(
            &format!("{} / {}", a, b),
            "division by zero",
        ));
    }
    Ok(a / b)
}

// ============================================================================
// Powers of Ten
// ============================================================================

/// `10^exp` as a big integer
pub fn pow10(exp: u32) -> BigUint {
    if exp == 0 {
        return BigUint::one();
    }
    BigUint::from(10u32).pow(exp)
}
