//! Protocol constants shared by the workflow crates

// ============================================================================
// Precision Constants
// ============================================================================

/// Precision of the common valuation unit reported by the pool (WAD)
pub const WAD_DECIMALS: u8 = 18;

/// Precision of the native base currency
pub const NATIVE_DECIMALS: u8 = 18;

// ============================================================================
// Pool Constants
// ============================================================================

/// Basis points denominator (10,000 = 100%)
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Referral code used when none is configured
pub const DEFAULT_REFERRAL_CODE: u16 = 0;

// ============================================================================
// Ledger Constants
// ============================================================================

/// Confirmation depth used when the network entry omits one
pub const DEFAULT_CONFIRMATIONS: u64 = 1;

/// Upper bound for configured confirmation depth
pub const MAX_CONFIRMATIONS: u64 = 64;

/// Length of an account/contract address in bytes
pub const ADDRESS_LEN: usize = 20;
