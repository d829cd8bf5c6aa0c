//! Values exchanged with the external lending ledger

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::{Amount, BorrowflowError, BorrowflowResult, ADDRESS_LEN, WAD_DECIMALS};

// ============================================================================
// Identifiers
// ============================================================================

/// 20-byte account or contract address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Deterministic address derived from a small integer, handy for fixtures
    pub fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes[ADDRESS_LEN - 8..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }
}

impl FromStr for Address {
    type Err = BorrowflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| BorrowflowError::invalid_configuration("address", &format!("'{}' is missing the 0x prefix", s)))?;

        if hex.len() != ADDRESS_LEN * 2 || !hex.is_ascii() {
            return Err(BorrowflowError::invalid_configuration(
                "address",
                &format!("'{}' must have {} hex digits", s, ADDRESS_LEN * 2),
            ));
        }

        let mut bytes = [0u8; ADDRESS_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| {
                BorrowflowError::invalid_configuration("address", &format!("'{}' is not valid hex", s))
            })?;
        }
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = BorrowflowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Transaction hash as reported by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub String);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Interest Rate Mode
// ============================================================================

/// How borrowed debt accrues interest
///
/// Chosen per borrow and passed unchanged into the matching repay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterestRateMode {
    Stable,
    Variable,
}

impl InterestRateMode {
    /// Numeric value the pool expects
    pub fn as_u8(&self) -> u8 {
        match self {
            InterestRateMode::Stable => 1,
            InterestRateMode::Variable => 2,
        }
    }
}

impl TryFrom<u8> for InterestRateMode {
    type Error = BorrowflowError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(InterestRateMode::Stable),
            2 => Ok(InterestRateMode::Variable),
            other => Err(BorrowflowError::invalid_configuration(
                "interest_rate_mode",
                &format!("unknown mode {}", other),
            )),
        }
    }
}

impl fmt::Display for InterestRateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterestRateMode::Stable => f.write_str("stable"),
            InterestRateMode::Variable => f.write_str("variable"),
        }
    }
}

// ============================================================================
// Calls and Queries
// ============================================================================

/// Discriminant of a state-changing call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    WrapNative,
    Approve,
    Deposit,
    Borrow,
    Repay,
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallKind::WrapNative => "wrap",
            CallKind::Approve => "approve",
            CallKind::Deposit => "deposit",
            CallKind::Borrow => "borrow",
            CallKind::Repay => "repay",
        };
        f.write_str(name)
    }
}

/// State-changing call submitted to a contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    /// Wrap the attached native value into the wrapped token
    WrapNative,

    /// Set `spender`'s allowance over the caller's tokens
    Approve { spender: Address, amount: Amount },

    /// Supply `amount` of `asset` to the pool as collateral
    Deposit {
        asset: Address,
        amount: Amount,
        on_behalf_of: Address,
        referral_code: u16,
    },

    /// Borrow `amount` of `asset` against deposited collateral
    Borrow {
        asset: Address,
        amount: Amount,
        rate_mode: InterestRateMode,
        referral_code: u16,
        on_behalf_of: Address,
    },

    /// Repay `amount` of `asset` debt held under `rate_mode`
    Repay {
        asset: Address,
        amount: Amount,
        rate_mode: InterestRateMode,
        on_behalf_of: Address,
    },
}

impl LedgerCall {
    pub fn kind(&self) -> CallKind {
        match self {
            LedgerCall::WrapNative => CallKind::WrapNative,
            LedgerCall::Approve { .. } => CallKind::Approve,
            LedgerCall::Deposit { .. } => CallKind::Deposit,
            LedgerCall::Borrow { .. } => CallKind::Borrow,
            LedgerCall::Repay { .. } => CallKind::Repay,
        }
    }

    /// Only the wrap call may carry native value
    pub fn is_payable(&self) -> bool {
        matches!(self, LedgerCall::WrapNative)
    }
}

/// Read-only query against a contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerQuery {
    /// ERC20 `balanceOf(owner)`
    BalanceOf { owner: Address },
    /// ERC20 `allowance(owner, spender)`
    Allowance { owner: Address, spender: Address },
    /// ERC20 or price feed `decimals()`
    Decimals,
    /// Addresses provider `getLendingPool()`
    LendingPool,
    /// Pool `getUserAccountData(user)`
    UserAccountData { user: Address },
    /// Price feed `latestRoundData()`
    LatestRoundData,
}

/// Raw `getUserAccountData` tuple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAccountData {
    pub total_collateral_eth: BigUint,
    pub total_debt_eth: BigUint,
    pub available_borrows_eth: BigUint,
    pub current_liquidation_threshold: u64,
    pub ltv: u64,
    pub health_factor: BigUint,
}

/// Raw `latestRoundData` answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundData {
    pub round_id: u64,
    pub answer: BigUint,
    pub updated_at: u64,
}

/// Result of a [`LedgerQuery`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerValue {
    Uint(BigUint),
    Decimals(u8),
    Address(Address),
    AccountData(RawAccountData),
    Round(RoundData),
}

impl LedgerValue {
    pub fn into_uint(self) -> BorrowflowResult<BigUint> {
        match self {
            LedgerValue::Uint(value) => Ok(value),
            other => Err(unexpected("uint", &other)),
        }
    }

    pub fn into_decimals(self) -> BorrowflowResult<u8> {
        match self {
            LedgerValue::Decimals(decimals) => Ok(decimals),
            other => Err(unexpected("decimals", &other)),
        }
    }

    pub fn into_address(self) -> BorrowflowResult<Address> {
        match self {
            LedgerValue::Address(address) => Ok(address),
            other => Err(unexpected("address", &other)),
        }
    }

    pub fn into_account_data(self) -> BorrowflowResult<RawAccountData> {
        match self {
            LedgerValue::AccountData(data) => Ok(data),
            other => Err(unexpected("account data", &other)),
        }
    }

    pub fn into_round(self) -> BorrowflowResult<RoundData> {
        match self {
            LedgerValue::Round(round) => Ok(round),
            other => Err(unexpected("round data", &other)),
        }
    }
}

fn unexpected(expected: &str, got: &LedgerValue) -> BorrowflowError {
    BorrowflowError::ledger_unavailable(&format!("unexpected response: wanted {}, got {:?}", expected, got))
}

// ============================================================================
// Transactions
// ============================================================================

/// Lifecycle of a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

/// Handle returned by submit; not final until awaited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub hash: TxHash,
    pub target: Address,
    pub call: LedgerCall,
    pub submitted_at_block: u64,
}

/// Outcome of a confirmed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub hash: TxHash,
    pub block_number: u64,
    pub confirmations: u64,
    pub status: TxStatus,
}

// ============================================================================
// Position Views
// ============================================================================

/// Point-in-time view of a user's position at the pool
///
/// Value fields are in the common valuation unit at WAD precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub total_collateral: Amount,
    pub total_debt: Amount,
    pub available_borrows: Amount,
    /// Basis points
    pub current_liquidation_threshold: u64,
    /// Basis points
    pub ltv: u64,
    pub health_factor: Amount,
}

impl From<RawAccountData> for AccountSnapshot {
    fn from(raw: RawAccountData) -> Self {
        Self {
            total_collateral: Amount::new(raw.total_collateral_eth, WAD_DECIMALS),
            total_debt: Amount::new(raw.total_debt_eth, WAD_DECIMALS),
            available_borrows: Amount::new(raw.available_borrows_eth, WAD_DECIMALS),
            current_liquidation_threshold: raw.current_liquidation_threshold,
            ltv: raw.ltv,
            health_factor: Amount::new(raw.health_factor, WAD_DECIMALS),
        }
    }
}

/// Oracle exchange rate at the feed's native precision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub feed: Address,
    pub round_id: u64,
    pub answer: Amount,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parse_and_display() {
        let address: Address = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2".parse().unwrap();
        assert_eq!(address.to_string(), "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
        assert!(!address.is_zero());

        let lower: Address = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2".parse().unwrap();
        assert_eq!(address, lower);
    }

    #[test]
    fn test_address_rejects_malformed() {
        assert!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2".parse::<Address>().is_err());
        assert!("0x1234".parse::<Address>().is_err());
        assert!("0xZZ2aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2".parse::<Address>().is_err());
    }

    #[test]
    fn test_rate_mode_wire_values() {
        assert_eq!(InterestRateMode::Stable.as_u8(), 1);
        assert_eq!(InterestRateMode::Variable.as_u8(), 2);
        assert_eq!(InterestRateMode::try_from(2).unwrap(), InterestRateMode::Variable);
        assert!(InterestRateMode::try_from(0).is_err());
    }

    #[test]
    fn test_unexpected_value_is_ledger_error() {
        let err = LedgerValue::Decimals(18).into_address().unwrap_err();
        assert!(matches!(err, BorrowflowError::LedgerUnavailable { .. }));
    }
}
