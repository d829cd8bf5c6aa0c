use thiserror::Error;

// ============================================================================
// Main Error Enum
// ============================================================================

/// Error taxonomy for the borrowing workflow
///
/// Every variant is fatal to the current workflow run. Nothing here is
/// retried automatically.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BorrowflowError {
    // ========================================================================
    // Ledger Errors
    // ========================================================================

    /// Connectivity or transport failure before anything was submitted
    #[error("Ledger unavailable: {reason}")]
    LedgerUnavailable { reason: String },

    /// Call was locally invalid and never reached the ledger
    #[error("Submission rejected for '{call}': {reason}")]
    SubmissionRejected { call: String, reason: String },

    /// Ledger accepted the call but it failed on-chain
    #[error("Transaction {tx_hash} reverted: {reason}")]
    TransactionReverted { tx_hash: String, reason: String },

    // ========================================================================
    // Numeric Errors
    // ========================================================================

    /// Malformed or negative amount, precision mismatch, or division by zero
    #[error("Precision error for '{value}': {reason}")]
    PrecisionError { value: String, reason: String },

    // ========================================================================
    // Configuration Errors
    // ========================================================================

    /// Invalid configuration
    #[error("Invalid configuration for '{component}': {reason}")]
    InvalidConfiguration { component: String, reason: String },
}

impl BorrowflowError {
    /// Create a ledger connectivity error
    pub fn ledger_unavailable(reason: &str) -> Self {
        Self::LedgerUnavailable {
            reason: reason.to_string(),
        }
    }

    /// Create a local submission rejection
    pub fn submission_rejected(call: &str, reason: &str) -> Self {
        Self::SubmissionRejected {
            call: call.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an on-chain revert error
    pub fn reverted(tx_hash: &str, reason: &str) -> Self {
        Self::TransactionReverted {
            tx_hash: tx_hash.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a precision error
    pub fn precision(value: &str, reason: &str) -> Self {
        Self::PrecisionError {
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a configuration error
    pub fn invalid_configuration(component: &str, reason: &str) -> Self {
        Self::InvalidConfiguration {
            component: component.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the ledger itself rejected the transaction
    pub fn is_revert(&self) -> bool {
        matches!(self, Self::TransactionReverted { .. })
    }
}

