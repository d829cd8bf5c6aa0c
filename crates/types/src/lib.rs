/// Shared types for the borrowflow workflow
///
/// This crate provides the amount type, ledger call/query vocabulary,
/// constants and the error taxonomy used by the math and runner crates.

pub mod amount;
pub mod constants;
pub mod errors;
pub mod ledger;

// Re-export all public types
pub use amount::*;
pub use constants::*;
pub use errors::*;
pub use ledger::*;

/// Result type alias using the shared error type
pub type BorrowflowResult<T> = std::result::Result<T, BorrowflowError>;
