//! Error types for the workflow runner

use borrowflow_types::{Address, BorrowflowError};
use thiserror::Error;

use crate::workflow::WorkflowState;

/// A ledger or math failure pinned to the workflow step it aborted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("workflow aborted at {step}{}: {source}", asset_suffix(.asset))]
pub struct WorkflowError {
    /// State the workflow was trying to reach
    pub step: WorkflowState,

    /// Asset or contract the failing step was operating on
    pub asset: Option<Address>,

    #[source]
    pub source: BorrowflowError,
}

impl WorkflowError {
    pub fn new(step: WorkflowState, asset: Option<Address>, source: BorrowflowError) -> Self {
        Self { step, asset, source }
    }

    /// Whether the ledger itself rejected a transaction
    pub fn is_revert(&self) -> bool {
        self.source.is_revert()
    }
}

fn asset_suffix(asset: &Option<Address>) -> String {
    match asset {
        Some(address) => format!(" ({})", address),
        None => String::new(),
    }
}
