//! Spending allowances

use std::sync::Arc;

use borrowflow_math::format_units;
use borrowflow_types::{Address, Amount, BorrowflowResult, LedgerCall, Receipt};
use tracing::{debug, info};

use crate::gateway::{read_allowance, submit_and_confirm, LedgerGateway};

/// Grants a spender an allowance over the caller's tokens
///
/// Setting the same allowance twice has no further effect but still costs
/// a full ledger round trip.
pub struct Authorizer {
    gateway: Arc<dyn LedgerGateway>,
    confirmations: u64,
}

impl Authorizer {
    pub fn new(gateway: Arc<dyn LedgerGateway>, confirmations: u64) -> Self {
        Self {
            gateway,
            confirmations,
        }
    }

    pub async fn authorize(
        &self,
        token: &Address,
        spender: &Address,
        amount: &Amount,
    ) -> BorrowflowResult<Receipt> {
        let owner = self.gateway.sender();
        let current = read_allowance(self.gateway.as_ref(), token, &owner, spender).await?;
        debug!("Current allowance of {} over {}: {}", spender, token, current);

        info!(
            "Approving {} to spend {} tokens with address {}",
            spender,
            format_units(amount, 6)?,
            token
        );

        let call = LedgerCall::Approve {
            spender: *spender,
            amount: amount.clone(),
        };
        let receipt =
            submit_and_confirm(self.gateway.as_ref(), token, call, None, self.confirmations).await?;

        info!("Approved!");
        Ok(receipt)
    }
}
