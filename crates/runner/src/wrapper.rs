//! Native asset wrapping

use std::sync::Arc;

use borrowflow_math::format_units;
use borrowflow_types::{Address, Amount, BorrowflowResult, LedgerCall, Receipt};
use serde::Serialize;
use tracing::info;

use crate::gateway::{read_token_balance, submit_and_confirm, LedgerGateway};

/// Wrapped-token balance reported after a wrap
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrappedBalance {
    pub token: Address,
    pub balance: Amount,
    pub receipt: Receipt,
}

/// Wraps native currency into its depositable token form
pub struct AssetWrapper {
    gateway: Arc<dyn LedgerGateway>,
    wrapped_asset: Address,
    confirmations: u64,
}

impl AssetWrapper {
    pub fn new(gateway: Arc<dyn LedgerGateway>, wrapped_asset: Address, confirmations: u64) -> Self {
        Self {
            gateway,
            wrapped_asset,
            confirmations,
        }
    }

    /// Wrap `amount` of native currency and read back the caller's balance.
    ///
    /// Wrapping is assumed fee-free, so the balance grows by exactly `amount`.
    pub async fn wrap(&self, amount: &Amount) -> BorrowflowResult<WrappedBalance> {
        info!("Wrapping {} of native currency into {}", amount, self.wrapped_asset);

        let receipt = submit_and_confirm(
            self.gateway.as_ref(),
            &self.wrapped_asset,
            LedgerCall::WrapNative,
            Some(amount.clone()),
            self.confirmations,
        )
        .await?;

        let owner = self.gateway.sender();
        let balance = read_token_balance(self.gateway.as_ref(), &self.wrapped_asset, &owner).await?;
        info!("Got {} wrapped tokens", format_units(&balance, 6)?);

        Ok(WrappedBalance {
            token: self.wrapped_asset,
            balance,
            receipt,
        })
    }
}
