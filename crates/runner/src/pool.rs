//! Lending pool resolution and pool calls

use std::sync::Arc;

use borrowflow_types::{
    AccountSnapshot, Address, Amount, BorrowflowError, BorrowflowResult, InterestRateMode,
    LedgerCall, LedgerQuery, Receipt,
};
use tracing::{debug, info};

use crate::gateway::{submit_and_confirm, LedgerGateway};

/// Resolves the pool currently registered with an addresses provider
///
/// The registered address is mutable protocol state, so every workflow run
/// resolves it again instead of caching it.
pub struct PoolResolver {
    gateway: Arc<dyn LedgerGateway>,
}

impl PoolResolver {
    pub fn new(gateway: Arc<dyn LedgerGateway>) -> Self {
        Self { gateway }
    }

    pub async fn resolve_pool(
        &self,
        addresses_provider: &Address,
        confirmations: u64,
    ) -> BorrowflowResult<PoolHandle> {
        debug!("Getting lending pool from provider {}", addresses_provider);

        let address = self
            .gateway
            .read_state(addresses_provider, LedgerQuery::LendingPool)
            .await?
            .into_address()?;

        if address.is_zero() {
            return Err(BorrowflowError::ledger_unavailable(&format!(
                "provider {} returned the zero pool address",
                addresses_provider
            )));
        }

        info!("Got lending pool at {}", address);
        Ok(PoolHandle {
            gateway: self.gateway.clone(),
            address,
            confirmations,
        })
    }
}

/// Handle bound to one resolved lending pool
pub struct PoolHandle {
    gateway: Arc<dyn LedgerGateway>,
    address: Address,
    confirmations: u64,
}

impl PoolHandle {
    pub fn address(&self) -> Address {
        self.address
    }

    /// Supply `amount` of `asset` as collateral for `on_behalf_of`
    pub async fn deposit(
        &self,
        asset: &Address,
        amount: &Amount,
        on_behalf_of: &Address,
        referral_code: u16,
    ) -> BorrowflowResult<Receipt> {
        let call = LedgerCall::Deposit {
            asset: *asset,
            amount: amount.clone(),
            on_behalf_of: *on_behalf_of,
            referral_code,
        };
        self.send(call).await
    }

    /// Borrow `amount` of `asset` under `rate_mode`
    pub async fn borrow(
        &self,
        asset: &Address,
        amount: &Amount,
        rate_mode: InterestRateMode,
        referral_code: u16,
        on_behalf_of: &Address,
    ) -> BorrowflowResult<Receipt> {
        let call = LedgerCall::Borrow {
            asset: *asset,
            amount: amount.clone(),
            rate_mode,
            referral_code,
            on_behalf_of: *on_behalf_of,
        };
        self.send(call).await
    }

    /// Repay `amount` of `asset` debt held under `rate_mode`
    pub async fn repay(
        &self,
        asset: &Address,
        amount: &Amount,
        rate_mode: InterestRateMode,
        on_behalf_of: &Address,
    ) -> BorrowflowResult<Receipt> {
        let call = LedgerCall::Repay {
            asset: *asset,
            amount: amount.clone(),
            rate_mode,
            on_behalf_of: *on_behalf_of,
        };
        self.send(call).await
    }

    /// Fresh snapshot of `user`'s position; never cached
    pub async fn account_snapshot(&self, user: &Address) -> BorrowflowResult<AccountSnapshot> {
        let raw = self
            .gateway
            .read_state(&self.address, LedgerQuery::UserAccountData { user: *user })
            .await?
            .into_account_data()?;
        Ok(AccountSnapshot::from(raw))
    }

    async fn send(&self, call: LedgerCall) -> BorrowflowResult<Receipt> {
        submit_and_confirm(self.gateway.as_ref(), &self.address, call, None, self.confirmations).await
    }
}
