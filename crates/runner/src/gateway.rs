//! Ledger gateway port
//!
//! The workflow talks to the lending ledger only through [`LedgerGateway`].
//! Transport and signing live behind the trait; tests and the `--simulate`
//! mode plug in [`crate::simulated::SimulatedLedger`].

use async_trait::async_trait;
use borrowflow_types::{
    Address, Amount, BorrowflowResult, LedgerCall, LedgerQuery, LedgerValue, PendingTransaction,
    Receipt,
};
use tracing::debug;

/// Read, submit and confirm operations against the external ledger
///
/// No retries happen at this layer. Every error is handed to the caller.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Account the gateway signs and submits as
    fn sender(&self) -> Address;

    /// Read contract or account state; `LedgerUnavailable` on connectivity loss
    async fn read_state(&self, target: &Address, query: LedgerQuery) -> BorrowflowResult<LedgerValue>;

    /// Submit a state-changing call, optionally carrying native value.
    ///
    /// Fails with `SubmissionRejected` when the call is locally invalid.
    async fn submit(
        &self,
        target: &Address,
        call: LedgerCall,
        value: Option<Amount>,
    ) -> BorrowflowResult<PendingTransaction>;

    /// Suspend until `tx` has `confirmations` blocks on top of it.
    ///
    /// Fails with `TransactionReverted` when the ledger rejected the call.
    async fn await_confirmation(
        &self,
        tx: &PendingTransaction,
        confirmations: u64,
    ) -> BorrowflowResult<Receipt>;
}

/// Submit `call` and wait for it to reach a terminal state.
///
/// The pending handle never escapes, so a submitted transaction is always
/// awaited before the caller can move on or give up.
pub async fn submit_and_confirm(
    gateway: &dyn LedgerGateway,
    target: &Address,
    call: LedgerCall,
    value: Option<Amount>,
    confirmations: u64,
) -> BorrowflowResult<Receipt> {
    let kind = call.kind();
    let pending = gateway.submit(target, call, value).await?;
    debug!("Submitted {} to {}, tx: {}", kind, target, pending.hash);

    let receipt = gateway.await_confirmation(&pending, confirmations).await?;
    debug!(
        "Confirmed {} in block {} ({} confirmations)",
        receipt.hash, receipt.block_number, receipt.confirmations
    );
    Ok(receipt)
}

/// `decimals()` of a token or price feed
pub async fn read_decimals(gateway: &dyn LedgerGateway, target: &Address) -> BorrowflowResult<u8> {
    gateway.read_state(target, LedgerQuery::Decimals).await?.into_decimals()
}

/// `balanceOf(owner)` at the token's own precision
pub async fn read_token_balance(
    gateway: &dyn LedgerGateway,
    token: &Address,
    owner: &Address,
) -> BorrowflowResult<Amount> {
    let decimals = read_decimals(gateway, token).await?;
    let raw = gateway
        .read_state(token, LedgerQuery::BalanceOf { owner: *owner })
        .await?
        .into_uint()?;
    Ok(Amount::new(raw, decimals))
}

/// `allowance(owner, spender)` at the token's own precision
pub async fn read_allowance(
    gateway: &dyn LedgerGateway,
    token: &Address,
    owner: &Address,
    spender: &Address,
) -> BorrowflowResult<Amount> {
    let decimals = read_decimals(gateway, token).await?;
    let raw = gateway
        .read_state(
            token,
            LedgerQuery::Allowance {
                owner: *owner,
                spender: *spender,
            },
        )
        .await?
        .into_uint()?;
    Ok(Amount::new(raw, decimals))
}
