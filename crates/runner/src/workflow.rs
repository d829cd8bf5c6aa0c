//! Wrap, deposit, borrow and repay workflow
//!
//! A strictly sequential state machine. Each transition runs exactly one
//! ledger operation and waits for it to confirm before the next begins. Any
//! failure aborts the run where it happened; nothing already confirmed is
//! unwound.

use std::fmt;
use std::sync::Arc;

use borrowflow_math::{borrowable_amount, convert, format_units};
use borrowflow_types::{
    AccountSnapshot, Address, Amount, BorrowflowError, InterestRateMode, PriceQuote, Receipt,
    WAD_DECIMALS,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::authorization::Authorizer;
use crate::config::WorkflowConfig;
use crate::error::WorkflowError;
use crate::gateway::{read_decimals, read_token_balance, LedgerGateway};
use crate::oracle::PriceOracle;
use crate::pool::PoolResolver;
use crate::wrapper::AssetWrapper;

/// Position of a workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WorkflowState {
    Start,
    Wrapped,
    PoolResolved,
    CollateralAuthorized,
    Deposited,
    CapacityRead,
    PriceRead,
    BorrowComputed,
    Borrowed,
    RepayAuthorized,
    Repaid,
    Done,
}

impl WorkflowState {
    /// Legal successors of this state
    pub fn successors(&self) -> &'static [WorkflowState] {
        use WorkflowState::*;
        match self {
            Start => &[Wrapped],
            Wrapped => &[PoolResolved],
            PoolResolved => &[CollateralAuthorized],
            CollateralAuthorized => &[Deposited],
            Deposited => &[CapacityRead],
            CapacityRead => &[PriceRead],
            PriceRead => &[BorrowComputed],
            // Zero capacity finishes without borrowing
            BorrowComputed => &[Borrowed, Done],
            Borrowed => &[RepayAuthorized, Done],
            RepayAuthorized => &[Repaid],
            Repaid => &[Done],
            Done => &[],
        }
    }

    pub fn can_transition_to(&self, next: WorkflowState) -> bool {
        self.successors().contains(&next)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Everything observed during a completed run
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    pub final_state: WorkflowState,
    pub wrapped_balance: Amount,
    pub pool: Address,
    pub collateral_deposited: Amount,
    pub snapshot_after_deposit: AccountSnapshot,
    pub price: PriceQuote,
    pub borrow_amount: Amount,
    pub snapshot_after_borrow: Option<AccountSnapshot>,
    pub snapshot_after_repay: Option<AccountSnapshot>,
    pub receipts: Vec<Receipt>,
}

/// Orchestrates one wrap → deposit → borrow → repay run
pub struct PositionWorkflow {
    gateway: Arc<dyn LedgerGateway>,
    config: WorkflowConfig,
    repay_mode: InterestRateMode,
    state: WorkflowState,
}

impl PositionWorkflow {
    pub fn new(gateway: Arc<dyn LedgerGateway>, config: WorkflowConfig) -> Self {
        let repay_mode = config.interest_rate_mode;
        Self {
            gateway,
            config,
            repay_mode,
            state: WorkflowState::Start,
        }
    }

    /// Repay under a different rate mode than the borrow used.
    ///
    /// The pool rejects a repay whose mode holds no debt, so this only
    /// exists to exercise that rejection.
    pub fn with_repay_mode(mut self, mode: InterestRateMode) -> Self {
        self.repay_mode = mode;
        self
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// Run every step in order, stopping at the first failure.
    ///
    /// Not cancellation-safe: each submitted transaction is awaited to a
    /// terminal state before the next step starts.
    pub async fn run(&mut self) -> Result<WorkflowReport, WorkflowError> {
        if self.state != WorkflowState::Start {
            return Err(WorkflowError::new(
                self.state,
                None,
                BorrowflowError::invalid_configuration("workflow", "a workflow runs only once"),
            ));
        }

        let config = self.config.clone();
        let account = self.gateway.sender();
        let confirmations = config.confirmations;
        let mut receipts = Vec::new();

        // Wrap
        let wrapper = AssetWrapper::new(self.gateway.clone(), config.wrapped_asset, confirmations);
        let wrapped = wrapper
            .wrap(&config.wrap_amount)
            .await
            .map_err(at(WorkflowState::Wrapped, Some(config.wrapped_asset)))?;
        receipts.push(wrapped.receipt.clone());
        self.advance(WorkflowState::Wrapped);

        // Resolve pool
        let pool = PoolResolver::new(self.gateway.clone())
            .resolve_pool(&config.addresses_provider, confirmations)
            .await
            .map_err(at(WorkflowState::PoolResolved, Some(config.addresses_provider)))?;
        self.advance(WorkflowState::PoolResolved);

        // Authorize collateral
        let collateral = if config.collateral_asset == config.wrapped_asset {
            wrapped.balance.clone()
        } else {
            read_token_balance(self.gateway.as_ref(), &config.collateral_asset, &account)
                .await
                .map_err(at(WorkflowState::CollateralAuthorized, Some(config.collateral_asset)))?
        };
        let authorizer = Authorizer::new(self.gateway.clone(), confirmations);
        let receipt = authorizer
            .authorize(&config.collateral_asset, &pool.address(), &collateral)
            .await
            .map_err(at(WorkflowState::CollateralAuthorized, Some(config.collateral_asset)))?;
        receipts.push(receipt);
        self.advance(WorkflowState::CollateralAuthorized);

        // Deposit
        info!("Depositing {} of {}", collateral, config.collateral_asset);
        let receipt = pool
            .deposit(&config.collateral_asset, &collateral, &account, config.referral_code)
            .await
            .map_err(at(WorkflowState::Deposited, Some(config.collateral_asset)))?;
        receipts.push(receipt);
        self.advance(WorkflowState::Deposited);
        info!("Deposited!");

        // Read capacity
        let snapshot = pool
            .account_snapshot(&account)
            .await
            .map_err(at(WorkflowState::CapacityRead, Some(pool.address())))?;
        log_snapshot(&snapshot);
        self.advance(WorkflowState::CapacityRead);

        // Read price
        let price = PriceOracle::new(self.gateway.clone())
            .latest_price(&config.price_feed)
            .await
            .map_err(at(WorkflowState::PriceRead, Some(config.borrow_asset)))?;
        self.advance(WorkflowState::PriceRead);

        // Compute borrow amount
        let asset_decimals = read_decimals(self.gateway.as_ref(), &config.borrow_asset)
            .await
            .map_err(at(WorkflowState::BorrowComputed, Some(config.borrow_asset)))?;
        let borrow_amount = borrowable_amount(&snapshot.available_borrows, &price.answer, asset_decimals)
            .map_err(at(WorkflowState::BorrowComputed, Some(config.borrow_asset)))?;
        self.advance(WorkflowState::BorrowComputed);
        info!("You can borrow {} of {}", borrow_amount, config.borrow_asset);

        let mut report = WorkflowReport {
            final_state: WorkflowState::BorrowComputed,
            wrapped_balance: wrapped.balance,
            pool: pool.address(),
            collateral_deposited: collateral,
            snapshot_after_deposit: snapshot,
            price,
            borrow_amount: borrow_amount.clone(),
            snapshot_after_borrow: None,
            snapshot_after_repay: None,
            receipts,
        };

        if borrow_amount.is_zero() {
            warn!("No borrowing capacity available, skipping borrow");
            self.advance(WorkflowState::Done);
            report.final_state = self.state;
            return Ok(report);
        }

        // Borrow
        info!(
            "Borrowing {} of {} ({} rate)",
            borrow_amount, config.borrow_asset, config.interest_rate_mode
        );
        let receipt = pool
            .borrow(
                &config.borrow_asset,
                &borrow_amount,
                config.interest_rate_mode,
                config.referral_code,
                &account,
            )
            .await
            .map_err(at(WorkflowState::Borrowed, Some(config.borrow_asset)))?;
        report.receipts.push(receipt);
        self.advance(WorkflowState::Borrowed);
        info!("Borrowed!");

        let snapshot = pool
            .account_snapshot(&account)
            .await
            .map_err(at(WorkflowState::Borrowed, Some(pool.address())))?;
        log_snapshot(&snapshot);
        report.snapshot_after_borrow = Some(snapshot);

        if !config.repay {
            self.advance(WorkflowState::Done);
            report.final_state = self.state;
            return Ok(report);
        }

        // Authorize repay
        let receipt = authorizer
            .authorize(&config.borrow_asset, &pool.address(), &borrow_amount)
            .await
            .map_err(at(WorkflowState::RepayAuthorized, Some(config.borrow_asset)))?;
        report.receipts.push(receipt);
        self.advance(WorkflowState::RepayAuthorized);

        // Repay
        info!("Repaying {} of {} ({} rate)", borrow_amount, config.borrow_asset, self.repay_mode);
        let receipt = pool
            .repay(&config.borrow_asset, &borrow_amount, self.repay_mode, &account)
            .await
            .map_err(at(WorkflowState::Repaid, Some(config.borrow_asset)))?;
        report.receipts.push(receipt);
        self.advance(WorkflowState::Repaid);
        info!("Repaid!");

        let snapshot = pool
            .account_snapshot(&account)
            .await
            .map_err(at(WorkflowState::Repaid, Some(pool.address())))?;
        log_snapshot(&snapshot);
        report.snapshot_after_repay = Some(snapshot);

        self.advance(WorkflowState::Done);
        report.final_state = self.state;
        Ok(report)
    }

    fn advance(&mut self, next: WorkflowState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!("Workflow {} -> {}", self.state, next);
        self.state = next;
    }
}

fn at(step: WorkflowState, asset: Option<Address>) -> impl FnOnce(BorrowflowError) -> WorkflowError {
    move |source| WorkflowError::new(step, asset, source)
}

fn log_snapshot(snapshot: &AccountSnapshot) {
    let show = |amount: &Amount| {
        convert(amount, WAD_DECIMALS)
            .and_then(|amount| format_units(&amount, 6))
            .unwrap_or_else(|_| amount.to_string())
    };
    info!("You have {} worth of ETH deposited.", show(&snapshot.total_collateral));
    info!("You have {} worth of ETH borrowed.", show(&snapshot.total_debt));
    info!("You can borrow {} worth of ETH.", show(&snapshot.available_borrows));
}
