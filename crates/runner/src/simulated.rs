//! In-memory lending ledger
//!
//! Implements [`LedgerGateway`] with the semantics of an Aave-V2-style money
//! market: a wrapped native token, ERC20 balances and allowances, an
//! addresses provider pointing at a lending pool, and Chainlink-style price
//! feeds. Submitting only validates locally; the state change is applied
//! when the transaction is awaited, which is when it gets mined.
//!
//! Used by the integration tests and by the binary's `--simulate` mode.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use borrowflow_math::{convert, value_of};
use borrowflow_types::{
    Address, Amount, BorrowflowError, BorrowflowResult, CallKind, InterestRateMode, LedgerCall,
    LedgerQuery, LedgerValue, PendingTransaction, RawAccountData, Receipt, RoundData, TxHash,
    TxStatus, BPS_DENOMINATOR, NATIVE_DECIMALS, WAD_DECIMALS,
};
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

use crate::config::WorkflowConfig;
use crate::gateway::LedgerGateway;

/// What happened to a call on the simulated ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEventKind {
    Submitted,
    Confirmed,
    Reverted,
}

/// Entry in the ordered ledger log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEvent {
    pub kind: LedgerEventKind,
    pub call: CallKind,
    pub target: Address,
    pub block: u64,
}

/// Risk parameters of a pool reserve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveConfig {
    /// Feed pricing one whole token in the common valuation unit
    pub price_feed: Address,
    pub ltv_bps: u64,
    pub liquidation_threshold_bps: u64,
}

#[derive(Debug, Default)]
struct TokenState {
    decimals: u8,
    balances: HashMap<Address, BigUint>,
    allowances: HashMap<(Address, Address), BigUint>,
}

impl TokenState {
    fn balance(&self, owner: &Address) -> BigUint {
        self.balances.get(owner).cloned().unwrap_or_default()
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> BigUint {
        self.allowances.get(&(*owner, *spender)).cloned().unwrap_or_default()
    }

    fn credit(&mut self, owner: &Address, amount: &BigUint) {
        *self.balances.entry(*owner).or_default() += amount;
    }

    /// Move tokens, pulling through `spender`'s allowance when given
    fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: &BigUint,
        spender: Option<&Address>,
    ) -> Result<(), String> {
        if let Some(spender) = spender {
            if self.allowance(from, spender) < *amount {
                return Err("transfer amount exceeds allowance".to_string());
            }
        }
        if self.balance(from) < *amount {
            return Err("transfer amount exceeds balance".to_string());
        }

        if let Some(spender) = spender {
            let allowance = self.allowances.entry((*from, *spender)).or_default();
            *allowance -= amount;
        }
        let balance = self.balances.entry(*from).or_default();
        *balance -= amount;
        self.credit(to, amount);
        Ok(())
    }
}

#[derive(Debug)]
struct FeedState {
    answer: Amount,
    round_id: u64,
    updated_at: u64,
}

#[derive(Debug, Default)]
struct PoolState {
    reserves: HashMap<Address, ReserveConfig>,
    collateral: HashMap<(Address, Address), BigUint>,
    debt: HashMap<(Address, Address, InterestRateMode), BigUint>,
}

#[derive(Debug)]
struct TxRecord {
    sender: Address,
    target: Address,
    call: LedgerCall,
    value: Option<BigUint>,
    status: TxStatus,
    mined_at: Option<u64>,
    revert_reason: Option<String>,
}

#[derive(Debug, Default)]
struct LedgerState {
    block: u64,
    tx_count: u64,
    offline: bool,
    failing_reads: u32,
    forced_reverts: HashMap<CallKind, String>,
    native: HashMap<Address, BigUint>,
    tokens: HashMap<Address, TokenState>,
    wrapped_native: HashSet<Address>,
    providers: HashMap<Address, Address>,
    pools: HashMap<Address, PoolState>,
    feeds: HashMap<Address, FeedState>,
    transactions: HashMap<TxHash, TxRecord>,
    events: Vec<LedgerEvent>,
}

/// Deterministic in-process ledger for tests and dry runs
pub struct SimulatedLedger {
    sender: Address,
    state: Mutex<LedgerState>,
}

impl SimulatedLedger {
    /// Empty ledger at block 1 submitting as `sender`
    pub fn new(sender: Address) -> Self {
        let state = LedgerState {
            block: 1,
            ..LedgerState::default()
        };
        Self {
            sender,
            state: Mutex::new(state),
        }
    }

    /// Ledger pre-populated with the contracts named in `config`
    pub fn seeded(config: &WorkflowConfig, seed: &SimulationSeed) -> BorrowflowResult<Self> {
        let ledger = Self::new(seed.account);

        ledger.fund_native(&seed.account, &Amount::parse(&seed.native_funds, NATIVE_DECIMALS)?);
        ledger.add_wrapped_native(&config.wrapped_asset);
        if config.collateral_asset != config.wrapped_asset {
            ledger.add_token(&config.collateral_asset, WAD_DECIMALS);
        }
        ledger.add_token(&config.borrow_asset, seed.borrow_asset_decimals);

        // Collateral is priced 1:1 against the valuation unit
        let collateral_feed = Address::from_low_u64(0xfeed);
        ledger.add_price_feed(&collateral_feed, &borrowflow_math::one_unit(WAD_DECIMALS));
        ledger.add_price_feed(
            &config.price_feed,
            &Amount::parse(&seed.borrow_asset_price, seed.price_feed_decimals)?,
        );

        ledger.add_pool(&config.addresses_provider, &seed.lending_pool);
        ledger.add_reserve(
            &seed.lending_pool,
            &config.collateral_asset,
            ReserveConfig {
                price_feed: collateral_feed,
                ltv_bps: seed.collateral_ltv_bps,
                liquidation_threshold_bps: seed.collateral_liquidation_threshold_bps,
            },
        );
        ledger.add_reserve(
            &seed.lending_pool,
            &config.borrow_asset,
            ReserveConfig {
                price_feed: config.price_feed,
                ltv_bps: 7_500,
                liquidation_threshold_bps: 8_000,
            },
        );
        ledger.mint(
            &config.borrow_asset,
            &seed.lending_pool,
            &Amount::parse(&seed.pool_liquidity, seed.borrow_asset_decimals)?,
        );

        Ok(ledger)
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ========================================================================
    // Fixture Setup
    // ========================================================================

    pub fn fund_native(&self, account: &Address, amount: &Amount) {
        *self.state().native.entry(*account).or_default() += amount.value();
    }

    pub fn add_token(&self, token: &Address, decimals: u8) {
        self.state().tokens.insert(
            *token,
            TokenState {
                decimals,
                ..TokenState::default()
            },
        );
    }

    /// Register a WETH-style token whose payable deposit wraps native value
    pub fn add_wrapped_native(&self, token: &Address) {
        self.add_token(token, NATIVE_DECIMALS);
        self.state().wrapped_native.insert(*token);
    }

    pub fn mint(&self, token: &Address, owner: &Address, amount: &Amount) {
        if let Some(state) = self.state().tokens.get_mut(token) {
            state.credit(owner, amount.value());
        }
    }

    /// Register a price feed; its precision is the answer's precision
    pub fn add_price_feed(&self, feed: &Address, answer: &Amount) {
        let mut state = self.state();
        let updated_at = state.block;
        state.feeds.insert(
            *feed,
            FeedState {
                answer: answer.clone(),
                round_id: 1,
                updated_at,
            },
        );
    }

    /// Publish a new round on an existing feed
    pub fn set_feed_answer(&self, feed: &Address, answer: &Amount) {
        let mut state = self.state();
        let block = state.block;
        if let Some(feed) = state.feeds.get_mut(feed) {
            feed.answer = answer.clone();
            feed.round_id += 1;
            feed.updated_at = block;
        }
    }

    /// Create a pool and point `provider` at it
    pub fn add_pool(&self, provider: &Address, pool: &Address) {
        let mut state = self.state();
        state.pools.entry(*pool).or_default();
        state.providers.insert(*provider, *pool);
    }

    /// Re-point `provider` at another pool, as a protocol upgrade would
    pub fn set_provider_pool(&self, provider: &Address, pool: &Address) {
        self.add_pool(provider, pool);
    }

    pub fn add_reserve(&self, pool: &Address, asset: &Address, reserve: ReserveConfig) {
        self.state()
            .pools
            .entry(*pool)
            .or_default()
            .reserves
            .insert(*asset, reserve);
    }

    // ========================================================================
    // Failure Injection
    // ========================================================================

    /// Fail the next `count` reads with `LedgerUnavailable`
    pub fn fail_next_reads(&self, count: u32) {
        self.state().failing_reads = count;
    }

    /// Take the whole ledger offline or back online
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    /// Make the next mined call of `kind` revert with `reason`
    pub fn revert_next(&self, kind: CallKind, reason: &str) {
        self.state().forced_reverts.insert(kind, reason.to_string());
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Ordered log of submissions and their outcomes
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.state().events.clone()
    }

    /// Kinds of every submitted call, in submission order
    pub fn submitted_calls(&self) -> Vec<CallKind> {
        self.state()
            .events
            .iter()
            .filter(|event| event.kind == LedgerEventKind::Submitted)
            .map(|event| event.call)
            .collect()
    }

    pub fn block_number(&self) -> u64 {
        self.state().block
    }

    pub fn native_balance(&self, account: &Address) -> Amount {
        let value = self.state().native.get(account).cloned().unwrap_or_default();
        Amount::new(value, NATIVE_DECIMALS)
    }

    pub fn token_balance(&self, token: &Address, owner: &Address) -> Option<Amount> {
        let state = self.state();
        state
            .tokens
            .get(token)
            .map(|token| Amount::new(token.balance(owner), token.decimals))
    }

    pub fn collateral(&self, pool: &Address, user: &Address, asset: &Address) -> BigUint {
        self.state()
            .pools
            .get(pool)
            .and_then(|pool| pool.collateral.get(&(*user, *asset)).cloned())
            .unwrap_or_default()
    }

    pub fn debt(
        &self,
        pool: &Address,
        user: &Address,
        asset: &Address,
        mode: InterestRateMode,
    ) -> BigUint {
        self.state()
            .pools
            .get(pool)
            .and_then(|pool| pool.debt.get(&(*user, *asset, mode)).cloned())
            .unwrap_or_default()
    }
}

impl LedgerState {
    fn record(&mut self, kind: LedgerEventKind, call: CallKind, target: Address) {
        let block = self.block;
        self.events.push(LedgerEvent {
            kind,
            call,
            target,
            block,
        });
    }

    fn token_decimals(&self, token: &Address) -> Option<u8> {
        self.tokens.get(token).map(|token| token.decimals)
    }

    /// Local checks a node performs before accepting a transaction
    fn validate_submission(
        &self,
        sender: &Address,
        target: &Address,
        call: &LedgerCall,
        value: Option<&Amount>,
    ) -> BorrowflowResult<()> {
        let name = call.kind().to_string();
        let reject = |reason: &str| Err(BorrowflowError::submission_rejected(&name, reason));

        if target.is_zero() {
            return reject("target is the zero address");
        }
        if value.is_some() && !call.is_payable() {
            return reject("call is not payable but carries value");
        }

        let (asset, amount) = match call {
            LedgerCall::WrapNative => {
                let Some(value) = value.filter(|value| !value.is_zero()) else {
                    return reject("wrap requires a non-zero value");
                };
                if value.decimals() != NATIVE_DECIMALS {
                    return reject("value must be expressed at native precision");
                }
                let funds = self.native.get(sender).cloned().unwrap_or_default();
                if funds < *value.value() {
                    return reject("insufficient funds for value");
                }
                return Ok(());
            }
            LedgerCall::Approve { spender, amount } => {
                if spender.is_zero() {
                    return reject("spender is the zero address");
                }
                (target, amount)
            }
            LedgerCall::Deposit {
                asset,
                amount,
                on_behalf_of,
                ..
            }
            | LedgerCall::Borrow {
                asset,
                amount,
                on_behalf_of,
                ..
            }
            | LedgerCall::Repay {
                asset,
                amount,
                on_behalf_of,
                ..
            } => {
                if asset.is_zero() || on_behalf_of.is_zero() {
                    return reject("asset or beneficiary is the zero address");
                }
                (asset, amount)
            }
        };

        if let Some(decimals) = self.token_decimals(asset) {
            if decimals != amount.decimals() {
                return reject(&format!(
                    "amount has {} decimals but token uses {}",
                    amount.decimals(),
                    decimals
                ));
            }
        }
        Ok(())
    }

    /// Price of one whole `asset` token at WAD precision
    fn reserve_price(&self, reserve: &ReserveConfig) -> Result<Amount, String> {
        let feed = self
            .feeds
            .get(&reserve.price_feed)
            .ok_or_else(|| "reserve price feed missing".to_string())?;
        convert(&feed.answer, WAD_DECIMALS).map_err(|e| e.to_string())
    }

    fn account_data(&self, pool_address: &Address, user: &Address) -> Result<RawAccountData, String> {
        let pool = self
            .pools
            .get(pool_address)
            .ok_or_else(|| "call to non-contract".to_string())?;

        let mut total_collateral = BigUint::zero();
        let mut weighted_ltv = BigUint::zero();
        let mut weighted_threshold = BigUint::zero();
        let mut total_debt = BigUint::zero();

        for ((owner, asset), amount) in &pool.collateral {
            if owner != user || amount.is_zero() {
                continue;
            }
            let (reserve, value) = self.reserve_value(pool, asset, amount)?;
            weighted_ltv += &value * reserve.ltv_bps;
            weighted_threshold += &value * reserve.liquidation_threshold_bps;
            total_collateral += value;
        }

        for ((owner, asset, _), amount) in &pool.debt {
            if owner != user || amount.is_zero() {
                continue;
            }
            let (_, value) = self.reserve_value(pool, asset, amount)?;
            total_debt += value;
        }

        let bps = BigUint::from(BPS_DENOMINATOR);
        let max_borrow = &weighted_ltv / &bps;
        let available = if max_borrow > total_debt {
            &max_borrow - &total_debt
        } else {
            BigUint::zero()
        };

        let (ltv, threshold) = if total_collateral.is_zero() {
            (0, 0)
        } else {
            (
                bps_to_u64(&weighted_ltv / &total_collateral),
                bps_to_u64(&weighted_threshold / &total_collateral),
            )
        };

        let health_factor = if total_debt.is_zero() {
            (BigUint::from(1u8) << 256u32) - 1u8
        } else {
            &weighted_threshold * borrowflow_math::pow10(u32::from(WAD_DECIMALS)) / (&bps * &total_debt)
        };

        Ok(RawAccountData {
            total_collateral_eth: total_collateral,
            total_debt_eth: total_debt,
            available_borrows_eth: available,
            current_liquidation_threshold: threshold,
            ltv,
            health_factor,
        })
    }

    fn reserve_value<'a>(
        &self,
        pool: &'a PoolState,
        asset: &Address,
        amount: &BigUint,
    ) -> Result<(&'a ReserveConfig, BigUint), String> {
        let reserve = pool
            .reserves
            .get(asset)
            .ok_or_else(|| "reserve not active".to_string())?;
        let decimals = self
            .token_decimals(asset)
            .ok_or_else(|| "reserve token missing".to_string())?;
        let price = self.reserve_price(reserve)?;
        let value = value_of(&Amount::new(amount.clone(), decimals), &price, WAD_DECIMALS)
            .map_err(|e| e.to_string())?;
        Ok((reserve, value.value().clone()))
    }

    /// Apply a mined call; every check runs before any state changes
    fn execute(
        &mut self,
        sender: &Address,
        target: &Address,
        call: &LedgerCall,
        value: Option<&BigUint>,
    ) -> Result<(), String> {
        match call {
            LedgerCall::WrapNative => {
                if !self.wrapped_native.contains(target) {
                    return Err("contract has no payable deposit".to_string());
                }
                let value = value.cloned().unwrap_or_default();
                let funds = self.native.entry(*sender).or_default();
                if *funds < value {
                    return Err("insufficient native balance".to_string());
                }
                *funds -= &value;
                let token = self
                    .tokens
                    .get_mut(target)
                    .ok_or_else(|| "call to non-contract".to_string())?;
                token.credit(sender, &value);
                Ok(())
            }

            LedgerCall::Approve { spender, amount } => {
                let token = self
                    .tokens
                    .get_mut(target)
                    .ok_or_else(|| "call to non-contract".to_string())?;
                token
                    .allowances
                    .insert((*sender, *spender), amount.value().clone());
                Ok(())
            }

            LedgerCall::Deposit {
                asset,
                amount,
                on_behalf_of,
                ..
            } => {
                if amount.is_zero() {
                    return Err("invalid amount".to_string());
                }
                let pool = self
                    .pools
                    .get(target)
                    .ok_or_else(|| "call to non-contract".to_string())?;
                if !pool.reserves.contains_key(asset) {
                    return Err("reserve not active".to_string());
                }

                let token = self
                    .tokens
                    .get_mut(asset)
                    .ok_or_else(|| "reserve token missing".to_string())?;
                token.transfer(sender, target, amount.value(), Some(target))?;

                let pool = self
                    .pools
                    .get_mut(target)
                    .ok_or_else(|| "call to non-contract".to_string())?;
                *pool.collateral.entry((*on_behalf_of, *asset)).or_default() += amount.value();
                Ok(())
            }

            LedgerCall::Borrow {
                asset,
                amount,
                rate_mode,
                on_behalf_of,
                ..
            } => {
                if amount.is_zero() {
                    return Err("invalid amount".to_string());
                }
                if on_behalf_of != sender {
                    return Err("borrow allowance not enough".to_string());
                }

                let account = self.account_data(target, on_behalf_of)?;
                let pool = self
                    .pools
                    .get(target)
                    .ok_or_else(|| "call to non-contract".to_string())?;
                let reserve = pool
                    .reserves
                    .get(asset)
                    .ok_or_else(|| "reserve not active".to_string())?;
                let price = self.reserve_price(reserve)?;
                let requested = value_of(amount, &price, WAD_DECIMALS).map_err(|e| e.to_string())?;
                if *requested.value() > account.available_borrows_eth {
                    return Err("collateral cannot cover new borrow".to_string());
                }

                let token = self
                    .tokens
                    .get_mut(asset)
                    .ok_or_else(|| "reserve token missing".to_string())?;
                if token.balance(target) < *amount.value() {
                    return Err("not enough available liquidity".to_string());
                }
                token.transfer(target, sender, amount.value(), None)?;

                let pool = self
                    .pools
                    .get_mut(target)
                    .ok_or_else(|| "call to non-contract".to_string())?;
                *pool
                    .debt
                    .entry((*on_behalf_of, *asset, *rate_mode))
                    .or_default() += amount.value();
                Ok(())
            }

            LedgerCall::Repay {
                asset,
                amount,
                rate_mode,
                on_behalf_of,
            } => {
                if amount.is_zero() {
                    return Err("invalid amount".to_string());
                }
                let pool = self
                    .pools
                    .get(target)
                    .ok_or_else(|| "call to non-contract".to_string())?;
                let outstanding = pool
                    .debt
                    .get(&(*on_behalf_of, *asset, *rate_mode))
                    .cloned()
                    .unwrap_or_default();
                if outstanding.is_zero() {
                    return Err(format!("no debt of selected type ({})", rate_mode));
                }
                let payback = if *amount.value() < outstanding {
                    amount.value().clone()
                } else {
                    outstanding
                };

                let token = self
                    .tokens
                    .get_mut(asset)
                    .ok_or_else(|| "reserve token missing".to_string())?;
                token.transfer(sender, target, &payback, Some(target))?;

                let pool = self
                    .pools
                    .get_mut(target)
                    .ok_or_else(|| "call to non-contract".to_string())?;
                let debt = pool
                    .debt
                    .entry((*on_behalf_of, *asset, *rate_mode))
                    .or_default();
                *debt -= &payback;
                Ok(())
            }
        }
    }
}

fn bps_to_u64(value: BigUint) -> u64 {
    value.to_u64().unwrap_or(u64::MAX)
}

#[async_trait]
impl LedgerGateway for SimulatedLedger {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn read_state(&self, target: &Address, query: LedgerQuery) -> BorrowflowResult<LedgerValue> {
        let mut state = self.state();
        if state.offline {
            return Err(BorrowflowError::ledger_unavailable("ledger offline"));
        }
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(BorrowflowError::ledger_unavailable("connection reset by peer"));
        }

        let non_contract =
            || BorrowflowError::ledger_unavailable(&format!("call to non-contract {}", target));

        match query {
            LedgerQuery::BalanceOf { owner } => {
                let token = state.tokens.get(target).ok_or_else(non_contract)?;
                Ok(LedgerValue::Uint(token.balance(&owner)))
            }
            LedgerQuery::Allowance { owner, spender } => {
                let token = state.tokens.get(target).ok_or_else(non_contract)?;
                Ok(LedgerValue::Uint(token.allowance(&owner, &spender)))
            }
            LedgerQuery::Decimals => {
                if let Some(token) = state.tokens.get(target) {
                    return Ok(LedgerValue::Decimals(token.decimals));
                }
                let feed = state.feeds.get(target).ok_or_else(non_contract)?;
                Ok(LedgerValue::Decimals(feed.answer.decimals()))
            }
            LedgerQuery::LendingPool => {
                let pool = state.providers.get(target).ok_or_else(non_contract)?;
                Ok(LedgerValue::Address(*pool))
            }
            LedgerQuery::UserAccountData { user } => state
                .account_data(target, &user)
                .map(LedgerValue::AccountData)
                .map_err(|reason| BorrowflowError::ledger_unavailable(&reason)),
            LedgerQuery::LatestRoundData => {
                let feed = state.feeds.get(target).ok_or_else(non_contract)?;
                Ok(LedgerValue::Round(RoundData {
                    round_id: feed.round_id,
                    answer: feed.answer.value().clone(),
                    updated_at: feed.updated_at,
                }))
            }
        }
    }

    async fn submit(
        &self,
        target: &Address,
        call: LedgerCall,
        value: Option<Amount>,
    ) -> BorrowflowResult<PendingTransaction> {
        let mut state = self.state();
        if state.offline {
            return Err(BorrowflowError::ledger_unavailable("ledger offline"));
        }
        state.validate_submission(&self.sender, target, &call, value.as_ref())?;

        state.tx_count += 1;
        let hash = TxHash(format!("0x{:064x}", state.tx_count));
        let submitted_at_block = state.block;

        state.record(LedgerEventKind::Submitted, call.kind(), *target);
        state.transactions.insert(
            hash.clone(),
            TxRecord {
                sender: self.sender,
                target: *target,
                call: call.clone(),
                value: value.map(|value| value.value().clone()),
                status: TxStatus::Pending,
                mined_at: None,
                revert_reason: None,
            },
        );

        Ok(PendingTransaction {
            hash,
            target: *target,
            call,
            submitted_at_block,
        })
    }

    async fn await_confirmation(
        &self,
        tx: &PendingTransaction,
        confirmations: u64,
    ) -> BorrowflowResult<Receipt> {
        let outcome = {
            let mut state = self.state();
            if state.offline {
                return Err(BorrowflowError::ledger_unavailable("ledger offline"));
            }

            let (sender, target, call, value, status) = {
                let record = state.transactions.get(&tx.hash).ok_or_else(|| {
                    BorrowflowError::ledger_unavailable(&format!("unknown transaction {}", tx.hash))
                })?;
                (
                    record.sender,
                    record.target,
                    record.call.clone(),
                    record.value.clone(),
                    record.status,
                )
            };

            if status == TxStatus::Pending {
                state.block += 1;
                let mined_at = state.block;
                let kind = call.kind();

                let result = match state.forced_reverts.remove(&kind) {
                    Some(reason) => Err(reason),
                    None => state.execute(&sender, &target, &call, value.as_ref()),
                };

                let (status, event) = match &result {
                    Ok(()) => (TxStatus::Confirmed, LedgerEventKind::Confirmed),
                    Err(_) => (TxStatus::Failed, LedgerEventKind::Reverted),
                };
                state.record(event, kind, target);

                if let Some(record) = state.transactions.get_mut(&tx.hash) {
                    record.status = status;
                    record.mined_at = Some(mined_at);
                    record.revert_reason = result.err();
                }
            }

            let record = state.transactions.get(&tx.hash).ok_or_else(|| {
                BorrowflowError::ledger_unavailable(&format!("unknown transaction {}", tx.hash))
            })?;
            let mined_at = record.mined_at.unwrap_or(state.block);
            let status = record.status;
            let revert_reason = record.revert_reason.clone();

            // Wait out the requested depth
            let depth_block = mined_at + confirmations.max(1) - 1;
            if state.block < depth_block {
                state.block = depth_block;
            }

            match status {
                TxStatus::Failed => Err(BorrowflowError::reverted(
                    &tx.hash.0,
                    revert_reason.as_deref().unwrap_or("execution reverted"),
                )),
                _ => Ok(Receipt {
                    hash: tx.hash.clone(),
                    block_number: mined_at,
                    confirmations: state.block - mined_at + 1,
                    status,
                }),
            }
        };

        tokio::task::yield_now().await;
        outcome
    }
}

// ============================================================================
// Seeded Environment
// ============================================================================

/// Parameters for the pre-populated ledger used by `--simulate`
///
/// Big numbers are base-unit strings since TOML integers stop at i64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSeed {
    /// Account the simulated gateway signs as
    pub account: Address,

    /// Native balance of `account` (18 decimals)
    pub native_funds: String,

    /// Pool the addresses provider initially points at
    pub lending_pool: Address,

    pub borrow_asset_decimals: u8,

    /// Feed answer: valuation units per whole borrow-asset token
    pub borrow_asset_price: String,

    pub price_feed_decimals: u8,

    pub collateral_ltv_bps: u64,

    pub collateral_liquidation_threshold_bps: u64,

    /// Borrow-asset liquidity held by the pool (borrow-asset base units)
    pub pool_liquidity: String,
}

impl Default for SimulationSeed {
    fn default() -> Self {
        Self {
            // First default hardhat account
            account: Address::from_bytes([
                0xf3, 0x9f, 0xd6, 0xe5, 0x1a, 0xad, 0x88, 0xf6, 0xf4, 0xce, 0x6a, 0xb8, 0x82,
                0x72, 0x79, 0xcf, 0xff, 0xb9, 0x22, 0x66,
            ]),
            native_funds: "10000000000000000000000".to_string(), // 10,000 ETH
            // Aave V2 mainnet LendingPool
            lending_pool: Address::from_bytes([
                0x7d, 0x27, 0x68, 0xde, 0x32, 0xb0, 0xb8, 0x0b, 0x7a, 0x34, 0x54, 0xc0, 0x6b,
                0xda, 0xc9, 0x4a, 0x69, 0xdd, 0xc7, 0xa9,
            ]),
            borrow_asset_decimals: 6,
            borrow_asset_price: "5000000000000000".to_string(), // 0.005 ETH
            price_feed_decimals: 18,
            collateral_ltv_bps: 5_000,
            collateral_liquidation_threshold_bps: 8_250,
            pool_liquidity: "1000000000000".to_string(), // 1,000,000 tokens
        }
    }
}
