//! End-to-end workflow runs against the in-memory ledger

use std::sync::Arc;

use borrowflow_runner::{
    BorrowflowConfig, LedgerEventKind, PositionWorkflow, ReserveConfig, SimulatedLedger,
    SimulationSeed, WorkflowConfig, WorkflowState,
};
use borrowflow_types::{Address, Amount, BorrowflowError, CallKind, InterestRateMode};
use num_bigint::BigUint;

// ============================================================================
// Fixtures
// ============================================================================

fn setup(seed: SimulationSeed) -> (Arc<SimulatedLedger>, WorkflowConfig) {
    let config = BorrowflowConfig {
        simulation: seed,
        ..BorrowflowConfig::default()
    };
    let workflow_config = config.workflow_config().expect("default config resolves");
    let ledger = SimulatedLedger::seeded(&workflow_config, &config.simulation)
        .expect("seeded ledger builds");
    (Arc::new(ledger), workflow_config)
}

fn default_setup() -> (Arc<SimulatedLedger>, WorkflowConfig) {
    setup(SimulationSeed::default())
}

fn position(
    ledger: &SimulatedLedger,
    pool: &Address,
    config: &WorkflowConfig,
    mode: InterestRateMode,
) -> BigUint {
    ledger.debt(pool, &SimulationSeed::default().account, &config.borrow_asset, mode)
}

// ============================================================================
// Happy Path
// ============================================================================

#[tokio::test]
async fn test_full_run_borrows_and_repays() {
    let (ledger, config) = default_setup();
    let seed = SimulationSeed::default();
    let mut workflow = PositionWorkflow::new(ledger.clone(), config.clone());

    let report = workflow.run().await.expect("workflow succeeds");

    assert_eq!(report.final_state, WorkflowState::Done);
    assert_eq!(workflow.state(), WorkflowState::Done);
    assert_eq!(report.pool, seed.lending_pool);
    assert_eq!(report.wrapped_balance, Amount::from_u128(100_000_000_000_000_000, 18));

    // 0.05 ETH of capacity at 0.005 ETH per token is 10 tokens
    assert_eq!(report.borrow_amount, Amount::from_u128(10_000_000, 6));

    let after_borrow = report.snapshot_after_borrow.expect("borrow snapshot");
    assert!(!after_borrow.total_debt.is_zero());
    let after_repay = report.snapshot_after_repay.expect("repay snapshot");
    assert!(after_repay.total_debt.is_zero());

    assert_eq!(
        position(&ledger, &seed.lending_pool, &config, InterestRateMode::Stable),
        BigUint::from(0u8)
    );
    assert_eq!(
        ledger.collateral(&seed.lending_pool, &seed.account, &config.collateral_asset),
        BigUint::from(100_000_000_000_000_000u128)
    );

    assert_eq!(
        ledger.submitted_calls(),
        vec![
            CallKind::WrapNative,
            CallKind::Approve,
            CallKind::Deposit,
            CallKind::Borrow,
            CallKind::Approve,
            CallKind::Repay,
        ]
    );
    assert_eq!(report.receipts.len(), 6);
}

#[tokio::test]
async fn test_every_submission_confirms_before_the_next() {
    let (ledger, config) = default_setup();
    let mut workflow = PositionWorkflow::new(ledger.clone(), config);
    workflow.run().await.expect("workflow succeeds");

    let events = ledger.events();
    let kinds: Vec<LedgerEventKind> = events.iter().map(|event| event.kind).collect();
    for pair in kinds.chunks(2) {
        assert_eq!(pair, [LedgerEventKind::Submitted, LedgerEventKind::Confirmed]);
    }

    let deposit_confirmed = events
        .iter()
        .position(|e| e.call == CallKind::Deposit && e.kind == LedgerEventKind::Confirmed)
        .expect("deposit confirmed");
    let borrow_submitted = events
        .iter()
        .position(|e| e.call == CallKind::Borrow && e.kind == LedgerEventKind::Submitted)
        .expect("borrow submitted");
    assert!(deposit_confirmed < borrow_submitted);
}

#[tokio::test]
async fn test_no_repay_stops_after_borrow() {
    let (ledger, mut config) = default_setup();
    config.repay = false;
    let seed = SimulationSeed::default();

    let report = PositionWorkflow::new(ledger.clone(), config.clone())
        .run()
        .await
        .expect("workflow succeeds");

    assert_eq!(report.final_state, WorkflowState::Done);
    assert!(report.snapshot_after_repay.is_none());
    assert_eq!(
        position(&ledger, &seed.lending_pool, &config, InterestRateMode::Stable),
        BigUint::from(10_000_000u64)
    );
    assert_eq!(
        ledger.token_balance(&config.borrow_asset, &seed.account),
        Some(Amount::from_u128(10_000_000, 6))
    );
}

#[tokio::test]
async fn test_deeper_confirmations_advance_blocks() {
    let (ledger, mut config) = default_setup();
    config.confirmations = 3;
    let start = ledger.block_number();

    let report = PositionWorkflow::new(ledger.clone(), config)
        .run()
        .await
        .expect("workflow succeeds");

    for receipt in &report.receipts {
        assert!(receipt.confirmations >= 3);
    }
    assert!(ledger.block_number() >= start + 6 * 3);
}

#[tokio::test]
async fn test_workflow_runs_only_once() {
    let (ledger, config) = default_setup();
    let mut workflow = PositionWorkflow::new(ledger.clone(), config);
    workflow.run().await.expect("first run succeeds");
    let submitted = ledger.submitted_calls().len();

    let err = workflow.run().await.expect_err("second run is refused");
    assert_eq!(err.step, WorkflowState::Done);
    assert_eq!(ledger.submitted_calls().len(), submitted);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_deposit_revert_stops_the_run() {
    let (ledger, config) = default_setup();
    ledger.revert_next(CallKind::Deposit, "reserve frozen");
    let mut workflow = PositionWorkflow::new(ledger.clone(), config.clone());

    let err = workflow.run().await.expect_err("deposit reverts");

    assert_eq!(err.step, WorkflowState::Deposited);
    assert_eq!(err.asset, Some(config.collateral_asset));
    assert!(err.is_revert());
    assert!(err.to_string().contains("reserve frozen"));
    assert_eq!(workflow.state(), WorkflowState::CollateralAuthorized);
    assert_eq!(
        ledger.submitted_calls(),
        vec![CallKind::WrapNative, CallKind::Approve, CallKind::Deposit]
    );
}

#[tokio::test]
async fn test_borrow_revert_leaves_collateral_in_place() {
    let (ledger, config) = default_setup();
    let seed = SimulationSeed::default();
    ledger.revert_next(CallKind::Borrow, "collateral cannot cover new borrow");

    let err = PositionWorkflow::new(ledger.clone(), config.clone())
        .run()
        .await
        .expect_err("borrow reverts");

    assert_eq!(err.step, WorkflowState::Borrowed);
    assert!(matches!(err.source, BorrowflowError::TransactionReverted { .. }));
    assert_eq!(ledger.submitted_calls().last(), Some(&CallKind::Borrow));

    // Earlier confirmed steps are not unwound
    assert_eq!(
        ledger.collateral(&seed.lending_pool, &seed.account, &config.collateral_asset),
        BigUint::from(100_000_000_000_000_000u128)
    );
    assert_eq!(
        position(&ledger, &seed.lending_pool, &config, InterestRateMode::Stable),
        BigUint::from(0u8)
    );
}

#[tokio::test]
async fn test_repay_with_other_rate_mode_reverts() {
    let (ledger, config) = default_setup();
    let seed = SimulationSeed::default();
    let mut workflow =
        PositionWorkflow::new(ledger.clone(), config.clone()).with_repay_mode(InterestRateMode::Variable);

    let err = workflow.run().await.expect_err("repay reverts");

    assert_eq!(err.step, WorkflowState::Repaid);
    match &err.source {
        BorrowflowError::TransactionReverted { reason, .. } => {
            assert!(reason.contains("no debt of selected type"), "{}", reason)
        }
        other => panic!("expected revert, got {:?}", other),
    }
    assert_eq!(
        position(&ledger, &seed.lending_pool, &config, InterestRateMode::Stable),
        BigUint::from(10_000_000u64)
    );
}

#[tokio::test]
async fn test_zero_capacity_skips_borrow() {
    let (ledger, config) = setup(SimulationSeed {
        collateral_ltv_bps: 0,
        ..SimulationSeed::default()
    });

    let report = PositionWorkflow::new(ledger.clone(), config)
        .run()
        .await
        .expect("workflow finishes");

    assert_eq!(report.final_state, WorkflowState::Done);
    assert!(report.borrow_amount.is_zero());
    assert!(report.snapshot_after_borrow.is_none());
    assert!(!ledger.submitted_calls().contains(&CallKind::Borrow));
    assert!(!ledger.submitted_calls().contains(&CallKind::Repay));
}

#[tokio::test]
async fn test_zero_price_is_a_precision_error() {
    let (ledger, config) = setup(SimulationSeed {
        borrow_asset_price: "0".to_string(),
        ..SimulationSeed::default()
    });

    let err = PositionWorkflow::new(ledger.clone(), config.clone())
        .run()
        .await
        .expect_err("zero price");

    assert_eq!(err.step, WorkflowState::BorrowComputed);
    assert_eq!(err.asset, Some(config.borrow_asset));
    assert!(matches!(err.source, BorrowflowError::PrecisionError { .. }));
    assert!(!ledger.submitted_calls().contains(&CallKind::Borrow));
}

#[tokio::test]
async fn test_offline_ledger_fails_before_submitting() {
    let (ledger, config) = default_setup();
    ledger.set_offline(true);

    let err = PositionWorkflow::new(ledger.clone(), config)
        .run()
        .await
        .expect_err("ledger offline");

    assert_eq!(err.step, WorkflowState::Wrapped);
    assert!(matches!(err.source, BorrowflowError::LedgerUnavailable { .. }));
    assert!(ledger.submitted_calls().is_empty());
}

#[tokio::test]
async fn test_failed_read_after_wrap_aborts() {
    let (ledger, config) = default_setup();
    ledger.fail_next_reads(1);
    let mut workflow = PositionWorkflow::new(ledger.clone(), config);

    let err = workflow.run().await.expect_err("balance read fails");

    assert_eq!(err.step, WorkflowState::Wrapped);
    assert!(matches!(err.source, BorrowflowError::LedgerUnavailable { .. }));
    assert_eq!(workflow.state(), WorkflowState::Start);
    assert_eq!(ledger.submitted_calls(), vec![CallKind::WrapNative]);
}

#[tokio::test]
async fn test_wrap_beyond_funds_is_rejected() {
    let (ledger, config) = setup(SimulationSeed {
        native_funds: "1000".to_string(),
        ..SimulationSeed::default()
    });

    let err = PositionWorkflow::new(ledger.clone(), config)
        .run()
        .await
        .expect_err("insufficient funds");

    assert!(matches!(err.source, BorrowflowError::SubmissionRejected { .. }));
    assert!(ledger.submitted_calls().is_empty());
}

// ============================================================================
// Pool Resolution
// ============================================================================

#[tokio::test]
async fn test_each_run_resolves_the_current_pool() {
    let (ledger, config) = default_setup();
    let seed = SimulationSeed::default();

    let first = PositionWorkflow::new(ledger.clone(), config.clone())
        .run()
        .await
        .expect("first run");
    assert_eq!(first.pool, seed.lending_pool);

    // Upgrade the provider to a fresh pool with the same reserves
    let upgraded = Address::from_low_u64(0x9001);
    ledger.set_provider_pool(&config.addresses_provider, &upgraded);
    ledger.add_reserve(
        &upgraded,
        &config.collateral_asset,
        ReserveConfig {
            price_feed: Address::from_low_u64(0xfeed),
            ltv_bps: seed.collateral_ltv_bps,
            liquidation_threshold_bps: seed.collateral_liquidation_threshold_bps,
        },
    );
    ledger.add_reserve(
        &upgraded,
        &config.borrow_asset,
        ReserveConfig {
            price_feed: config.price_feed,
            ltv_bps: 7_500,
            liquidation_threshold_bps: 8_000,
        },
    );
    ledger.mint(&config.borrow_asset, &upgraded, &Amount::from_u128(1_000_000_000_000, 6));

    let second = PositionWorkflow::new(ledger.clone(), config.clone())
        .run()
        .await
        .expect("second run");

    assert_eq!(second.pool, upgraded);
    assert_eq!(
        ledger.collateral(&upgraded, &seed.account, &config.collateral_asset),
        BigUint::from(100_000_000_000_000_000u128)
    );
}

#[tokio::test]
async fn test_zero_pool_address_is_unavailable() {
    let (ledger, config) = default_setup();
    ledger.set_provider_pool(&config.addresses_provider, &Address::ZERO);

    let err = PositionWorkflow::new(ledger.clone(), config)
        .run()
        .await
        .expect_err("zero pool");

    assert_eq!(err.step, WorkflowState::PoolResolved);
    assert!(matches!(err.source, BorrowflowError::LedgerUnavailable { .. }));
    assert_eq!(ledger.submitted_calls(), vec![CallKind::WrapNative]);
}
