//! End-to-end client tests against the devnet mock
//!
//! Each test starts its own mock on an ephemeral port, builds a
//! `CounterApp` pointed at it and mines blocks by hand so every
//! transaction's life cycle is deterministic.
//!
//! Run with: cargo test -p devnet-mock --test client_flow_test -- --nocapture

mod common;

use anyhow::Context;
use common::{within, TestDevnet};
use stacks_counter::simnet::GENESIS_BURN_HEIGHT;
use stacks_counter::{ClarityValue, CounterApp, CounterError, NoticeLevel, TxStatus};
use std::time::Duration;

async fn connected_app(devnet: &TestDevnet, account: &str) -> anyhow::Result<CounterApp> {
    let app = CounterApp::new(devnet.client_config(), None).await?;
    app.session().select_devnet_account(account).await?;
    Ok(app)
}

/// Submit, mine, and wait for the write slot to free up
async fn confirm(app: &CounterApp, devnet: &TestDevnet, txid: &str) -> anyhow::Result<()> {
    let mut tracked = app.tracked().await.context("no transaction tracked")?;
    within(tracked.wait_for(|t| t.txid == txid && t.polls >= 1)).await?;
    devnet.node.mine(1);
    within(app.wait_idle()).await?;
    Ok(())
}

#[tokio::test]
async fn test_tracker_goes_pending_to_success_and_stops_polling() -> anyhow::Result<()> {
    let devnet = TestDevnet::start().await?;
    let app = connected_app(&devnet, "wallet_1").await?;

    let txid = app.increment().await?;
    let mut tracked = app.tracked().await.context("tracking should start")?;

    let first = within(tracked.wait_for(|t| t.polls >= 1)).await?.clone();
    assert_eq!(first.status, TxStatus::Pending);
    assert!(!first.finished);

    // a few more pending polls before the block lands
    within(tracked.wait_for(|t| t.polls >= 3)).await?;
    devnet.node.mine(1);

    let settled = within(tracked.wait_for(|t| t.finished)).await?.clone();
    assert_eq!(settled.status, TxStatus::Success);
    assert!(settled.block_height.is_some());
    assert_eq!(
        settled.result,
        Some(ClarityValue::ok(ClarityValue::UInt(1)))
    );

    let queries = devnet.node.status_queries(&txid);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(devnet.node.status_queries(&txid), queries, "polling should stop");
    assert!(app.write_state().is_idle());
    Ok(())
}

#[tokio::test]
async fn test_confirmed_write_invalidates_counter() -> anyhow::Result<()> {
    let devnet = TestDevnet::start().await?;
    let app = connected_app(&devnet, "wallet_1").await?;

    within(app.counter().wait_for(|s| s.data == Some(0))).await?;

    let txid = app.increment().await?;
    confirm(&app, &devnet, &txid).await?;

    // the refresh interval is ten minutes, only the invalidation can do this
    let state = within(app.counter().wait_for(|s| s.data == Some(1))).await?;
    assert!(!state.is_error);
    assert_eq!(devnet.node.counter_value(), Some(1));
    Ok(())
}

#[tokio::test]
async fn test_two_increments_then_decrement_reads_one() -> anyhow::Result<()> {
    let devnet = TestDevnet::start().await?;
    let app = connected_app(&devnet, "wallet_2").await?;

    for _ in 0..2 {
        let txid = app.increment().await?;
        confirm(&app, &devnet, &txid).await?;
    }
    let txid = app.decrement().await?;
    confirm(&app, &devnet, &txid).await?;

    within(app.counter().wait_for(|s| s.data == Some(1))).await?;
    Ok(())
}

#[tokio::test]
async fn test_disconnect_blocks_writes_until_reconnected() -> anyhow::Result<()> {
    let devnet = TestDevnet::start().await?;
    let app = connected_app(&devnet, "wallet_1").await?;
    assert!(app.session().current_address().is_some());

    app.disconnect().await;
    assert_eq!(app.session().current_address(), None);
    assert_eq!(app.increment().await.unwrap_err(), CounterError::NotConnected);
    assert_eq!(devnet.node.mempool_len(), 0);

    app.session().select_devnet_account("wallet_3").await?;
    app.increment().await?;
    assert_eq!(devnet.node.mempool_len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_second_write_is_refused_while_one_is_pending() -> anyhow::Result<()> {
    let devnet = TestDevnet::start().await?;
    let app = connected_app(&devnet, "wallet_1").await?;

    let txid = app.increment().await?;
    let err = app.decrement().await.unwrap_err();
    assert!(matches!(err, CounterError::WriteInFlight(ref msg) if msg.contains(&txid)));

    confirm(&app, &devnet, &txid).await?;
    app.decrement().await?;
    Ok(())
}

#[tokio::test]
async fn test_decrement_at_zero_aborts_with_contract_error() -> anyhow::Result<()> {
    let devnet = TestDevnet::start().await?;
    let app = connected_app(&devnet, "wallet_1").await?;
    let mut notices = app.notices();

    let txid = app.decrement().await?;
    let mut tracked = app.tracked().await.context("tracking should start")?;
    within(tracked.wait_for(|t| t.polls >= 1)).await?;
    devnet.node.mine(1);

    let settled = within(tracked.wait_for(|t| t.finished)).await?.clone();
    assert_eq!(settled.txid, txid);
    assert_eq!(settled.status, TxStatus::AbortByResponse);
    assert_eq!(settled.result, Some(ClarityValue::err(ClarityValue::UInt(1))));

    within(app.wait_idle()).await?;
    let mut errors = Vec::new();
    while let Ok(notice) = notices.try_recv() {
        if notice.level == NoticeLevel::Error {
            errors.push(notice.message);
        }
    }
    assert_eq!(
        errors,
        vec!["Decrement failed: Contract returned error: (err u1)".to_string()]
    );
    assert_eq!(devnet.node.counter_value(), Some(0));
    Ok(())
}

#[tokio::test]
async fn test_counter_read_recovers_from_transient_failures() -> anyhow::Result<()> {
    let devnet = TestDevnet::start().await?;
    devnet.node.set_fail_reads(2);

    let app = CounterApp::new(devnet.client_config(), None).await?;
    let state = within(app.counter().wait_for(|s| !s.is_loading)).await?;
    assert_eq!(state.data, Some(0));
    assert!(!state.is_error);
    Ok(())
}

#[tokio::test]
async fn test_counter_read_surfaces_exhausted_retries() -> anyhow::Result<()> {
    let devnet = TestDevnet::start().await?;
    devnet.node.set_fail_reads(100);

    let app = CounterApp::new(devnet.client_config(), None).await?;
    let state = within(app.counter().wait_for(|s| !s.is_loading)).await?;
    assert!(state.is_error);
    assert_eq!(state.data, None);
    assert!(matches!(
        state.error,
        Some(CounterError::FetchExhausted { attempts: 4, .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_block_height_tracks_burn_chain() -> anyhow::Result<()> {
    let devnet = TestDevnet::start().await?;
    let app = CounterApp::new(devnet.client_config(), None).await?;

    let state = within(app.block_height().wait_for(|s| s.data.is_some())).await?;
    // deploying the counter mined one block
    assert_eq!(state.data, Some(GENESIS_BURN_HEIGHT + 1));

    devnet.node.mine(2);
    app.block_height().invalidate();
    within(app.block_height().wait_for(|s| s.data == Some(GENESIS_BURN_HEIGHT + 3))).await?;
    Ok(())
}
