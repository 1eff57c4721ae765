//! HTTP-level tests of the devnet mock endpoints

mod common;

use common::TestDevnet;
use devnet_mock::handlers::MAX_BLOCKS_PER_MINE;
use serde_json::{json, Value};
use stacks_counter::api::StacksApiClient;
use stacks_counter::devnet as accounts;
use stacks_counter::transaction::StacksTransaction;
use stacks_counter::{ContractId, CounterError, CounterFunction, CounterWriter};

#[tokio::test]
async fn test_health() -> anyhow::Result<()> {
    let devnet = TestDevnet::start().await?;
    let body = reqwest::get(format!("{}/health", devnet.url())).await?.text().await?;
    assert_eq!(body, "OK");
    Ok(())
}

#[tokio::test]
async fn test_read_only_call_returns_hex_response() -> anyhow::Result<()> {
    let devnet = TestDevnet::start().await?;
    let deployer = accounts::deployer()?.stx_address;

    let url = format!(
        "{}/v2/contracts/call-read/{}/counter/get-count",
        devnet.url(),
        deployer
    );
    let body: Value = reqwest::Client::new()
        .post(&url)
        .json(&json!({ "sender": deployer, "arguments": [] }))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(body["okay"], json!(true));
    // (ok u0)
    assert_eq!(
        body["result"],
        json!("0x070100000000000000000000000000000000")
    );
    Ok(())
}

#[tokio::test]
async fn test_unknown_function_is_not_okay() -> anyhow::Result<()> {
    let devnet = TestDevnet::start().await?;
    let deployer = accounts::deployer()?.stx_address;

    let url = format!("{}/v2/contracts/call-read/{}/counter/reset", devnet.url(), deployer);
    let body: Value = reqwest::Client::new()
        .post(&url)
        .json(&json!({ "sender": deployer, "arguments": [] }))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(body["okay"], json!(false));
    assert!(body["cause"].as_str().unwrap_or_default().contains("reset"));
    Ok(())
}

#[tokio::test]
async fn test_read_of_missing_contract_is_a_retryable_fetch_failure() -> anyhow::Result<()> {
    let devnet = TestDevnet::start().await?;
    let api = StacksApiClient::new(&devnet.client_config())?;
    let missing = ContractId::new(accounts::deployer()?.stx_address, "not-deployed");

    let err = api.get_counter_value(&missing).await.unwrap_err();
    assert!(matches!(err, CounterError::FetchFailed(ref msg) if msg.contains("not-deployed")));
    assert!(err.is_transient());
    Ok(())
}

#[tokio::test]
async fn test_faults_fail_the_next_reads() -> anyhow::Result<()> {
    let devnet = TestDevnet::start().await?;
    let client = reqwest::Client::new();
    let deployer = accounts::deployer()?.stx_address;

    client
        .post(format!("{}/devnet/faults", devnet.url()))
        .json(&json!({ "fail_reads": 1 }))
        .send()
        .await?
        .error_for_status()?;

    let url = format!("{}/v2/contracts/call-read/{}/counter/get-count", devnet.url(), deployer);
    let read = json!({ "sender": deployer, "arguments": [] });
    let first = client.post(&url).json(&read).send().await?;
    assert_eq!(first.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let second = client.post(&url).json(&read).send().await?;
    assert!(second.status().is_success());
    Ok(())
}

#[tokio::test]
async fn test_unknown_transaction_is_not_found() -> anyhow::Result<()> {
    let devnet = TestDevnet::start().await?;
    let response = reqwest::get(format!("{}/extended/v1/tx/0x{}", devnet.url(), "ab".repeat(32))).await?;
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_garbage_broadcast_is_rejected_with_reason() -> anyhow::Result<()> {
    let devnet = TestDevnet::start().await?;
    let response = reqwest::Client::new()
        .post(format!("{}/v2/transactions", devnet.url()))
        .header("content-type", "application/octet-stream")
        .body(vec![0x80, 0x00, 0x01])
        .send()
        .await?;

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], json!("transaction rejected"));
    assert!(body["reason"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_broadcast_with_wrong_nonce_is_rejected() -> anyhow::Result<()> {
    let devnet = TestDevnet::start().await?;
    let config = devnet.client_config();
    let api = StacksApiClient::new(&config)?;
    let writer = CounterWriter::new(api.clone(), &config);
    let account = accounts::find_account("wallet_1")?;

    let public_key =
        secp256k1::PublicKey::from_secret_key(&secp256k1::Secp256k1::new(), account.secret_key());
    let mut tx = StacksTransaction::contract_call(
        &writer.request(CounterFunction::Increment),
        &public_key,
        7,
        config.tx_fee,
    )?;
    tx.sign(account.secret_key())?;

    let err = api.broadcast_transaction(tx.serialize()).await.unwrap_err();
    assert!(matches!(err, CounterError::SubmissionRejected(ref msg) if msg.contains("BadNonce")));
    assert_eq!(devnet.node.mempool_len(), 0);
    Ok(())
}

#[tokio::test]
async fn test_account_nonce_advances_after_mining() -> anyhow::Result<()> {
    let devnet = TestDevnet::start().await?;
    let config = devnet.client_config();
    let api = StacksApiClient::new(&config)?;
    let writer = CounterWriter::new(api.clone(), &config);
    let account = accounts::find_account("wallet_2")?;

    assert_eq!(api.get_account_nonce(&account.stx_address).await?, 0);
    let txid = writer
        .submit(&stacks_counter::Signer::Simulated(account.clone()), CounterFunction::Increment)
        .await?;

    let pending = api.get_transaction(&txid).await?;
    assert_eq!(pending.tx_status, "pending");

    let mined: Value = reqwest::Client::new()
        .post(format!("{}/devnet/mine", devnet.url()))
        .json(&json!({ "count": 1 }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(mined["mined"], json!(1));

    let confirmed = api.get_transaction(&txid).await?;
    assert_eq!(confirmed.tx_status, "success");
    assert_eq!(confirmed.block_height, mined["new_height"].as_u64());
    assert_eq!(confirmed.tx_result.map(|r| r.repr), Some("(ok u1)".to_string()));
    assert_eq!(api.get_account_nonce(&account.stx_address).await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_blocks_are_listed_newest_first() -> anyhow::Result<()> {
    let devnet = TestDevnet::start().await?;
    devnet.node.mine(3);

    let body: Value = reqwest::get(format!("{}/extended/v2/blocks?limit=2", devnet.url()))
        .await?
        .json()
        .await?;
    let results = body["results"].as_array().cloned().unwrap_or_default();
    assert_eq!(results.len(), 2);
    assert!(results[0]["height"].as_u64() > results[1]["height"].as_u64());
    assert!(results[0]["burn_block_height"].as_u64() > results[1]["burn_block_height"].as_u64());
    Ok(())
}

#[tokio::test]
async fn test_mine_request_is_capped() -> anyhow::Result<()> {
    let devnet = TestDevnet::start().await?;
    let before = devnet.node.block_height();

    let mined: Value = reqwest::Client::new()
        .post(format!("{}/devnet/mine", devnet.url()))
        .json(&json!({ "count": 1_000_000_000_000u64 }))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(mined["mined"], json!(MAX_BLOCKS_PER_MINE));
    assert_eq!(devnet.node.block_height(), before + MAX_BLOCKS_PER_MINE);
    Ok(())
}
