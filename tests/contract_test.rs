//! Counter contract tests
//!
//! Runs the counter contract on the in-memory simnet from a fresh chain per
//! test, calling it as the deployer the way a Clarinet unit test would.
//!
//! Run with: cargo test --test contract_test -- --nocapture

use stacks_counter::simnet::{Simnet, COUNTER_CONTRACT_NAME, ERR_UNDERFLOW};
use stacks_counter::ClarityValue;

fn init() -> Simnet {
    let _ = env_logger::builder().is_test(true).try_init();
    Simnet::with_counter()
}

fn get_count(simnet: &Simnet) -> ClarityValue {
    simnet
        .call_read_only(simnet.deployer(), COUNTER_CONTRACT_NAME, "get-count", &[])
        .expect("get-count should be callable")
}

fn call(simnet: &mut Simnet, function: &str) -> ClarityValue {
    let deployer = simnet.deployer().to_string();
    simnet
        .call_public(&deployer, &deployer, COUNTER_CONTRACT_NAME, function, &[])
        .expect("public call should execute")
        .result
}

fn ok_uint(n: u128) -> ClarityValue {
    ClarityValue::ok(ClarityValue::UInt(n))
}

#[test]
fn test_get_count_starts_at_zero() {
    let simnet = init();
    assert_eq!(get_count(&simnet), ok_uint(0));
}

#[test]
fn test_increment_returns_new_value() {
    let mut simnet = init();

    assert_eq!(call(&mut simnet, "increment"), ok_uint(1));
    assert_eq!(get_count(&simnet), ok_uint(1));
}

#[test]
fn test_increment_accumulates() {
    let mut simnet = init();

    for _ in 0..4 {
        call(&mut simnet, "increment");
    }
    assert_eq!(call(&mut simnet, "increment"), ok_uint(5));
    assert_eq!(get_count(&simnet), ok_uint(5));
}

#[test]
fn test_decrement_after_increments() {
    let mut simnet = init();

    call(&mut simnet, "increment");
    call(&mut simnet, "increment");
    assert_eq!(get_count(&simnet), ok_uint(2));

    assert_eq!(call(&mut simnet, "decrement"), ok_uint(1));
    assert_eq!(get_count(&simnet), ok_uint(1));
}

#[test]
fn test_decrement_at_zero_underflows() {
    let mut simnet = init();
    assert_eq!(get_count(&simnet), ok_uint(0));

    let result = call(&mut simnet, "decrement");
    assert_eq!(result, ClarityValue::err(ClarityValue::UInt(ERR_UNDERFLOW)));
    assert_eq!(get_count(&simnet), ok_uint(0));
}

#[test]
fn test_calls_mine_blocks_and_consume_nonces() {
    let mut simnet = init();
    let deployer = simnet.deployer().to_string();
    let height = simnet.block_height();
    let nonce = simnet.account(&deployer).nonce;

    call(&mut simnet, "increment");
    call(&mut simnet, "decrement");
    call(&mut simnet, "decrement");

    assert_eq!(simnet.block_height(), height + 3);
    assert_eq!(simnet.account(&deployer).nonce, nonce + 3);
}

#[test]
fn test_get_count_result_decodes_over_the_wire() {
    let mut simnet = init();
    call(&mut simnet, "increment");

    let hex = get_count(&simnet).to_hex();
    let decoded = ClarityValue::from_hex(&hex).unwrap();
    assert_eq!(decoded.into_response().unwrap(), Ok(ClarityValue::UInt(1)));
}
