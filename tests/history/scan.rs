//! Registry reconstruction, point lookups and write planning over an in-memory chain.

#![allow(
    unused_crate_dependencies,
    reason = "test dependencies shared across test suite"
)]

use integration_tests::harness::{history_over, FakeChain};
use registry_codec::encode;
use registry_history::{HistoryError, RecordMode, UpsertKind};
use registry_primitives::Address;
use registry_rpc::{BlockRef, RpcError};
use serde_json::{json, Value};

fn stored(display: Value) -> Value {
    Value::Object(encode(display.as_object().unwrap()).unwrap())
}

fn chain() -> FakeChain {
    FakeChain::new()
        .write(100, "tz1alpha", stored(json!({ "bakerName": "Alpha", "fee": "0.1" })))
        .write(200, "tz1beta", stored(json!({ "bakerName": "Beta" })))
        .write(300, "tz1alpha", stored(json!({ "bakerName": "Alpha", "fee": "0.2" })))
        .broken_op(300)
        .noise(400)
}

/// Verifies every baker is reconstructed with its most recent entry.
#[tokio::test]
async fn test_all_bakers_latest_state() {
    let bakers = history_over(chain())
        .all_bakers(RecordMode::Decoded)
        .await
        .unwrap();

    assert_eq!(bakers.len(), 2);
    assert_eq!(bakers[&Address::from("tz1alpha")]["fee"], json!("0.2"));
    assert_eq!(bakers[&Address::from("tz1beta")]["bakerName"], json!("Beta"));
    assert_eq!(
        bakers[&Address::from("tz1beta")]["paymentConfig"]["payForOwnBlocks"],
        json!(true)
    );
}

/// Verifies an empty registry reconstructs to nothing.
#[tokio::test]
async fn test_all_bakers_empty_registry() {
    let bakers = history_over(FakeChain::new().noise(10))
        .all_bakers(RecordMode::Raw)
        .await
        .unwrap();
    assert!(bakers.is_empty());
}

/// Verifies point lookups at head and at past levels.
#[tokio::test]
async fn test_get_baker_at_levels() {
    let history = history_over(chain());
    let alpha = Address::from("tz1alpha");

    let head = history
        .get_baker(&alpha, RecordMode::Raw, BlockRef::Head)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(head["split"], json!(8000));

    let past = history
        .get_baker(&alpha, RecordMode::Decoded, BlockRef::Level(150))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(past["fee"], json!("0.1"));

    let before_registration = history
        .get_baker(&Address::from("tz1beta"), RecordMode::Decoded, BlockRef::Level(150))
        .await
        .unwrap();
    assert!(before_registration.is_none());
}

/// Verifies lookups above head fail instead of returning nothing.
#[tokio::test]
async fn test_snapshot_above_head_fails() {
    let res = history_over(chain())
        .snapshot(
            [Address::from("tz1alpha"), Address::from("tz1beta")],
            BlockRef::Level(10_000),
            RecordMode::Raw,
        )
        .await;
    assert!(matches!(res, Err(HistoryError::Rpc(RpcError::BlockNotFound(10_000)))));
}

/// Verifies write planning against the current registry state.
#[tokio::test]
async fn test_plan_upsert() {
    let history = history_over(chain());

    let input = json!({ "bakerName": "Beta", "fee": "0.05" });
    let plan = history
        .plan_upsert(Address::from("tz1beta"), input.as_object().unwrap())
        .await
        .unwrap();
    assert_eq!(plan.kind, UpsertKind::Update);
    assert_eq!(plan.fee_mutez, 500_000);
    assert_eq!(plan.changes.len(), 1);
    assert_eq!(plan.changes[0].key, "split");

    let plan = history
        .plan_upsert(Address::from("tz1gamma"), input.as_object().unwrap())
        .await
        .unwrap();
    assert_eq!(plan.kind, UpsertKind::Create);
    assert_eq!(plan.fee_mutez, 1_500_000);
}
