//! Change log construction over an in-memory chain.

#![allow(
    unused_crate_dependencies,
    reason = "test dependencies shared across test suite"
)]

use integration_tests::harness::{history_over, FakeChain};
use registry_codec::encode;
use registry_history::{HistoryWindow, RecordMode, Since};
use registry_primitives::{Address, ChangeEntry, ChangeKind};
use serde_json::{json, Value};

/// Stored form of a display record, stamped with bookkeeping fields that differ every time.
fn stored(display: Value, stamp: u64) -> Value {
    let mut raw = encode(display.as_object().unwrap()).unwrap();
    raw.insert("last_update".into(), json!(format!("2021-01-{stamp:02}T00:00:00Z")));
    raw.insert("reporterAccount".into(), json!(format!("tz1reporter{stamp}")));
    Value::Object(raw)
}

/// Two bakers written across four cycles. Head is in cycle 3.
fn chain() -> FakeChain {
    FakeChain::new()
        .write(100, "tz1alpha", stored(json!({ "bakerName": "Alpha", "fee": "0.1" }), 1))
        .write(5000, "tz1beta", stored(json!({ "bakerName": "Beta" }), 2))
        .noise(7000)
        .write(9000, "tz1alpha", stored(json!({ "bakerName": "Alpha", "fee": "0.15" }), 3))
        .broken_op(9000)
        .write(
            13000,
            "tz1alpha",
            stored(
                json!({
                    "bakerName": "Alpha",
                    "fee": "0.15",
                    "bakerPaysFromAccounts": ["tz1payer"],
                }),
                4,
            ),
        )
        .write(
            13000,
            "tz1beta",
            stored(json!({ "bakerName": "Beta", "minDelegation": "100" }), 5),
        )
}

fn summary(log: &[ChangeEntry]) -> Vec<(u64, &str, ChangeKind, Option<&str>)> {
    log.iter()
        .map(|e| (e.level, e.baker.as_str(), e.kind, e.key.as_deref()))
        .collect()
}

fn assert_non_increasing(log: &[ChangeEntry]) {
    assert!(
        log.windows(2).all(|w| w[0].level >= w[1].level),
        "log is not ordered most recent first: {log:?}"
    );
}

/// Verifies the default window starts two cycles before head and diffs decoded records.
#[tokio::test]
async fn test_recent_decoded_log() {
    let log = history_over(chain())
        .build_log(HistoryWindow::Recent, RecordMode::Decoded)
        .await
        .unwrap();

    assert_non_increasing(&log);
    assert_eq!(
        summary(&log),
        vec![
            (13000, "Beta", ChangeKind::Replace, Some("minDelegation")),
            (13000, "Alpha", ChangeKind::Insert, Some("bakerPaysFromAccounts")),
            (9000, "Alpha", ChangeKind::Replace, Some("fee")),
            (5000, "Beta", ChangeKind::Create, None),
        ]
    );

    assert_eq!(log[0].before, Some(json!("0")));
    assert_eq!(log[0].after, Some(json!("100")));
    assert_eq!(log[1].after, Some(json!("tz1payer")));
    assert_eq!(log[2].before, Some(json!("0.1")));
    assert_eq!(log[2].after, Some(json!("0.15")));
    assert_eq!(log[3].address, Some(Address::from("tz1beta")));
}

/// Verifies the full history seeds its state from the earliest update without reporting it.
#[tokio::test]
async fn test_full_log_skips_first_update() {
    let log = history_over(chain())
        .build_log(HistoryWindow::Full, RecordMode::Decoded)
        .await
        .unwrap();

    assert_non_increasing(&log);
    assert_eq!(log.len(), 4);
    assert!(log.iter().all(|e| e.level > 100));
    assert_eq!(log.last().map(|e| e.kind), Some(ChangeKind::Create));
}

/// Verifies a level floor diffs against the state at the floor, leaving older changes out.
#[tokio::test]
async fn test_since_level_uses_snapshot_at_floor() {
    let log = history_over(chain())
        .build_log(HistoryWindow::Since(Since::Level(9000)), RecordMode::Decoded)
        .await
        .unwrap();

    assert_eq!(
        summary(&log),
        vec![
            (13000, "Beta", ChangeKind::Replace, Some("minDelegation")),
            (13000, "Alpha", ChangeKind::Insert, Some("bakerPaysFromAccounts")),
        ]
    );
}

/// Verifies raw records are compared as stored, without their bookkeeping fields.
#[tokio::test]
async fn test_raw_log_ignores_bookkeeping() {
    let log = history_over(chain())
        .build_log(HistoryWindow::Since(Since::Level(5000)), RecordMode::Raw)
        .await
        .unwrap();

    assert!(log
        .iter()
        .all(|e| !matches!(e.key.as_deref(), Some("last_update" | "reporterAccount"))));
    let fee_change = log.iter().find(|e| e.level == 9000).unwrap();
    assert_eq!(fee_change.key.as_deref(), Some("split"));
    assert_eq!(fee_change.before, Some(json!(9000)));
    assert_eq!(fee_change.after, Some(json!(8500)));
}

/// Verifies a window above every discovered level yields an empty log.
#[tokio::test]
async fn test_window_past_head_is_empty() {
    let log = history_over(chain())
        .build_log(HistoryWindow::Since(Since::Cycle(4)), RecordMode::Decoded)
        .await
        .unwrap();
    assert!(log.is_empty());
}

/// Verifies an address written twice in a window is diffed against its own previous write.
#[tokio::test]
async fn test_repeated_writes_chain_per_address() {
    let chain = FakeChain::new()
        .write(10, "tz1gamma", json!({ "v": 1 }))
        .write(20, "tz1gamma", json!({ "v": 2 }))
        .write(30, "tz1delta", json!({ "v": 1 }))
        .write(40, "tz1gamma", json!({ "v": 3 }));

    let log = history_over(chain)
        .build_log(HistoryWindow::Since(Since::Level(15)), RecordMode::Raw)
        .await
        .unwrap();

    let changes: Vec<_> = log
        .iter()
        .map(|e| (e.level, e.baker.as_str(), e.before.clone(), e.after.clone()))
        .collect();
    assert_eq!(
        changes,
        vec![
            (40, "tz1gamma", Some(json!(2)), Some(json!(3))),
            (30, "tz1delta", None, None),
            (20, "tz1gamma", Some(json!(1)), Some(json!(2))),
        ]
    );
}
