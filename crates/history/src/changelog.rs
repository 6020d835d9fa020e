//! Change log construction: diffing each update against the running state of the registry.

use registry_primitives::{ChangeEntry, LevelUpdate, Snapshot};
use registry_rpc::BlockRef;
use tracing::{debug, info};

use crate::{
    baker_label, context::touched_addresses, diff, HistoryError, HistoryWindow, Normalizer,
    RecordMode, RegistryHistory,
};

/// Turns ascending level updates into change entries against a baseline.
#[derive(Debug)]
pub struct ChangeLogBuilder<'a> {
    normalizer: &'a Normalizer,
}

impl<'a> ChangeLogBuilder<'a> {
    pub fn new(normalizer: &'a Normalizer) -> Self {
        Self { normalizer }
    }

    /// Diffs every entry of `updates` against the latest known record of its address.
    ///
    /// `baseline` must already be normalized. An address without a baseline record yields a
    /// single `create` entry. After each entry only that address's baseline is replaced. The
    /// result is ordered most recent level first.
    pub fn build(
        &self,
        mut baseline: Snapshot,
        updates: impl IntoIterator<Item = LevelUpdate>,
    ) -> Result<Vec<ChangeEntry>, HistoryError> {
        let mut log = Vec::new();

        for update in updates {
            let (level, entries) = update.into_parts();
            for (address, raw) in entries {
                let label = baker_label(&address, &raw);
                let record = self.normalizer.normalize(raw)?;

                match baseline.get(&address) {
                    Some(previous) => log.extend(diff(previous, &record).into_iter().filter_map(
                        |fragment| {
                            ChangeEntry::field(
                                level,
                                label.clone(),
                                fragment.key,
                                fragment.before,
                                fragment.after,
                            )
                        },
                    )),
                    None => log.push(ChangeEntry::create(level, label, address.clone())),
                }

                baseline.insert(address, record);
            }
        }

        log.reverse();
        Ok(log)
    }
}

impl RegistryHistory {
    /// Builds the change log of `window`, most recent change first.
    pub async fn build_log(
        &self,
        window: HistoryWindow,
        mode: RecordMode,
    ) -> Result<Vec<ChangeEntry>, HistoryError> {
        let floor = self.resolve_window(window).await?;
        let mut updates = self.updates(floor).await?;
        if updates.is_empty() {
            info!(?floor, "no registry updates in window");
            return Ok(Vec::new());
        }

        let normalizer = self.normalizer(mode);
        let baseline = match floor {
            Some(floor) => {
                let addresses = touched_addresses(&updates);
                self.snapshot_service(&normalizer)
                    .snapshot(addresses, BlockRef::Level(floor))
                    .await?
            }
            None => {
                // The earliest update seeds the state and is not itself reported.
                let first = updates.remove(0);
                first
                    .into_entries()
                    .into_iter()
                    .map(|(address, raw)| Ok((address, normalizer.normalize(raw)?)))
                    .collect::<Result<Snapshot, HistoryError>>()?
            }
        };
        debug!(baseline = baseline.len(), updates = updates.len(), "diffing registry updates");

        let log = ChangeLogBuilder::new(&normalizer).build(baseline, updates)?;
        info!(entries = log.len(), "built registry change log");
        Ok(log)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeSet, sync::Arc};

    use mockall::predicate::eq;
    use registry_indexer::MockUpdateSource;
    use registry_primitives::{
        constants::DEFAULT_BOOKKEEPING_FIELDS, Address, ChangeKind, Level, RawRecord,
    };
    use registry_rpc::{AppliedResult, MockRegistryRpc, Operation};
    use serde_json::{json, Value};

    use super::*;
    use crate::{HistorySettings, Since};

    fn rec(v: Value) -> RawRecord {
        v.as_object().cloned().unwrap()
    }

    fn update(level: Level, entries: &[(&str, Value)]) -> LevelUpdate {
        LevelUpdate::new(
            level,
            entries
                .iter()
                .map(|(addr, v)| (Address::from(*addr), rec(v.clone())))
                .collect(),
        )
    }

    fn raw_normalizer() -> Normalizer {
        Normalizer::new(
            RecordMode::Raw,
            DEFAULT_BOOKKEEPING_FIELDS.iter().map(|f| f.to_string()).collect(),
        )
    }

    #[test]
    fn test_unknown_address_is_a_create() {
        let normalizer = raw_normalizer();
        let log = ChangeLogBuilder::new(&normalizer)
            .build(
                Snapshot::new(),
                [update(10, &[("tz1a", json!({ "bakerName": "4d79" }))])],
            )
            .unwrap();

        assert_eq!(log.len(), 1);
        assert_eq!(log[0].kind, ChangeKind::Create);
        assert_eq!(log[0].baker, "My");
        assert_eq!(log[0].address, Some(Address::from("tz1a")));
    }

    #[test]
    fn test_baseline_replaced_per_address() {
        let normalizer = raw_normalizer();
        let baseline: Snapshot = [
            (Address::from("tz1a"), rec(json!({ "v": 1 }))),
            (Address::from("tz1b"), rec(json!({ "v": 1 }))),
        ]
        .into();

        let log = ChangeLogBuilder::new(&normalizer)
            .build(
                baseline,
                [
                    update(10, &[("tz1a", json!({ "v": 2, "last_update": "t1" }))]),
                    update(20, &[("tz1b", json!({ "v": 2 }))]),
                    update(30, &[("tz1a", json!({ "v": 3 }))]),
                ],
            )
            .unwrap();

        let summary: Vec<_> = log
            .iter()
            .map(|e| (e.level, e.baker.as_str(), e.before.clone(), e.after.clone()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (30, "tz1a", Some(json!(2)), Some(json!(3))),
                (20, "tz1b", Some(json!(1)), Some(json!(2))),
                (10, "tz1a", Some(json!(1)), Some(json!(2))),
            ]
        );
    }

    #[test]
    fn test_unchanged_record_yields_nothing() {
        let normalizer = raw_normalizer();
        let baseline: Snapshot = [(Address::from("tz1a"), rec(json!({ "v": 1 })))].into();
        let log = ChangeLogBuilder::new(&normalizer)
            .build(
                baseline,
                [update(10, &[("tz1a", json!({ "v": 1, "last_update": "t" }))])],
            )
            .unwrap();
        assert!(log.is_empty());
    }

    fn history(rpc: MockRegistryRpc, levels: &[Level]) -> RegistryHistory {
        let levels: BTreeSet<Level> = levels.iter().copied().collect();
        let mut source = MockUpdateSource::new();
        source.expect_name().return_const("mock");
        source
            .expect_discover()
            .returning(move |_| Ok(levels.clone()));
        RegistryHistory::new(Arc::new(rpc), Arc::new(source), HistorySettings::default())
    }

    fn expect_level(rpc: &mut MockRegistryRpc, level: Level, entries: Value) {
        let hash = format!("op{level}");
        rpc.expect_manager_operations()
            .with(eq(level))
            .returning(move |_| {
                Ok(vec![Operation {
                    hash: Some(hash.clone()),
                    contents: vec![],
                }])
            });
        let expected = Some(format!("op{level}"));
        let entries = rec(entries);
        rpc.expect_operation_result()
            .withf(move |op| op.hash == expected)
            .returning(move |_| {
                Ok(vec![AppliedResult::BigMapDiff(
                    entries
                        .iter()
                        .map(|(a, v)| (Address::new(a.clone()), v.as_object().cloned().unwrap()))
                        .collect(),
                )])
            });
    }

    #[tokio::test]
    async fn test_build_log_with_floor_uses_snapshot_baseline() {
        let mut rpc = MockRegistryRpc::new();
        expect_level(&mut rpc, 50, json!({ "tz1a": { "v": 0 } }));
        expect_level(&mut rpc, 150, json!({ "tz1a": { "v": 2 }, "tz1b": { "v": 1 } }));
        rpc.expect_get_record()
            .with(eq(Address::from("tz1a")), eq(BlockRef::Level(100)))
            .returning(|_, _| Ok(Some(rec(json!({ "v": 1 })))));
        rpc.expect_get_record()
            .with(eq(Address::from("tz1b")), eq(BlockRef::Level(100)))
            .returning(|_, _| Ok(None));

        let log = history(rpc, &[50, 150])
            .build_log(HistoryWindow::Since(Since::Level(100)), RecordMode::Raw)
            .await
            .unwrap();

        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|e| e.level == 150));
        // Reversed: tz1b's create was emitted after tz1a's replace.
        assert_eq!(log[0].kind, ChangeKind::Create);
        assert_eq!(log[0].address, Some(Address::from("tz1b")));
        assert_eq!(log[1].kind, ChangeKind::Replace);
        assert_eq!(log[1].before, Some(json!(1)));
    }

    #[tokio::test]
    async fn test_build_log_full_seeds_from_first_update() {
        let mut rpc = MockRegistryRpc::new();
        expect_level(&mut rpc, 10, json!({ "tz1a": { "v": 1 } }));
        expect_level(&mut rpc, 20, json!({ "tz1a": { "v": 2 } }));

        let log = history(rpc, &[20, 10])
            .build_log(HistoryWindow::Full, RecordMode::Raw)
            .await
            .unwrap();

        assert_eq!(log.len(), 1);
        assert_eq!(log[0].level, 20);
        assert_eq!(log[0].key.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_build_log_recent_window_and_empty_result() {
        let mut rpc = MockRegistryRpc::new();
        rpc.expect_head_cycle().returning(|| Ok(5));

        // Cycle 3 starts at 12288; nothing discovered above it.
        let log = history(rpc, &[100, 12288])
            .build_log(HistoryWindow::Recent, RecordMode::Decoded)
            .await
            .unwrap();
        assert!(log.is_empty());
    }
}
