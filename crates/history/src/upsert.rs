//! Planning of registry writes.

use registry_codec::{encode, DisplayRecord};
use registry_primitives::{
    constants::{CREATE_FEE_MUTEZ, UPDATE_FEE_MUTEZ},
    Address, RawRecord,
};
use registry_rpc::BlockRef;
use serde::Serialize;
use tracing::info;

use crate::{diff, DiffFragment, HistoryError, RecordMode, RegistryHistory};

/// Whether a write registers a new baker or changes an existing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertKind {
    Create,
    Update,
}

impl UpsertKind {
    /// Amount the registry charges for the write.
    pub fn fee_mutez(self) -> u64 {
        match self {
            Self::Create => CREATE_FEE_MUTEZ,
            Self::Update => UPDATE_FEE_MUTEZ,
        }
    }
}

/// A registry write, ready to be turned into an operation elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpsertPlan {
    pub address: Address,
    pub kind: UpsertKind,
    pub fee_mutez: u64,

    /// Complete stored form of the new entry.
    pub record: RawRecord,

    /// Differences from the current entry. For a create, every field is an insertion.
    pub changes: Vec<DiffFragment>,
}

impl UpsertPlan {
    /// `true` when the write would leave an existing entry as it is.
    pub fn is_noop(&self) -> bool {
        self.kind == UpsertKind::Update && self.changes.is_empty()
    }
}

/// Encodes `input` with defaults for missing fields and compares it with `current`.
pub fn plan_upsert(
    address: Address,
    current: Option<&RawRecord>,
    input: &DisplayRecord,
) -> Result<UpsertPlan, HistoryError> {
    let record = encode(input)?;
    let (kind, changes) = match current {
        Some(current) => (UpsertKind::Update, diff(current, &record)),
        None => (UpsertKind::Create, diff(&RawRecord::new(), &record)),
    };

    Ok(UpsertPlan {
        address,
        kind,
        fee_mutez: kind.fee_mutez(),
        record,
        changes,
    })
}

impl RegistryHistory {
    /// Plans writing `input` as `address`'s entry against its current state at head.
    pub async fn plan_upsert(
        &self,
        address: Address,
        input: &DisplayRecord,
    ) -> Result<UpsertPlan, HistoryError> {
        let current = self
            .get_baker(&address, RecordMode::Raw, BlockRef::Head)
            .await?;
        let plan = plan_upsert(address, current.as_ref(), input)?;
        info!(
            address = %plan.address,
            kind = ?plan.kind,
            changes = plan.changes.len(),
            fee_mutez = plan.fee_mutez,
            "planned registry write"
        );
        Ok(plan)
    }
}
