//! Extraction of registry updates from manager operation receipts.

use registry_primitives::{Address, PartialUpdate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{micheline::RegistrySchema, RpcError};

/// A manager operation group as listed in a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub contents: Vec<Value>,
}

/// One applied effect of an operation on the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum AppliedResult {
    /// Entries the operation wrote to the registry's big map.
    BigMapDiff(PartialUpdate),
    /// The contract's full storage after the operation, one value per top-level slot.
    Storage(Vec<Value>),
}

fn targets(content: &Value, registry: &Address) -> bool {
    content.get("kind").and_then(Value::as_str) == Some("transaction")
        && content.get("destination").and_then(Value::as_str) == Some(registry.as_str())
}

fn status(result: &Value) -> &str {
    result.get("status").and_then(Value::as_str).unwrap_or("unknown")
}

/// Collects the receipts of every transaction in `op` that calls `registry`, including internal
/// ones. Receipts that were not applied are returned as errors.
fn registry_receipts<'a>(
    op: &'a Operation,
    registry: &Address,
) -> Vec<Result<&'a Value, RpcError>> {
    let mut out = Vec::new();
    for content in &op.contents {
        let Some(metadata) = content.get("metadata") else {
            continue;
        };

        if targets(content, registry) {
            out.push(metadata.get("operation_result"));
        }

        let internal = metadata
            .get("internal_operation_results")
            .and_then(Value::as_array)
            .into_iter()
            .flatten();
        for result in internal {
            if targets(result, registry) {
                out.push(result.get("result"));
            }
        }
    }

    out.into_iter()
        .map(|receipt| {
            let receipt = receipt.ok_or_else(|| RpcError::receipt("missing operation result"))?;
            match status(receipt) {
                "applied" => Ok(receipt),
                other => Err(RpcError::NotApplied(other.to_owned())),
            }
        })
        .collect()
}

fn legacy_diff(
    schema: &RegistrySchema,
    diff: &[Value],
    out: &mut PartialUpdate,
) -> Result<(), RpcError> {
    for item in diff {
        if item.get("action").and_then(Value::as_str) != Some("update") {
            continue;
        }
        // A missing value is a removal.
        let (Some(key), Some(value)) = (item.get("key"), item.get("value")) else {
            continue;
        };
        out.insert(
            Address::new(schema.decode_key(key)?),
            schema.decode_record(value)?,
        );
    }
    Ok(())
}

fn lazy_storage_diff(
    schema: &RegistrySchema,
    diff: &[Value],
    out: &mut PartialUpdate,
) -> Result<(), RpcError> {
    for item in diff {
        if item.get("kind").and_then(Value::as_str) != Some("big_map") {
            continue;
        }
        let updates = item
            .get("diff")
            .and_then(|d| d.get("updates"))
            .and_then(Value::as_array)
            .into_iter()
            .flatten();
        for update in updates {
            let (Some(key), Some(value)) = (update.get("key"), update.get("value")) else {
                continue;
            };
            out.insert(
                Address::new(schema.decode_key(key)?),
                schema.decode_record(value)?,
            );
        }
    }
    Ok(())
}

fn applied_result(schema: &RegistrySchema, receipt: &Value) -> Result<AppliedResult, RpcError> {
    let legacy = receipt.get("big_map_diff").and_then(Value::as_array);
    let lazy = receipt.get("lazy_storage_diff").and_then(Value::as_array);

    if legacy.is_some() || lazy.is_some() {
        let mut update = PartialUpdate::new();
        if let Some(diff) = legacy {
            legacy_diff(schema, diff, &mut update)?;
        }
        if let Some(diff) = lazy {
            lazy_storage_diff(schema, diff, &mut update)?;
        }
        return Ok(AppliedResult::BigMapDiff(update));
    }

    let storage = receipt
        .get("storage")
        .ok_or_else(|| RpcError::receipt("receipt has neither a diff nor storage"))?;
    Ok(AppliedResult::Storage(schema.storage_slots(storage)?))
}

/// Decodes the registry's applied results from an operation.
///
/// Fails with [`RpcError::Unrelated`] when no transaction in the operation calls the registry,
/// and with the first receipt error otherwise.
pub fn extract_results(
    schema: &RegistrySchema,
    registry: &Address,
    op: &Operation,
) -> Result<Vec<AppliedResult>, RpcError> {
    let receipts = registry_receipts(op, registry);
    if receipts.is_empty() {
        return Err(RpcError::Unrelated);
    }

    receipts
        .into_iter()
        .map(|receipt| applied_result(schema, receipt?))
        .collect()
}
