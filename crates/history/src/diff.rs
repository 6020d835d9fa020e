//! Structural diff between two versions of a record.

use std::collections::BTreeSet;

use registry_primitives::ChangeKind;
use serde::Serialize;
use serde_json::{Map, Value};

/// One atomic difference between two records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffFragment {
    /// Field names from the record root down to the changed field.
    pub path: Vec<String>,

    /// Innermost field name. For list elements this is the list's field.
    pub key: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,
}

impl DiffFragment {
    fn new(path: &[String], before: Option<Value>, after: Option<Value>) -> Self {
        Self {
            path: path.to_vec(),
            key: path.last().cloned().unwrap_or_default(),
            before,
            after,
        }
    }

    pub fn kind(&self) -> ChangeKind {
        // Fragments always carry at least one side.
        ChangeKind::classify(self.before.as_ref(), self.after.as_ref())
            .unwrap_or(ChangeKind::Replace)
    }
}

/// Computes the differences between `before` and `after`, in sorted field order.
///
/// Nested objects are compared field by field. Lists are compared as multisets: each element that
/// disappeared is a removal and each new element an insertion, both keyed by the list's field.
/// Positions are ignored, so a list that was only reordered yields no fragments, unlike a
/// position-by-position comparison which would report a removal and an insertion for it.
/// A value whose type changed is a single replacement.
pub fn diff(before: &Map<String, Value>, after: &Map<String, Value>) -> Vec<DiffFragment> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    diff_objects(&mut path, before, after, &mut out);
    out
}

fn diff_objects(
    path: &mut Vec<String>,
    before: &Map<String, Value>,
    after: &Map<String, Value>,
    out: &mut Vec<DiffFragment>,
) {
    let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    for key in keys {
        path.push(key.clone());
        match (before.get(key), after.get(key)) {
            (Some(b), Some(a)) => diff_values(path, b, a, out),
            (Some(b), None) => out.push(DiffFragment::new(path, Some(b.clone()), None)),
            (None, Some(a)) => out.push(DiffFragment::new(path, None, Some(a.clone()))),
            (None, None) => {}
        }
        path.pop();
    }
}

fn diff_values(path: &mut Vec<String>, before: &Value, after: &Value, out: &mut Vec<DiffFragment>) {
    if before == after {
        return;
    }
    match (before, after) {
        (Value::Object(b), Value::Object(a)) => diff_objects(path, b, a, out),
        (Value::Array(b), Value::Array(a)) => diff_lists(path, b, a, out),
        _ => out.push(DiffFragment::new(
            path,
            Some(before.clone()),
            Some(after.clone()),
        )),
    }
}

fn diff_lists(path: &[String], before: &[Value], after: &[Value], out: &mut Vec<DiffFragment>) {
    let mut unmatched: Vec<Option<&Value>> = before.iter().map(Some).collect();
    let mut inserted = Vec::new();

    for item in after {
        match unmatched.iter_mut().find(|slot| slot.is_some_and(|b| b == item)) {
            Some(slot) => *slot = None,
            None => inserted.push(item),
        }
    }

    for removed in unmatched.into_iter().flatten() {
        out.push(DiffFragment::new(path, Some(removed.clone()), None));
    }
    for item in inserted {
        out.push(DiffFragment::new(path, None, Some(item.clone())));
    }
}
