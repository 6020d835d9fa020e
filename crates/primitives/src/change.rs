use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Address, Level};

/// How a registry entry changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// The address had no record before this level.
    Create,
    /// A field gained a value.
    Insert,
    /// A field lost its value.
    Remove,
    /// A field changed value.
    Replace,
}

impl ChangeKind {
    /// Classifies a field change from the presence of its two sides.
    ///
    /// Returns `None` when neither side has a value, which is not a change.
    pub fn classify(before: Option<&Value>, after: Option<&Value>) -> Option<Self> {
        match (before, after) {
            (None, None) => None,
            (None, Some(_)) => Some(Self::Insert),
            (Some(_), None) => Some(Self::Remove),
            (Some(_), Some(_)) => Some(Self::Replace),
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Insert => "insert",
            Self::Remove => "remove",
            Self::Replace => "replace",
        };
        f.write_str(s)
    }
}

/// One line of the registry change log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub level: Level,

    /// Display name of the baker the entry belongs to.
    pub baker: String,

    pub kind: ChangeKind,

    /// Set on `create` entries only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,
}

impl ChangeEntry {
    /// Entry for an address seen for the first time.
    pub fn create(level: Level, baker: impl Into<String>, address: Address) -> Self {
        Self {
            level,
            baker: baker.into(),
            kind: ChangeKind::Create,
            address: Some(address),
            key: None,
            before: None,
            after: None,
        }
    }

    /// Entry for a single changed field, or `None` if both sides are absent.
    pub fn field(
        level: Level,
        baker: impl Into<String>,
        key: impl Into<String>,
        before: Option<Value>,
        after: Option<Value>,
    ) -> Option<Self> {
        let kind = ChangeKind::classify(before.as_ref(), after.as_ref())?;
        Some(Self {
            level,
            baker: baker.into(),
            kind,
            address: None,
            key: Some(key.into()),
            before,
            after,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_classify() {
        let v = json!(1);
        assert_eq!(ChangeKind::classify(None, None), None);
        assert_eq!(ChangeKind::classify(None, Some(&v)), Some(ChangeKind::Insert));
        assert_eq!(ChangeKind::classify(Some(&v), None), Some(ChangeKind::Remove));
        assert_eq!(
            ChangeKind::classify(Some(&v), Some(&v)),
            Some(ChangeKind::Replace)
        );
    }

    #[test]
    fn test_create_entry_serialization() {
        let entry = ChangeEntry::create(42, "Baker", Address::new("tz1abc"));
        let js = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            js,
            json!({"level": 42, "baker": "Baker", "kind": "create", "address": "tz1abc"})
        );
    }

    #[test]
    fn test_field_entry_skips_absent_sides() {
        let entry = ChangeEntry::field(7, "B", "fee", None, Some(json!("0.1"))).unwrap();
        assert_eq!(entry.kind, ChangeKind::Insert);
        let js = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            js,
            json!({"level": 7, "baker": "B", "kind": "insert", "key": "fee", "after": "0.1"})
        );

        assert!(ChangeEntry::field(7, "B", "fee", None, None).is_none());
    }
}
