use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{constants::LAST_UPDATE_FIELD, RawRecord};

/// Decides which record wins when two updates for one address carry the same level.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// The right (later folded) operand wins.
    #[default]
    PreferLater,

    /// The left (earlier folded) operand wins.
    PreferEarlier,

    /// The record with the greater value in `field` wins. A record carrying the field beats one
    /// that does not; when the stamps are equal the right operand wins.
    LastUpdate {
        #[serde(default = "default_last_update_field")]
        field: String,
    },
}

fn default_last_update_field() -> String {
    LAST_UPDATE_FIELD.to_owned()
}

impl TieBreak {
    pub fn last_update() -> Self {
        Self::LastUpdate {
            field: default_last_update_field(),
        }
    }

    /// Returns true if `right` should replace `left` at equal levels.
    pub fn prefers_right(&self, left: &RawRecord, right: &RawRecord) -> bool {
        match self {
            Self::PreferLater => true,
            Self::PreferEarlier => false,
            Self::LastUpdate { field } => {
                stamp_rank(left.get(field)).cmp(&stamp_rank(right.get(field))) != Ordering::Greater
            }
        }
    }
}

/// Total order over stamp values: absent < numeric < textual.
#[derive(Debug, PartialEq, PartialOrd)]
enum StampRank<'a> {
    Absent,
    Numeric(f64),
    // RFC 3339 timestamps sort lexicographically.
    Textual(&'a str),
}

impl Eq for StampRank<'_> {}

impl Ord for StampRank<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        // JSON numbers are never NaN, so the partial order is total.
        self.partial_cmp(other).unwrap_or(Ordering::Equal)
    }
}

fn stamp_rank(value: Option<&Value>) -> StampRank<'_> {
    match value {
        Some(Value::Number(n)) => n.as_f64().map_or(StampRank::Absent, StampRank::Numeric),
        Some(Value::String(s)) => StampRank::Textual(s),
        _ => StampRank::Absent,
    }
}
