//! Resolution of the history window and filtering of candidate levels against it.

use std::{fmt, str::FromStr};

use registry_primitives::Level;
use serde::{Deserialize, Serialize};

use crate::HistoryError;

/// Start of a history window, exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SinceRepr", into = "String")]
pub enum Since {
    Level(Level),
    Cycle(u64),
}

impl Since {
    /// Converts the specifier to a level. Cycles start at `cycle * blocks_per_cycle`.
    pub fn to_level(self, blocks_per_cycle: u64) -> Level {
        match self {
            Self::Level(level) => level,
            Self::Cycle(cycle) => cycle.saturating_mul(blocks_per_cycle),
        }
    }
}

impl FromStr for Since {
    type Err = HistoryError;

    /// Accepts `level:N`, `cycle:N` or a bare level.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || HistoryError::InvalidSince(s.to_owned());
        let s = s.trim();

        let Some((kind, value)) = s.split_once(':') else {
            return s.parse().map(Self::Level).map_err(|_| invalid());
        };
        let value: u64 = value.trim().parse().map_err(|_| invalid())?;
        match kind.trim() {
            "level" => Ok(Self::Level(value)),
            "cycle" => Ok(Self::Cycle(value)),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Since {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Level(level) => write!(f, "level:{level}"),
            Self::Cycle(cycle) => write!(f, "cycle:{cycle}"),
        }
    }
}

impl From<Since> for String {
    fn from(since: Since) -> Self {
        since.to_string()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SinceRepr {
    Level(u64),
    Text(String),
}

impl TryFrom<SinceRepr> for Since {
    type Error = HistoryError;

    fn try_from(repr: SinceRepr) -> Result<Self, Self::Error> {
        match repr {
            SinceRepr::Level(level) => Ok(Self::Level(level)),
            SinceRepr::Text(text) => text.parse(),
        }
    }
}

/// Which part of the history a change log covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryWindow {
    /// From a couple of cycles before the current head cycle.
    #[default]
    Recent,
    /// Strictly after the given start.
    Since(Since),
    /// Everything the indexer returns.
    Full,
}

/// Turns window specifiers into level floors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowFilter {
    blocks_per_cycle: u64,
}

impl WindowFilter {
    pub fn new(blocks_per_cycle: u64) -> Self {
        Self { blocks_per_cycle }
    }

    pub fn blocks_per_cycle(&self) -> u64 {
        self.blocks_per_cycle
    }

    /// Resolves a window start to a floor. No start means no floor.
    pub fn resolve(&self, since: Option<Since>) -> Option<Level> {
        since.map(|s| s.to_level(self.blocks_per_cycle))
    }

    /// Keeps the levels strictly above `floor`, sorted ascending and deduplicated.
    pub fn filter(&self, levels: impl IntoIterator<Item = Level>, floor: Option<Level>) -> Vec<Level> {
        let mut kept: Vec<Level> = levels
            .into_iter()
            .filter(|level| floor.is_none_or(|floor| *level > floor))
            .collect();
        kept.sort_unstable();
        kept.dedup();
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BPC: u64 = 4096;

    #[test]
    fn test_parse_since() {
        assert_eq!("level:100".parse::<Since>().unwrap(), Since::Level(100));
        assert_eq!("cycle:2".parse::<Since>().unwrap(), Since::Cycle(2));
        assert_eq!("1234".parse::<Since>().unwrap(), Since::Level(1234));
        assert_eq!(" cycle : 7 ".parse::<Since>().unwrap(), Since::Cycle(7));
    }

    #[test]
    fn test_parse_since_rejects_malformed() {
        for bad in ["time:5", "cycle:", "level:abc", "cycle:-1", "yesterday", "", "a:b:c"] {
            assert!(
                matches!(bad.parse::<Since>(), Err(HistoryError::InvalidSince(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_resolve() {
        let filter = WindowFilter::new(BPC);
        assert_eq!(filter.resolve(Some(Since::Level(100))), Some(100));
        assert_eq!(filter.resolve(Some(Since::Cycle(2))), Some(8192));
        assert_eq!(filter.resolve(None), None);
    }

    #[test]
    fn test_filter_is_strict() {
        let filter = WindowFilter::new(BPC);
        assert_eq!(filter.filter([50, 100, 150], Some(100)), vec![150]);
        assert_eq!(filter.filter([150, 50, 100, 50], None), vec![50, 100, 150]);
        assert!(filter.filter([50, 100], Some(100)).is_empty());
    }

    #[test]
    fn test_since_serde() {
        let since: Since = serde_json::from_str("\"cycle:3\"").unwrap();
        assert_eq!(since, Since::Cycle(3));
        let since: Since = serde_json::from_str("42").unwrap();
        assert_eq!(since, Since::Level(42));
        assert!(serde_json::from_str::<Since>("\"week:1\"").is_err());
        assert_eq!(serde_json::to_string(&Since::Level(9)).unwrap(), "\"level:9\"");
    }
}
