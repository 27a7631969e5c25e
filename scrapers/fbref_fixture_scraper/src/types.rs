use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::LazyLock};

use crate::error::FixtureError;

pub const DEFAULT_SEASON: &str = "2024-2025";

static SEASON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{4}$").expect("season pattern is valid"));

/// A competition season such as `2023-2024`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Season(String);

impl Season {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Season {
    type Err = FixtureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if SEASON_RE.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(FixtureError::InvalidSeason(s.to_string()))
        }
    }
}

impl Default for Season {
    fn default() -> Self {
        Self(DEFAULT_SEASON.to_string())
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One fixture row. Field order is the CSV column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureRecord {
    pub week: Option<u32>,
    pub day: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub home: Option<String>,
    pub away: Option<String>,
    pub score: Option<String>,
    pub attendance: Option<u64>,
    pub venue: Option<String>,
    pub referee: Option<String>,
    pub match_report: Option<String>,
}

impl FixtureRecord {
    pub const HEADERS: [&'static str; 11] = [
        "week",
        "day",
        "date",
        "time",
        "home",
        "away",
        "score",
        "attendance",
        "venue",
        "referee",
        "match_report",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_season() {
        let season: Season = "2023-2024".parse().unwrap();
        assert_eq!(season.as_str(), "2023-2024");
        assert_eq!(" 2023-2024 ".parse::<Season>().unwrap(), season);
        assert_eq!(Season::default().to_string(), "2024-2025");
    }

    #[test]
    fn test_reject_malformed_season() {
        for bad in ["2023", "2023/2024", "23-24", "2023-2024-2025", "", "abcd-efgh"] {
            assert!(
                matches!(bad.parse::<Season>(), Err(FixtureError::InvalidSeason(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
