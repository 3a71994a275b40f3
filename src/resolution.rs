//! The fixed calendar resolution ladder.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TallyError;

/// A calendar granularity that counters are bucketed at.
///
/// Variants are declared finest-first, so the derived `Ord` reads as
/// "coarser than": `Resolution::Year > Resolution::Second`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// One calendar second.
    Second,
    /// One calendar minute.
    Minute,
    /// One calendar hour.
    Hour,
    /// One calendar day.
    Day,
    /// One ISO-8601 week, Monday through Sunday.
    Week,
    /// One calendar month.
    Month,
    /// One calendar year.
    Year,
}

impl Resolution {
    /// Every resolution, finest first.
    pub const ALL: [Resolution; 7] = [
        Resolution::Second,
        Resolution::Minute,
        Resolution::Hour,
        Resolution::Day,
        Resolution::Week,
        Resolution::Month,
        Resolution::Year,
    ];

    /// Every resolution, coarsest first. This is the order key chains are built in.
    pub const DESCENDING: [Resolution; 7] = [
        Resolution::Year,
        Resolution::Month,
        Resolution::Week,
        Resolution::Day,
        Resolution::Hour,
        Resolution::Minute,
        Resolution::Second,
    ];

    /// Position on the ladder, 0 for second through 6 for year.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns the lowercase token used in configuration and by string-based callers.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Second => "second",
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Parses a resolution token, failing with [`TallyError::InvalidResolution`].
    pub fn parse(token: &str) -> Result<Self, TallyError> {
        token.parse()
    }

    /// Returns `true` if `self` is strictly coarser than `other` on the ladder.
    pub fn is_coarser_than(self, other: Resolution) -> bool {
        self > other
    }

    /// Returns `true` if every period of `self` is an exact union of `finer` periods.
    ///
    /// This holds for any pair on the ladder except month and year over week:
    /// weeks straddle month and year boundaries.
    pub fn tiles(self, finer: Resolution) -> bool {
        if self < finer {
            return false;
        }
        !(finer == Self::Week && matches!(self, Self::Month | Self::Year))
    }

    /// Resolutions usable when decomposing a window snapped to `min`, coarsest first.
    pub fn candidates_for(min: Resolution) -> Vec<Resolution> {
        Self::DESCENDING
            .into_iter()
            .filter(|candidate| candidate.tiles(min))
            .collect()
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = TallyError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "second" => Ok(Self::Second),
            "minute" => Ok(Self::Minute),
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            other => Err(TallyError::InvalidResolution(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_order() {
        for pair in Resolution::ALL.windows(2) {
            assert!(pair[1].is_coarser_than(pair[0]));
            assert_eq!(pair[1].index(), pair[0].index() + 1);
        }
        let mut descending = Resolution::ALL;
        descending.reverse();
        assert_eq!(descending, Resolution::DESCENDING);
    }

    #[test]
    fn test_parse_tokens() {
        for resolution in Resolution::ALL {
            assert_eq!(Resolution::parse(resolution.as_str()).unwrap(), resolution);
            assert_eq!(resolution.to_string(), resolution.as_str());
        }
    }

    #[test]
    fn test_parse_rejects_unknown() {
        match Resolution::parse("fortnight") {
            Err(TallyError::InvalidResolution(token)) => assert_eq!(token, "fortnight"),
            other => panic!("Expected InvalidResolution, got {other:?}"),
        }
        assert!(Resolution::parse("Minute").is_err());
        assert!(Resolution::parse("").is_err());
    }

    #[test]
    fn test_week_does_not_tile_into_month() {
        assert!(Resolution::Month.tiles(Resolution::Day));
        assert!(Resolution::Week.tiles(Resolution::Day));
        assert!(Resolution::Week.tiles(Resolution::Week));
        assert!(!Resolution::Month.tiles(Resolution::Week));
        assert!(!Resolution::Year.tiles(Resolution::Week));
        assert!(!Resolution::Day.tiles(Resolution::Week));
    }

    #[test]
    fn test_candidates_for() {
        assert_eq!(
            Resolution::candidates_for(Resolution::Day),
            vec![
                Resolution::Year,
                Resolution::Month,
                Resolution::Week,
                Resolution::Day
            ]
        );
        assert_eq!(
            Resolution::candidates_for(Resolution::Week),
            vec![Resolution::Week]
        );
        assert_eq!(
            Resolution::candidates_for(Resolution::Month),
            vec![Resolution::Year, Resolution::Month]
        );
        assert_eq!(Resolution::candidates_for(Resolution::Second).len(), 7);
    }
}
