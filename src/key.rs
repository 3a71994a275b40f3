//! Bucket key encoding.
//!
//! Every resolution writes into the same hash, so keys are shaped to stay distinct
//! across resolutions as well as across periods: the number of `-` separated
//! segments identifies the resolution, and week keys carry a `w` marker.
//!
//! | resolution | key               |
//! |------------|-------------------|
//! | year       | `2015`            |
//! | month      | `2015-0`          |
//! | week       | `2015-w-1`        |
//! | day        | `2015-0-1`        |
//! | hour       | `2015-0-1-13`     |
//! | minute     | `2015-0-1-13-5`   |
//! | second     | `2015-0-1-13-5-9` |
//!
//! Months are 0-based. Week keys use the ISO week-numbering year.

use std::fmt;

use crate::clock::CalendarTime;
use crate::error::Result;
use crate::resolution::Resolution;

/// Returns the key of the bucket holding `time` at `resolution`.
pub fn bucket_key(time: &CalendarTime, resolution: Resolution) -> String {
    let year = time.year();
    let month = time.month0();
    let day = time.day();
    match resolution {
        Resolution::Year => year.to_string(),
        Resolution::Month => format!("{year}-{month}"),
        Resolution::Week => {
            let (week_year, week) = time.iso_week();
            format!("{week_year}-w-{week}")
        }
        Resolution::Day => format!("{year}-{month}-{day}"),
        Resolution::Hour => format!("{year}-{month}-{day}-{}", time.hour()),
        Resolution::Minute => {
            format!("{year}-{month}-{day}-{}-{}", time.hour(), time.minute())
        }
        Resolution::Second => format!(
            "{year}-{month}-{day}-{}-{}-{}",
            time.hour(),
            time.minute(),
            time.second()
        ),
    }
}

/// Returns `(resolution, key)` for every resolution from year down to `lowest` inclusive.
pub fn bucket_key_chain(time: &CalendarTime, lowest: Resolution) -> Vec<(Resolution, String)> {
    Resolution::DESCENDING
        .into_iter()
        .take_while(|resolution| *resolution >= lowest)
        .map(|resolution| (resolution, bucket_key(time, resolution)))
        .collect()
}

/// Like [`bucket_key_chain`], with the lowest resolution given as a token.
pub fn bucket_key_chain_named(
    time: &CalendarTime,
    lowest: &str,
) -> Result<Vec<(Resolution, String)>> {
    Ok(bucket_key_chain(time, Resolution::parse(lowest)?))
}

/// One calendar period at a given resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    resolution: Resolution,
    start: CalendarTime,
}

impl Period {
    /// The period at `resolution` that contains `time`.
    pub fn containing(time: &CalendarTime, resolution: Resolution) -> Self {
        Self {
            resolution,
            start: time.start_of(resolution),
        }
    }

    /// Resolution of the period.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// First second of the period.
    pub fn start(&self) -> CalendarTime {
        self.start
    }

    /// First second after the period.
    pub fn end_exclusive(&self) -> CalendarTime {
        self.start.add(1, self.resolution)
    }

    /// Last second of the period.
    pub fn end(&self) -> CalendarTime {
        self.start.end_of(self.resolution)
    }

    /// The period immediately after this one.
    pub fn next(&self) -> Self {
        Self {
            resolution: self.resolution,
            start: self.end_exclusive(),
        }
    }

    /// Store key for this period's bucket.
    pub fn key(&self) -> String {
        bucket_key(&self.start, self.resolution)
    }

    /// Identifier of the period start, as used in range results.
    pub fn label(&self) -> String {
        self.start.label()
    }

    /// Returns `true` if `time` falls within this period.
    pub fn contains(&self, time: &CalendarTime) -> bool {
        self.start <= *time && *time < self.end_exclusive()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.resolution, self.start)
    }
}
