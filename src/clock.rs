//! Calendar-aware timestamp arithmetic.
//!
//! A [`CalendarTime`] is a wall-clock instant in whatever zone the caller chose to
//! interpret its timestamps in. Every operation works on calendar fields, so a month
//! step from January 31st lands on the last day of February rather than 31 days later.
//!
//! Any instant chrono can represent is a valid `CalendarTime`, but period arithmetic
//! only holds between [`CalendarTime::earliest`] and [`CalendarTime::latest`]: outside
//! them a containing week or the start of the following year may not be representable.

use std::fmt;

use chrono::{
    DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound,
    TimeDelta, TimeZone, Timelike,
};

use crate::resolution::Resolution;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 3_600;
const SECONDS_PER_DAY: i64 = 86_400;
const SECONDS_PER_WEEK: i64 = 604_800;

/// Format of the identifier produced by [`CalendarTime::label`].
pub const LABEL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A second-precision wall-clock timestamp with calendar arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarTime(NaiveDateTime);

impl CalendarTime {
    /// Wraps a wall-clock timestamp, dropping any sub-second component.
    pub fn new(datetime: NaiveDateTime) -> Self {
        Self(datetime.trunc_subsecs(0))
    }

    /// Builds a timestamp from calendar fields. `month` is 1-based here, as in chrono.
    ///
    /// Returns `None` if the fields do not name a valid date and time.
    pub fn from_ymd_hms(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day)?
            .and_hms_opt(hour, minute, second)
            .map(Self)
    }

    /// First instant whose periods are all representable: January 1st of the year
    /// after chrono's earliest year.
    pub fn earliest() -> Self {
        Self(NaiveDate::MIN.and_time(NaiveTime::MIN)).add(1, Resolution::Year)
    }

    /// Last instant whose periods are all representable: the final second of the year
    /// before chrono's latest year.
    pub fn latest() -> Self {
        Self::new(NaiveDateTime::MAX)
            .start_of(Resolution::Year)
            .add(-1, Resolution::Second)
    }

    /// Returns `true` if `self` lies between [`CalendarTime::earliest`] and
    /// [`CalendarTime::latest`].
    pub fn is_supported(&self) -> bool {
        Self::earliest() <= *self && *self <= Self::latest()
    }

    /// Returns the underlying wall-clock value.
    pub fn naive(&self) -> NaiveDateTime {
        self.0
    }

    /// Calendar year.
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Month of the year, 0 for January through 11 for December.
    pub fn month0(&self) -> u32 {
        self.0.month0()
    }

    /// Day of the month, starting at 1.
    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// Hour of the day.
    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    /// Minute of the hour.
    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    /// Second of the minute.
    pub fn second(&self) -> u32 {
        self.0.second()
    }

    /// ISO-8601 week-numbering year and week (1 to 53).
    pub fn iso_week(&self) -> (i32, u32) {
        let week = self.0.iso_week();
        (week.year(), week.week())
    }

    /// Returns the first second of the period containing `self` at `resolution`.
    ///
    /// A week starting before chrono's earliest date is clamped to that date.
    pub fn start_of(&self, resolution: Resolution) -> Self {
        let date = self.0.date();
        let midnight = |days_back: u32| {
            let start = date
                .checked_sub_days(Days::new(u64::from(days_back)))
                .unwrap_or(NaiveDate::MIN);
            Self(start.and_time(NaiveTime::MIN))
        };
        match resolution {
            Resolution::Second => *self,
            Resolution::Minute => Self(self.0 - TimeDelta::seconds(i64::from(self.second()))),
            Resolution::Hour => Self(
                self.0
                    - TimeDelta::seconds(
                        i64::from(self.minute()) * SECONDS_PER_MINUTE + i64::from(self.second()),
                    ),
            ),
            Resolution::Day => midnight(0),
            Resolution::Week => midnight(date.weekday().num_days_from_monday()),
            Resolution::Month => midnight(date.day0()),
            Resolution::Year => midnight(date.ordinal0()),
        }
    }

    /// Returns the last second of the period containing `self` at `resolution`.
    pub fn end_of(&self, resolution: Resolution) -> Self {
        self.start_of(resolution)
            .add(1, resolution)
            .add(-1, Resolution::Second)
    }

    /// Moves `n` whole steps of `resolution`, which may be negative.
    ///
    /// Month and year steps clamp to the last valid day of the target month. The result
    /// saturates at the edges of the representable calendar range.
    pub fn add(&self, n: i64, resolution: Resolution) -> Self {
        let saturated = if n < 0 {
            NaiveDateTime::MIN
        } else {
            NaiveDateTime::MAX
        };
        let shifted = match resolution {
            Resolution::Month => add_months(self.0, n),
            Resolution::Year => n.checked_mul(12).and_then(|months| add_months(self.0, months)),
            fixed => n
                .checked_mul(fixed_seconds(fixed))
                .and_then(TimeDelta::try_seconds)
                .and_then(|delta| self.0.checked_add_signed(delta)),
        };
        Self::new(shifted.unwrap_or(saturated))
    }

    /// Number of whole `resolution` steps that can be taken from `self` without passing
    /// `later`. Negative when `later` precedes `self`.
    pub fn units_between(&self, later: &Self, resolution: Resolution) -> i64 {
        if later < self {
            return -later.units_between(self, resolution);
        }
        match resolution {
            Resolution::Month => {
                let months = i64::from(later.year() - self.year()) * 12
                    + i64::from(later.month0())
                    - i64::from(self.month0());
                step_back_if_past(self, later, months, Resolution::Month)
            }
            Resolution::Year => {
                let years = i64::from(later.year() - self.year());
                step_back_if_past(self, later, years, Resolution::Year)
            }
            fixed => (later.0 - self.0).num_seconds() / fixed_seconds(fixed),
        }
    }

    /// Returns `true` if both timestamps fall in the same period at `resolution`.
    pub fn same_period(&self, other: &Self, resolution: Resolution) -> bool {
        self.start_of(resolution) == other.start_of(resolution)
    }

    /// Identifier used for period starts in range results, e.g. `2015-01-31T00:00:00`.
    pub fn label(&self) -> String {
        self.0.format(LABEL_FORMAT).to_string()
    }
}

fn fixed_seconds(resolution: Resolution) -> i64 {
    match resolution {
        Resolution::Second => 1,
        Resolution::Minute => SECONDS_PER_MINUTE,
        Resolution::Hour => SECONDS_PER_HOUR,
        Resolution::Day => SECONDS_PER_DAY,
        Resolution::Week => SECONDS_PER_WEEK,
        Resolution::Month | Resolution::Year => {
            unreachable!("{resolution} has no fixed length")
        }
    }
}

fn add_months(datetime: NaiveDateTime, months: i64) -> Option<NaiveDateTime> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months < 0 {
        datetime.checked_sub_months(magnitude)
    } else {
        datetime.checked_add_months(magnitude)
    }
}

fn step_back_if_past(
    start: &CalendarTime,
    later: &CalendarTime,
    steps: i64,
    resolution: Resolution,
) -> i64 {
    if steps > 0 && start.add(steps, resolution) > *later {
        steps - 1
    } else {
        steps
    }
}

impl fmt::Display for CalendarTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(LABEL_FORMAT))
    }
}

impl From<NaiveDateTime> for CalendarTime {
    fn from(datetime: NaiveDateTime) -> Self {
        Self::new(datetime)
    }
}

impl From<NaiveDate> for CalendarTime {
    fn from(date: NaiveDate) -> Self {
        Self(date.and_time(NaiveTime::MIN))
    }
}

/// Interprets a zoned timestamp by its local wall clock in that zone.
impl<Tz: TimeZone> From<DateTime<Tz>> for CalendarTime {
    fn from(datetime: DateTime<Tz>) -> Self {
        Self::new(datetime.naive_local())
    }
}
