//! Error types.

use std::fmt;

use crate::clock::CalendarTime;
use crate::store::StoreError;

/// Result alias used throughout the crate.
pub type Result<T, E = TallyError> = std::result::Result<T, E>;

/// Errors returned by [`crate::Tally`] operations.
#[derive(Debug)]
pub enum TallyError {
    /// A resolution token did not name a rung of the calendar ladder.
    InvalidResolution(String),
    /// A query would read more buckets than the configured ceiling allows.
    FetchLimitExceeded {
        /// Number of buckets the query needed.
        requested: usize,
        /// Configured fetch-count ceiling.
        limit: usize,
    },
    /// The backing store failed. Increments that already landed are not rolled back.
    Store(StoreError),
    /// A range bound lies outside [`CalendarTime::earliest`]..=[`CalendarTime::latest`],
    /// where the periods around it cannot be represented.
    OutOfRange(CalendarTime),
    /// A total does not fit in an `i64`.
    TotalOverflow {
        /// Metric being summed.
        metric: String,
    },
    /// The range decomposition guard tripped.
    ///
    /// This indicates a window at the edge of the representable calendar or a
    /// programming error; it never fires for well-formed inputs.
    DecompositionNonTermination {
        /// Recursion depth reached when the guard fired.
        depth: usize,
        /// The window being decomposed.
        window: (CalendarTime, CalendarTime),
    },
}

impl fmt::Display for TallyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TallyError::InvalidResolution(token) => {
                write!(f, "invalid resolution '{token}'")
            }
            TallyError::FetchLimitExceeded { requested, limit } => write!(
                f,
                "operation would require {requested} bucket reads, over the fetch limit of {limit}"
            ),
            TallyError::Store(e) => write!(f, "store error: {e}"),
            TallyError::OutOfRange(time) => write!(
                f,
                "{time} is outside the supported range {} to {}",
                CalendarTime::earliest(),
                CalendarTime::latest()
            ),
            TallyError::TotalOverflow { metric } => {
                write!(f, "total of '{metric}' overflows a 64-bit counter")
            }
            TallyError::DecompositionNonTermination { depth, window } => write!(
                f,
                "range decomposition of {} to {} did not terminate (depth {depth})",
                window.0, window.1
            ),
        }
    }
}

impl std::error::Error for TallyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TallyError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for TallyError {
    fn from(err: StoreError) -> Self {
        TallyError::Store(err)
    }
}
