//! Range decomposition.
//!
//! A window is covered with the coarsest buckets that fit entirely inside it, and the
//! leftover edges are covered recursively with progressively finer ones. A year-long
//! window at day resolution therefore costs one read instead of 365.
//!
//! Each recursion step works on a strictly smaller window and, because an edge left
//! over by resolution `R` is shorter than one `R` period, picks a strictly finer
//! resolution than its parent. Depth is bounded by the ladder length; the configured
//! depth limit and the progress checks below turn any violation into
//! [`TallyError::DecompositionNonTermination`] instead of unbounded recursion.

use crate::clock::CalendarTime;
use crate::error::{Result, TallyError};
use crate::key::Period;
use crate::resolution::Resolution;

/// Default recursion limit for [`build_plan`].
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// An ordered, gap-free and non-overlapping set of periods covering a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompositionPlan {
    min_resolution: Resolution,
    start: CalendarTime,
    end_exclusive: CalendarTime,
    periods: Vec<Period>,
}

impl DecompositionPlan {
    /// Minimum resolution the window was snapped to.
    pub fn min_resolution(&self) -> Resolution {
        self.min_resolution
    }

    /// The covered window as `[start, end_exclusive)`.
    pub fn window(&self) -> (CalendarTime, CalendarTime) {
        (self.start, self.end_exclusive)
    }

    /// Planned periods in chronological order.
    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    /// Number of bucket reads the plan needs.
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    /// A plan always covers at least one period; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Store keys of every planned bucket, in plan order.
    pub fn keys(&self) -> Vec<String> {
        self.periods.iter().map(Period::key).collect()
    }

    /// Iterates over the planned periods.
    pub fn iter(&self) -> std::slice::Iter<'_, Period> {
        self.periods.iter()
    }

    /// Returns `true` if the periods tile the window exactly, in order.
    pub fn covers(&self) -> bool {
        let Some(first) = self.periods.first() else {
            return false;
        };
        if first.start() != self.start {
            return false;
        }
        let contiguous = self
            .periods
            .windows(2)
            .all(|pair| pair[0].end_exclusive() == pair[1].start());
        contiguous
            && self
                .periods
                .last()
                .is_some_and(|last| last.end_exclusive() == self.end_exclusive)
    }
}

impl<'a> IntoIterator for &'a DecompositionPlan {
    type Item = &'a Period;
    type IntoIter = std::slice::Iter<'a, Period>;

    fn into_iter(self) -> Self::IntoIter {
        self.periods.iter()
    }
}

impl IntoIterator for DecompositionPlan {
    type Item = Period;
    type IntoIter = std::vec::IntoIter<Period>;

    fn into_iter(self) -> Self::IntoIter {
        self.periods.into_iter()
    }
}

/// Builds the smallest mixed-resolution plan covering `[start, end]` snapped to `min`.
///
/// The bounds may be given in either order. `end` is inclusive: the plan covers the
/// whole `min` period containing it. Bounds outside the supported calendar range fail
/// with [`TallyError::OutOfRange`].
pub fn build_plan(
    start: CalendarTime,
    end: CalendarTime,
    min: Resolution,
    max_depth: usize,
) -> Result<DecompositionPlan> {
    let (start, end) = if end < start { (end, start) } else { (start, end) };
    check_supported(start)?;
    check_supported(end)?;
    let candidates = Resolution::candidates_for(min);

    let mut periods = Vec::new();
    let mut decomposer = Decomposer {
        min,
        candidates: &candidates,
        max_depth,
        periods: &mut periods,
    };
    decomposer.decompose(start, end, 0)?;

    let plan = DecompositionPlan {
        min_resolution: min,
        start: start.start_of(min),
        end_exclusive: end.start_of(min).add(1, min),
        periods,
    };
    debug_assert!(plan.covers(), "plan does not tile its window: {plan:?}");

    #[cfg(feature = "logging")]
    log::debug!(
        "Planned {} bucket reads for {} to {} at {}",
        plan.len(),
        plan.start,
        plan.end_exclusive,
        min
    );

    Ok(plan)
}

/// Rejects instants whose surrounding periods cannot be represented.
pub(crate) fn check_supported(time: CalendarTime) -> Result<()> {
    if time.is_supported() {
        Ok(())
    } else {
        Err(TallyError::OutOfRange(time))
    }
}

struct Decomposer<'a> {
    min: Resolution,
    candidates: &'a [Resolution],
    max_depth: usize,
    periods: &'a mut Vec<Period>,
}

impl Decomposer<'_> {
    fn decompose(&mut self, start: CalendarTime, end: CalendarTime, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            return Err(self.stuck(start, end, depth));
        }
        if start.same_period(&end, self.min) {
            self.periods.push(Period::containing(&start, self.min));
            return Ok(());
        }

        let start = start.start_of(self.min);
        let last = end.start_of(self.min);
        let end_exclusive = last.add(1, self.min);

        let Some((resolution, first)) = self.largest_fit(start, end_exclusive) else {
            return Err(self.stuck(start, end, depth));
        };

        #[cfg(feature = "logging")]
        log::trace!(
            "Window {start} to {end_exclusive}: {resolution} buckets from {first} (depth {depth})"
        );

        if first > start {
            let front_last = first.add(-1, self.min);
            if front_last >= last {
                return Err(self.stuck(start, end, depth));
            }
            self.decompose(start, front_last, depth + 1)?;
        }

        let mut period = Period::containing(&first, resolution);
        while period.end_exclusive() <= end_exclusive {
            self.periods.push(period);
            let next = period.next();
            if next.start() <= period.start() {
                return Err(self.stuck(start, end, depth));
            }
            period = next;
        }

        let back_start = period.start();
        if back_start < end_exclusive {
            if back_start <= start {
                return Err(self.stuck(start, end, depth));
            }
            self.decompose(back_start, last, depth + 1)?;
        }

        Ok(())
    }

    /// Finds the coarsest candidate with a whole bucket inside `[start, end_exclusive)`,
    /// returning it with the start of its first such bucket.
    fn largest_fit(
        &self,
        start: CalendarTime,
        end_exclusive: CalendarTime,
    ) -> Option<(Resolution, CalendarTime)> {
        self.candidates
            .iter()
            .copied()
            .filter(|resolution| start.units_between(&end_exclusive, *resolution) > 0)
            .find_map(|resolution| {
                let mut first = start.start_of(resolution);
                if first < start {
                    first = first.add(1, resolution);
                }
                (first.add(1, resolution) <= end_exclusive).then_some((resolution, first))
            })
    }

    fn stuck(&self, start: CalendarTime, end: CalendarTime, depth: usize) -> TallyError {
        #[cfg(feature = "logging")]
        log::error!("Range decomposition of {start} to {end} stopped making progress at depth {depth}");

        TallyError::DecompositionNonTermination {
            depth,
            window: (start, end),
        }
    }
}
