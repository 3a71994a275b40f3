//! Counters bucketed by calendar period.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::clock::CalendarTime;
use crate::config::{FanOut, TallyConfig};
use crate::error::{Result, TallyError};
use crate::key::{Period, bucket_key, bucket_key_chain};
use crate::resolution::Resolution;
use crate::store::{HashStore, StoreError};
use crate::strategy::{DecompositionPlan, build_plan, check_supported};

/// One period of a range read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangePoint {
    /// The period read.
    pub period: Period,
    /// Counter value, 0 if the bucket was never written.
    pub value: i64,
}

impl RangePoint {
    /// Identifier of the period start, e.g. `2015-01-01T00:00:00`.
    pub fn label(&self) -> String {
        self.period.label()
    }
}

/// Incrementing counters stored against timestamps at several calendar resolutions.
///
/// Each metric is one hash in the backing store and each bucket one field, so a single
/// `increment` touches one field per resolution, and totals over long windows read a
/// handful of coarse buckets instead of every fine one.
///
/// # Example
///
/// ```
/// use tally::{CalendarTime, MemoryStore, Resolution, Tally};
///
/// # fn main() -> Result<(), tally::TallyError> {
/// let tally = Tally::new(MemoryStore::new());
/// let jan = CalendarTime::from_ymd_hms(2015, 1, 1, 0, 0, 0).unwrap();
/// let feb = CalendarTime::from_ymd_hms(2015, 2, 1, 0, 0, 0).unwrap();
///
/// tally.increment("signups", jan, 5, Resolution::Day)?;
/// tally.increment("signups", feb, 3, Resolution::Day)?;
///
/// assert_eq!(tally.get_total("signups", jan, feb, Resolution::Day)?, 8);
/// # Ok(())
/// # }
/// ```
pub struct Tally<S> {
    store: S,
    config: ArcSwap<TallyConfig>,
}

impl<S: HashStore> Tally<S> {
    /// Creates a tally over `store` with default configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, TallyConfig::default())
    }

    /// Creates a tally over `store` with `config`.
    pub fn with_config(store: S, config: TallyConfig) -> Self {
        Self {
            store,
            config: ArcSwap::from_pointee(config),
        }
    }

    /// Current configuration.
    pub fn config(&self) -> Arc<TallyConfig> {
        self.config.load_full()
    }

    /// Replaces the configuration. Queries already running keep the one they started with.
    pub fn update_config(&self, config: TallyConfig) {
        self.config.store(Arc::new(config));
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consumes the tally, returning the backing store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Adds `delta` to every bucket of `metric` containing `at`, from year down to `lowest`.
    ///
    /// Buckets are updated independently and never rolled back. Which buckets are left
    /// written after a store failure depends on [`FanOut`]:
    ///
    /// - [`FanOut::Sequential`] (the default) writes from year downwards and stops at the
    ///   first failure, so only the coarser buckets before it are applied.
    /// - [`FanOut::Parallel`] attempts every bucket, so all but the failed ones are applied.
    ///
    /// Either way the first error is returned.
    pub fn increment(
        &self,
        metric: &str,
        at: impl Into<CalendarTime>,
        delta: i64,
        lowest: Resolution,
    ) -> Result<()> {
        let at = at.into();
        let chain = bucket_key_chain(&at, lowest);
        let fan_out = self.config.load().fan_out;

        match fan_out {
            FanOut::Sequential => {
                for (_, key) in &chain {
                    self.store.increment(metric, key, delta)?;
                }
            }
            FanOut::Parallel => {
                let store = &self.store;
                let results: Vec<std::result::Result<(), StoreError>> =
                    std::thread::scope(|s| {
                        let handles: Vec<_> = chain
                            .iter()
                            .map(|(_, key)| s.spawn(move || store.increment(metric, key, delta)))
                            .collect();
                        handles
                            .into_iter()
                            .map(|handle| {
                                handle.join().unwrap_or_else(|_| {
                                    Err(StoreError::Unavailable(
                                        "increment thread panicked".to_string(),
                                    ))
                                })
                            })
                            .collect()
                    });
                results.into_iter().collect::<std::result::Result<(), _>>()?;
            }
        }

        #[cfg(feature = "logging")]
        log::trace!("Incremented {} buckets of '{metric}' by {delta}", chain.len());

        Ok(())
    }

    /// Like [`Tally::increment`], with the lowest resolution given as a token.
    ///
    /// Unrecognised tokens fail with [`TallyError::InvalidResolution`] unless a
    /// fallback resolution is configured, in which case the fallback is used.
    pub fn increment_by_name(
        &self,
        metric: &str,
        at: impl Into<CalendarTime>,
        delta: i64,
        lowest: &str,
    ) -> Result<()> {
        let lowest = match Resolution::parse(lowest) {
            Ok(resolution) => resolution,
            Err(err) => match self.config.load().fallback_resolution {
                Some(fallback) => {
                    #[cfg(feature = "logging")]
                    log::warn!("Unknown resolution '{lowest}' for '{metric}', using {fallback}");
                    fallback
                }
                None => return Err(err),
            },
        };
        self.increment(metric, at, delta, lowest)
    }

    /// Reads the buckets containing `at` at each of `resolutions`.
    ///
    /// Buckets that were never written map to `None`.
    pub fn get(
        &self,
        metric: &str,
        at: impl Into<CalendarTime>,
        resolutions: &[Resolution],
    ) -> Result<BTreeMap<Resolution, Option<i64>>> {
        let at = at.into();
        let resolutions: Vec<Resolution> = resolutions
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .rev()
            .collect();

        let values = match resolutions.as_slice() {
            [] => Vec::new(),
            [single] => vec![self.store.read_one(metric, &bucket_key(&at, *single))?],
            many => {
                let keys: Vec<String> = many
                    .iter()
                    .map(|resolution| bucket_key(&at, *resolution))
                    .collect();
                self.store.read_many(metric, &keys)?
            }
        };

        Ok(resolutions.into_iter().zip(values).collect())
    }

    /// Reads every `resolution` period from the one containing `start` through the one
    /// containing `end`, in chronological order, with no gaps.
    ///
    /// The bounds may be given in either order. Missing buckets read as 0.
    pub fn get_range(
        &self,
        metric: &str,
        start: impl Into<CalendarTime>,
        end: impl Into<CalendarTime>,
        resolution: Resolution,
    ) -> Result<Vec<RangePoint>> {
        let (start, end) = ordered(start.into(), end.into());
        check_supported(start)?;
        check_supported(end)?;
        let first = Period::containing(&start, resolution);
        let last = Period::containing(&end, resolution);

        let iterations = first.start().units_between(&last.start(), resolution);
        let count = usize::try_from(iterations)
            .ok()
            .and_then(|iterations| iterations.checked_add(1))
            .unwrap_or(usize::MAX);
        self.check_fetch_limit(count)?;

        let periods: Vec<Period> = std::iter::successors(Some(first), |period| Some(period.next()))
            .take(count)
            .collect();
        let values = self.read_periods(metric, &periods)?;

        Ok(periods
            .into_iter()
            .zip(values)
            .map(|(period, value)| RangePoint {
                period,
                value: value.unwrap_or(0),
            })
            .collect())
    }

    /// Plans the bucket reads [`Tally::get_total`] would issue for the window.
    pub fn plan(
        &self,
        start: impl Into<CalendarTime>,
        end: impl Into<CalendarTime>,
        min: Resolution,
    ) -> Result<DecompositionPlan> {
        let max_depth = self.config.load().max_decomposition_depth;
        build_plan(start.into(), end.into(), min, max_depth)
    }

    /// Sums `metric` over the window snapped to `min`, reading as few buckets as possible.
    ///
    /// Relies on every bucket from year down to `min` having been populated, i.e. on
    /// increments made with a lowest resolution at or below `min`. A total beyond the
    /// `i64` range fails with [`TallyError::TotalOverflow`].
    pub fn get_total(
        &self,
        metric: &str,
        start: impl Into<CalendarTime>,
        end: impl Into<CalendarTime>,
        min: Resolution,
    ) -> Result<i64> {
        let plan = self.plan(start, end, min)?;
        self.check_fetch_limit(plan.len())?;
        let values = self.store.read_many(metric, &plan.keys())?;
        sum(metric, values.into_iter().flatten())
    }

    /// Sums `metric` over the window by reading every `min` bucket in it.
    ///
    /// Returns the same total as [`Tally::get_total`] at a higher read cost.
    pub fn basic_total(
        &self,
        metric: &str,
        start: impl Into<CalendarTime>,
        end: impl Into<CalendarTime>,
        min: Resolution,
    ) -> Result<i64> {
        let range = self.get_range(metric, start, end, min)?;
        sum(metric, range.into_iter().map(|point| point.value))
    }

    fn check_fetch_limit(&self, requested: usize) -> Result<()> {
        let limit = self.config.load().fetch_limit;
        if limit > 0 && requested > limit {
            #[cfg(feature = "logging")]
            log::warn!("Rejected query needing {requested} bucket reads (limit {limit})");
            return Err(TallyError::FetchLimitExceeded { requested, limit });
        }
        Ok(())
    }

    fn read_periods(&self, metric: &str, periods: &[Period]) -> Result<Vec<Option<i64>>> {
        if let [single] = periods {
            return Ok(vec![self.store.read_one(metric, &single.key())?]);
        }
        let keys: Vec<String> = periods.iter().map(Period::key).collect();
        Ok(self.store.read_many(metric, &keys)?)
    }
}

impl<S> std::fmt::Debug for Tally<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tally")
            .field("config", &self.config.load_full())
            .finish_non_exhaustive()
    }
}

fn ordered(a: CalendarTime, b: CalendarTime) -> (CalendarTime, CalendarTime) {
    if b < a { (b, a) } else { (a, b) }
}

fn sum(metric: &str, mut values: impl Iterator<Item = i64>) -> Result<i64> {
    values.try_fold(0i64, |total, value| {
        total.checked_add(value).ok_or_else(|| TallyError::TotalOverflow {
            metric: metric.to_string(),
        })
    })
}
