//! Tally configuration and builder.

use serde::{Deserialize, Serialize};

use crate::resolution::Resolution;
use crate::store::HashStore;
use crate::strategy::DEFAULT_MAX_DEPTH;
use crate::tally::Tally;

/// How a single increment is spread over its buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanOut {
    /// Increment buckets one after another, stopping at the first failure.
    #[default]
    Sequential,
    /// Increment every bucket on its own scoped thread.
    ///
    /// Worth it when each store call is a network round trip.
    Parallel,
}

/// Runtime configuration of a [`Tally`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    /// Maximum number of buckets a single range or total query may read. 0 disables the check.
    pub fetch_limit: usize,
    /// Resolution used by [`Tally::increment_by_name`] when the token is not recognised.
    ///
    /// `None` rejects unknown tokens with [`crate::TallyError::InvalidResolution`].
    pub fallback_resolution: Option<Resolution>,
    /// Fan-out mode for increments.
    pub fan_out: FanOut,
    /// Recursion limit for range decomposition.
    pub max_decomposition_depth: usize,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            fetch_limit: 0,
            fallback_resolution: None,
            fan_out: FanOut::Sequential,
            max_decomposition_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Builder for configuring a [`Tally`].
///
/// # Example
///
/// ```
/// use tally::{MemoryStore, Resolution, TallyBuilder};
///
/// let tally = TallyBuilder::new()
///     .fetch_limit(1_000)
///     .fallback_resolution(Resolution::Minute)
///     .build(MemoryStore::new());
/// assert_eq!(tally.config().fetch_limit, 1_000);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TallyBuilder {
    config: TallyConfig,
}

impl TallyBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration.
    pub fn from_config(config: TallyConfig) -> Self {
        Self { config }
    }

    /// Sets the fetch-count ceiling.
    ///
    /// Range and total queries that would read more than `limit` buckets fail with
    /// [`crate::TallyError::FetchLimitExceeded`]. This guards against scans such as
    /// twenty years at second resolution.
    ///
    /// Default: 0 (disabled)
    #[must_use]
    pub fn fetch_limit(mut self, limit: usize) -> Self {
        self.config.fetch_limit = limit;
        self
    }

    /// Accepts unrecognised tokens on the string write path, storing at `resolution`.
    #[must_use]
    pub fn fallback_resolution(mut self, resolution: Resolution) -> Self {
        self.config.fallback_resolution = Some(resolution);
        self
    }

    /// Sets how increments fan out over their buckets.
    #[must_use]
    pub fn fan_out(mut self, fan_out: FanOut) -> Self {
        self.config.fan_out = fan_out;
        self
    }

    /// Sets the range decomposition recursion limit.
    #[must_use]
    pub fn max_decomposition_depth(mut self, depth: usize) -> Self {
        self.config.max_decomposition_depth = depth;
        self
    }

    /// Returns the configuration built so far.
    pub fn config(&self) -> &TallyConfig {
        &self.config
    }

    /// Creates the [`Tally`] over `store`.
    pub fn build<S: HashStore>(self, store: S) -> Tally<S> {
        Tally::with_config(store, self.config)
    }
}
