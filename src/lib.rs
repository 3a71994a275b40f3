//! # tally
//!
//! Incrementing counters stored against timestamps at calendar resolutions from
//! second up to year, with point, range and total queries.
//!
//! A single increment is fanned out to one bucket per resolution of interest. Totals
//! over arbitrary windows are then answered by decomposing the window into the
//! coarsest buckets that fit inside it, so a year at day resolution is one read rather
//! than 365.
//!
//! ## Features
//!
//! - **Calendar-aware buckets**: months and years have their real lengths, weeks are ISO weeks
//! - **Pluggable storage**: anything implementing [`HashStore`] (Redis-style hashes) can back a tally
//! - **Minimal-read totals**: [`Tally::get_total`] reads a mixed-resolution [`DecompositionPlan`]
//! - **Admission control**: an optional fetch-count ceiling rejects runaway scans
//!
//! ## Quick Start
//!
//! ```rust
//! use tally::{CalendarTime, MemoryStore, Resolution, Tally};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let tally = Tally::new(MemoryStore::new());
//!
//! let t = CalendarTime::from_ymd_hms(2015, 1, 1, 9, 30, 0).unwrap();
//! tally.increment("page.views", t, 1, Resolution::Minute)?;
//!
//! let end = CalendarTime::from_ymd_hms(2015, 3, 31, 0, 0, 0).unwrap();
//! for point in tally.get_range("page.views", t, end, Resolution::Month)? {
//!     println!("{}: {}", point.label(), point.value);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Consistency
//!
//! Buckets of one increment are written independently. A failed increment may leave
//! some resolutions updated and others not; callers needing atomicity across
//! resolutions must coordinate externally.

#![deny(missing_docs)]

pub mod clock;
pub mod config;
pub mod error;
pub mod key;
pub mod memory;
pub mod resolution;
pub mod store;
pub mod strategy;
pub mod tally;

pub use clock::CalendarTime;
pub use config::{FanOut, TallyBuilder, TallyConfig};
pub use error::{Result, TallyError};
pub use key::{Period, bucket_key, bucket_key_chain, bucket_key_chain_named};
pub use memory::MemoryStore;
pub use resolution::Resolution;
pub use store::{HashStore, StoreError};
pub use strategy::{DecompositionPlan, build_plan};
pub use tally::{RangePoint, Tally};
