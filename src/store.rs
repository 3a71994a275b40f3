//! The backing store contract.
//!
//! Counters live in a hash-of-fields store: the metric name is the hash, each bucket
//! key is a field. Any store that offers Redis-style `HINCRBY`, `HGET` and `HMGET`
//! semantics can back a [`crate::Tally`].

use std::fmt;
use std::io;
use std::sync::Arc;

/// Error reported by a [`HashStore`] implementation.
#[derive(Debug)]
pub enum StoreError {
    /// The store could not serve the request.
    Unavailable(String),
    /// Incrementing the field would overflow its integer range.
    Overflow {
        /// Hash the field belongs to.
        hash: String,
        /// Field that would have overflowed.
        field: String,
    },
    /// An I/O error occurred talking to the store.
    Io(io::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(reason) => write!(f, "store unavailable: {reason}"),
            StoreError::Overflow { hash, field } => {
                write!(f, "increment of '{hash}'/'{field}' overflows")
            }
            StoreError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        StoreError::Io(err)
    }
}

/// A hash-of-integer-fields store.
///
/// A field that was never written is absent (`None`), which is distinct from a field
/// whose value is zero. Implementations must accept concurrent `increment` calls on
/// different fields of the same hash.
pub trait HashStore: Send + Sync {
    /// Adds `delta` to `field` of `hash`, creating the field at `delta` if absent.
    fn increment(&self, hash: &str, field: &str, delta: i64) -> Result<(), StoreError>;

    /// Reads a single field.
    fn read_one(&self, hash: &str, field: &str) -> Result<Option<i64>, StoreError>;

    /// Reads several fields at once. The result has one entry per field, in order.
    fn read_many(&self, hash: &str, fields: &[String]) -> Result<Vec<Option<i64>>, StoreError>;
}

impl<S: HashStore + ?Sized> HashStore for Arc<S> {
    fn increment(&self, hash: &str, field: &str, delta: i64) -> Result<(), StoreError> {
        (**self).increment(hash, field, delta)
    }

    fn read_one(&self, hash: &str, field: &str) -> Result<Option<i64>, StoreError> {
        (**self).read_one(hash, field)
    }

    fn read_many(&self, hash: &str, fields: &[String]) -> Result<Vec<Option<i64>>, StoreError> {
        (**self).read_many(hash, fields)
    }
}

impl<S: HashStore + ?Sized> HashStore for &S {
    fn increment(&self, hash: &str, field: &str, delta: i64) -> Result<(), StoreError> {
        (**self).increment(hash, field, delta)
    }

    fn read_one(&self, hash: &str, field: &str) -> Result<Option<i64>, StoreError> {
        (**self).read_one(hash, field)
    }

    fn read_many(&self, hash: &str, fields: &[String]) -> Result<Vec<Option<i64>>, StoreError> {
        (**self).read_many(hash, fields)
    }
}
