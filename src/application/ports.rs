//! Ports (interfaces) for the application layer.
//!
//! The logging core only needs four capabilities from the outside world: a
//! clock, a formatter, a byte sink and a history store. Infrastructure
//! provides the default adapters; tests swap in mocks.

use crate::application::registry::Registry;
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::io;
use std::sync::Arc;

/// Port for obtaining current time.
///
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Get the current wall-clock time.
    fn now(&self) -> DateTime<Utc>;
}

/// Port for rendering a registry.
pub trait Formatter: Send + Sync + Debug {
    /// Render a registry, including its prefix and suffix.
    fn format(&self, registry: &Registry) -> String;

    /// Turn the rendered text into the bytes handed to the sink.
    ///
    /// The default encoding is UTF-8.
    fn encode(&self, text: String) -> Vec<u8> {
        text.into_bytes()
    }
}

/// Port for the destination of rendered registries.
///
/// Implementations must write and flush the whole buffer under their own
/// mutual exclusion, so concurrent loggers sharing a sink never interleave
/// partial messages.
pub trait Sink: Send + Sync + Debug {
    /// Write the whole buffer and flush it.
    fn write(&self, bytes: &[u8]) -> io::Result<()>;
}

/// Port for the journal of finalized registries.
///
/// Appends and flushes may come from any thread at any time; queries must
/// observe either all or none of a concurrent append.
pub trait HistoryStore: Send + Sync + Debug {
    /// Append a registry at the end of the history.
    fn append(&self, registry: Arc<Registry>);

    /// Remove one registry, matched by its sequence number.
    fn remove(&self, registry: &Registry) -> bool;

    /// Check if a registry, matched by its sequence number, is present.
    fn contains(&self, registry: &Registry) -> bool;

    /// Number of registries currently kept.
    fn len(&self) -> usize;

    /// Check if the history is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every registry.
    fn flush(&self);

    /// Copy of the history, oldest first.
    fn snapshot(&self) -> Vec<Arc<Registry>>;

    /// Count the registries matching `predicate`.
    ///
    /// `predicate` may call back into the store, so implementations must not
    /// hold their own lock while evaluating it.
    fn count_where(&self, predicate: &dyn Fn(&Registry) -> bool) -> usize;

    /// The most recently appended registry matching `predicate`. The same
    /// locking rule as [`count_where`](HistoryStore::count_where) applies.
    fn last_where(&self, predicate: &dyn Fn(&Registry) -> bool) -> Option<Arc<Registry>>;
}
