//! Suppression filters shared by every logger of a factory.
//!
//! Before a builder finalizes, each filter may rewrite the payload, in
//! registration order, each one seeing the previous one's output. The
//! registry is then suppressed if any filter says so.

use crate::application::builder::Builder;
use crate::domain::payload::Payload;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// A suppression rule with an optional payload rewrite.
///
/// Plain closures `Fn(&Builder, Option<&Payload>) -> bool` are filters too.
///
/// # Example
/// ```
/// use logm::{Builder, Filter, Level, Payload};
///
/// #[derive(Debug)]
/// struct Redact;
///
/// impl Filter for Redact {
///     fn is_suppressed(&self, builder: &Builder, _payload: Option<&Payload>) -> bool {
///         builder.level() == &Level::TRACE
///     }
///
///     fn transform(&self, _builder: &Builder, payload: Option<Payload>) -> Option<Payload> {
///         payload.map(|p| Payload::Text(p.to_string().replace("hunter2", "***")))
///     }
/// }
/// ```
pub trait Filter: Send + Sync {
    /// Check if the registry being built must be suppressed.
    fn is_suppressed(&self, builder: &Builder, payload: Option<&Payload>) -> bool;

    /// Rewrite the payload before suppression is decided.
    fn transform(&self, _builder: &Builder, payload: Option<Payload>) -> Option<Payload> {
        payload
    }
}

impl<F> Filter for F
where
    F: Fn(&Builder, Option<&Payload>) -> bool + Send + Sync,
{
    fn is_suppressed(&self, builder: &Builder, payload: Option<&Payload>) -> bool {
        self(builder, payload)
    }
}

/// Ordered, thread-safe list of filters.
///
/// Evaluation works on a snapshot of the list, so filters may be added or
/// removed while other threads are logging.
#[derive(Default)]
pub struct Filters {
    filters: RwLock<Vec<Arc<dyn Filter>>>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a filter at the end of the chain. The returned handle can be
    /// passed to [`remove`](Self::remove).
    pub fn add(&self, filter: impl Filter + 'static) -> Arc<dyn Filter> {
        let filter: Arc<dyn Filter> = Arc::new(filter);
        self.add_shared(Arc::clone(&filter));
        filter
    }

    /// Register an already shared filter.
    pub fn add_shared(&self, filter: Arc<dyn Filter>) {
        self.filters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(filter);
    }

    /// Remove a filter by handle.
    pub fn remove(&self, filter: &Arc<dyn Filter>) -> bool {
        let target = Arc::as_ptr(filter) as *const ();
        let mut filters = self.filters.write().unwrap_or_else(PoisonError::into_inner);
        let before = filters.len();
        filters.retain(|f| Arc::as_ptr(f) as *const () != target);
        filters.len() != before
    }

    pub fn clear(&self) {
        self.filters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.filters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<Arc<dyn Filter>> {
        self.filters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run the payload through every filter's transform, in order.
    pub fn transform(&self, builder: &Builder, payload: Option<Payload>) -> Option<Payload> {
        self.snapshot()
            .iter()
            .fold(payload, |payload, filter| filter.transform(builder, payload))
    }

    /// Check if any filter suppresses the registry.
    pub fn is_suppressed(&self, builder: &Builder, payload: Option<&Payload>) -> bool {
        self.snapshot()
            .iter()
            .any(|filter| filter.is_suppressed(builder, payload))
    }
}

impl fmt::Debug for Filters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filters").field("len", &self.len()).finish()
    }
}
