//! In-memory history store.
//!
//! Keeps finalized registries in append order behind a single mutex. Every
//! query holds the lock for its whole scan, so it observes a consistent
//! prefix of the appends and never a torn one.

use crate::application::ports::HistoryStore;
use crate::application::registry::Registry;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

/// History store backed by a `VecDeque`.
///
/// Unbounded by default. With a capacity, appending past it evicts the
/// oldest registries first.
#[derive(Debug)]
pub struct MemoryHistory {
    entries: Mutex<VecDeque<Arc<Registry>>>,
    capacity: Option<usize>,
    evicted: AtomicU64,
}

impl MemoryHistory {
    /// Create an unbounded history.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: None,
            evicted: AtomicU64::new(0),
        }
    }

    /// Create a history keeping at most `capacity` registries.
    ///
    /// A capacity of zero keeps nothing; factories reject it at build time.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: Some(capacity),
            evicted: AtomicU64::new(0),
        }
    }

    /// Maximum number of registries kept, if bounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Number of registries dropped to respect the capacity.
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Arc<Registry>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore for MemoryHistory {
    fn append(&self, registry: Arc<Registry>) {
        let mut entries = self.lock();
        entries.push_back(registry);

        if let Some(capacity) = self.capacity {
            let excess = entries.len().saturating_sub(capacity);
            if excess > 0 {
                entries.drain(..excess);
                self.evicted.fetch_add(excess as u64, Ordering::Relaxed);
                trace!(excess, capacity, "evicted oldest registries from history");
            }
        }
    }

    fn remove(&self, registry: &Registry) -> bool {
        let mut entries = self.lock();
        match entries
            .iter()
            .position(|r| r.sequence() == registry.sequence())
        {
            Some(index) => entries.remove(index).is_some(),
            None => false,
        }
    }

    fn contains(&self, registry: &Registry) -> bool {
        self.lock()
            .iter()
            .any(|r| r.sequence() == registry.sequence())
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn flush(&self) {
        let dropped = {
            let mut entries = self.lock();
            let dropped = entries.len();
            entries.clear();
            dropped
        };
        debug!(dropped, "history flushed");
    }

    fn snapshot(&self) -> Vec<Arc<Registry>> {
        self.lock().iter().cloned().collect()
    }

    // Predicates run on a snapshot, outside the lock.
    fn count_where(&self, predicate: &dyn Fn(&Registry) -> bool) -> usize {
        self.snapshot().iter().filter(|r| predicate(r)).count()
    }

    fn last_where(&self, predicate: &dyn Fn(&Registry) -> bool) -> Option<Arc<Registry>> {
        self.snapshot().into_iter().rev().find(|r| predicate(r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::registry::tests::parts;
    use crate::domain::level::Level;
    use crate::domain::payload::Payload;
    use std::thread;

    fn registry(payload: i64) -> Arc<Registry> {
        Arc::new(Registry::from_parts(parts(Level::INFO, Some(Payload::from(payload)))))
    }

    #[test]
    fn test_append_contains_remove() {
        let history = MemoryHistory::new();
        let a = registry(1);
        let b = registry(2);
        history.append(a.clone());
        history.append(b.clone());

        assert_eq!(history.len(), 2);
        assert!(history.contains(&a));
        assert!(history.remove(&a));
        assert!(!history.contains(&a));
        assert!(!history.remove(&a));
        assert!(history.contains(&b));
    }

    #[test]
    fn test_snapshot_in_append_order() {
        let history = MemoryHistory::new();
        for i in 0..5 {
            history.append(registry(i));
        }
        let payloads: Vec<Option<Payload>> =
            history.snapshot().iter().map(|r| r.payload().cloned()).collect();
        assert_eq!(payloads, (0..5).map(|i| Some(Payload::from(i))).collect::<Vec<_>>());
    }

    #[test]
    fn test_count_and_last_where() {
        let history = MemoryHistory::new();
        history.append(registry(1));
        history.append(registry(2));
        let third = registry(1);
        history.append(third.clone());

        let is_one = |r: &Registry| r.payload() == Some(&Payload::from(1));
        assert_eq!(history.count_where(&is_one), 2);
        assert_eq!(history.last_where(&is_one).map(|r| r.sequence()), Some(third.sequence()));
        assert!(history.last_where(&|_: &Registry| false).is_none());
    }

    #[test]
    fn test_predicates_may_use_the_store() {
        let history = Arc::new(MemoryHistory::new());
        history.append(registry(1));
        history.append(registry(2));

        let inner = Arc::clone(&history);
        let counted = history.count_where(&|_: &Registry| inner.len() == 2);
        assert_eq!(counted, 2);

        let inner = Arc::clone(&history);
        let last = history.last_where(&|r: &Registry| {
            inner.append(registry(3));
            r.payload() == Some(&Payload::from(1))
        });
        assert!(last.is_some());
        assert_eq!(history.len(), 4);
    }

    #[test]
    fn test_flush() {
        let history = MemoryHistory::new();
        history.append(registry(1));
        history.flush();
        assert!(history.is_empty());
        history.append(registry(2));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let history = MemoryHistory::with_capacity(3);
        let first = registry(0);
        history.append(first.clone());
        for i in 1..5 {
            history.append(registry(i));
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.evicted(), 2);
        assert!(!history.contains(&first));
        assert_eq!(history.capacity(), Some(3));
    }

    #[test]
    fn test_concurrent_append_and_flush() {
        let history = Arc::new(MemoryHistory::new());
        let writers: Vec<_> = (0..4)
            .map(|_| {
                let history = Arc::clone(&history);
                thread::spawn(move || {
                    for i in 0..250 {
                        history.append(registry(i));
                    }
                })
            })
            .collect();

        let flusher = {
            let history = Arc::clone(&history);
            thread::spawn(move || {
                for _ in 0..10 {
                    history.flush();
                    let _ = history.count_where(&|_: &Registry| true);
                }
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        flusher.join().unwrap();

        assert!(history.len() <= 1000);
        history.flush();
        history.append(registry(0));
        assert_eq!(history.len(), 1);
    }
}
