//! Per-thread key/value diagnostic context.
//!
//! Every thread owns an independent [`ContextMap`], created empty on first
//! access. [`DiagnosticMap`] is a handle onto the calling thread's map; it is
//! neither `Send` nor `Sync`, so a handle can never touch another thread's
//! map. Crossing threads happens only through snapshots, [`DiagnosticMap::wrap`]
//! and [`DiagnosticMap::wrap_future`].
//!
//! # Example
//! ```
//! use logm::DiagnosticMap;
//!
//! let mdc = DiagnosticMap::current();
//! mdc.put("request", "42");
//! {
//!     let _scope = mdc.install(&[("request", "43")].into_iter().collect());
//!     assert_eq!(mdc.get("request").as_deref(), Some("43"));
//! }
//! assert_eq!(mdc.get("request").as_deref(), Some("42"));
//! # mdc.clear();
//! ```

use crate::context::future::WithContext;
use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;

thread_local! {
    static MAP: RefCell<Option<ContextMap>> = const { RefCell::new(None) };
}

/// An insertion-ordered string map.
///
/// Used both as the live per-thread map and as the immutable snapshot stored
/// in every registry. Overwriting a key keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextMap {
    entries: Vec<(String, String)>,
}

impl ContextMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Insert or overwrite, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ContextMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ContextMap::new();
        map.extend(iter);
        map
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for ContextMap {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl IntoIterator for ContextMap {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Handle onto the calling thread's diagnostic map.
///
/// All methods act on the thread the handle is used from. Mutators return
/// the handle so calls can be chained.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticMap {
    _thread_bound: PhantomData<*const ()>,
}

impl DiagnosticMap {
    /// Handle for the calling thread.
    pub fn current() -> Self {
        Self {
            _thread_bound: PhantomData,
        }
    }

    fn with<R>(f: impl FnOnce(&mut ContextMap) -> R) -> R {
        MAP.with(|slot| f(slot.borrow_mut().get_or_insert_with(ContextMap::new)))
    }

    /// Swap the thread's map, returning the one that was installed.
    pub(crate) fn replace(map: ContextMap) -> ContextMap {
        MAP.with(|slot| slot.borrow_mut().replace(map).unwrap_or_default())
    }

    // Conversions run before borrowing the map: they may read it themselves.

    /// Insert or overwrite `key`.
    pub fn put(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let (key, value) = (key.into(), value.into());
        Self::with(|map| map.insert(key, value));
        self
    }

    /// Insert `key` only if it is not present yet.
    pub fn put_if_absent(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let (key, value) = (key.into(), value.into());
        Self::with(|map| {
            if !map.contains_key(&key) {
                map.insert(key, value);
            }
        });
        self
    }

    /// Overwrite every entry of `entries`.
    pub fn put_all<I, K, V>(self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries: Vec<(String, String)> = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self::with(|map| map.extend(entries));
        self
    }

    pub fn remove(self, key: &str) -> Self {
        Self::with(|map| map.remove(key));
        self
    }

    pub fn remove_and_get(self, key: &str) -> Option<String> {
        Self::with(|map| map.remove(key))
    }

    pub fn clear(self) -> Self {
        Self::with(ContextMap::clear);
        self
    }

    pub fn get(self, key: &str) -> Option<String> {
        Self::with(|map| map.get(key).map(str::to_string))
    }

    pub fn contains_key(self, key: &str) -> bool {
        Self::with(|map| map.contains_key(key))
    }

    pub fn len(self) -> usize {
        Self::with(|map| map.len())
    }

    pub fn is_empty(self) -> bool {
        Self::with(|map| map.is_empty())
    }

    /// Independent copy of the current content.
    pub fn snapshot(self) -> ContextMap {
        Self::with(|map| map.clone())
    }

    /// Replace the whole content. An empty map clears.
    pub fn restore(self, content: &ContextMap) {
        Self::with(|map| *map = content.clone());
    }

    /// Drop this thread's map entirely. The next access starts from a fresh
    /// empty map. Pooled threads should call this when a unit of work ends.
    pub fn remove_thread_context(self) {
        MAP.with(|slot| slot.borrow_mut().take());
    }

    /// Overwrite the entries of `content`, remembering what they replaced.
    ///
    /// Closing or dropping the returned scope puts back the previous values
    /// of exactly those keys. Keys that did not exist before are removed.
    pub fn install(self, content: &ContextMap) -> MapScope {
        let previous: Vec<(String, Option<String>)> = Self::with(|map| {
            content
                .iter()
                .map(|(key, value)| (key.to_string(), map.insert(key, value)))
                .collect()
        });

        MapScope {
            previous,
            closed: false,
            _thread_bound: PhantomData,
        }
    }

    /// Set a single key for the lifetime of the returned scope.
    pub fn install_one(self, key: impl Into<String>, value: impl Into<String>) -> MapScope {
        let mut content = ContextMap::new();
        content.insert(key, value);
        self.install(&content)
    }

    /// Capture this thread's map and return a task that runs with it on
    /// whichever thread calls it.
    ///
    /// The executing thread's own map is restored afterwards, also when the
    /// task panics.
    pub fn wrap<F, R>(self, task: F) -> impl FnOnce() -> R
    where
        F: FnOnce() -> R,
    {
        let captured = self.snapshot();
        move || {
            let current = DiagnosticMap::current();
            let _restore = RestoreOnDrop(Some(current.snapshot()));
            let mut scope = current.install(&captured);
            let output = task();
            scope.close();
            output
        }
    }

    /// Run `f` inside a scope of the current content.
    pub fn run_with_context<R>(self, f: impl FnOnce() -> R) -> R {
        let mut scope = self.install(&self.snapshot());
        let output = f();
        scope.close();
        output
    }

    /// Capture this thread's map for a future, installed around every poll.
    pub fn wrap_future<F: Future>(self, future: F) -> WithContext<F> {
        WithContext::from_parts(Some(self.snapshot()), None, future)
    }
}

/// Undo for [`DiagnosticMap::install`].
#[must_use = "dropping a scope immediately restores the previous values"]
#[derive(Debug)]
pub struct MapScope {
    previous: Vec<(String, Option<String>)>,
    closed: bool,
    _thread_bound: PhantomData<*const ()>,
}

impl MapScope {
    /// Restore the values this scope replaced. Further calls do nothing.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let previous = std::mem::take(&mut self.previous);
        DiagnosticMap::with(|map| {
            for (key, value) in previous {
                match value {
                    Some(value) => {
                        map.insert(key, value);
                    }
                    None => {
                        map.remove(&key);
                    }
                }
            }
        });
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for MapScope {
    fn drop(&mut self) {
        self.close();
    }
}

struct RestoreOnDrop(Option<ContextMap>);

impl Drop for RestoreOnDrop {
    fn drop(&mut self) {
        if let Some(previous) = self.0.take() {
            DiagnosticMap::replace(previous);
        }
    }
}
