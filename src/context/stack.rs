//! Per-thread stack of nested operation names.
//!
//! Like the diagnostic map, each thread owns its own stack, created empty on
//! first access. Snapshots and [`DiagnosticStack::restore`] use top-first
//! order: index 0 is the most recently pushed value.

use crate::context::future::WithContext;
use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;

thread_local! {
    // Bottom first, top last.
    static STACK: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

/// Handle onto the calling thread's diagnostic stack.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticStack {
    _thread_bound: PhantomData<*const ()>,
}

impl DiagnosticStack {
    /// Handle for the calling thread.
    pub fn current() -> Self {
        Self {
            _thread_bound: PhantomData,
        }
    }

    fn with<R>(f: impl FnOnce(&mut Vec<String>) -> R) -> R {
        STACK.with(|slot| f(slot.borrow_mut().get_or_insert_with(Vec::new)))
    }

    /// Swap the thread's stack (bottom first), returning the previous one.
    pub(crate) fn replace(frames: Vec<String>) -> Vec<String> {
        STACK.with(|slot| slot.borrow_mut().replace(frames).unwrap_or_default())
    }

    /// Push `value` on top.
    pub fn push(self, value: impl Into<String>) -> Self {
        let value = value.into();
        Self::with(|stack| stack.push(value));
        self
    }

    /// Pop the top value. Popping an empty stack returns `None`.
    pub fn pop(self) -> Option<String> {
        Self::with(Vec::pop)
    }

    pub fn peek(self) -> Option<String> {
        Self::with(|stack| stack.last().cloned())
    }

    pub fn clear(self) -> Self {
        Self::with(Vec::clear);
        self
    }

    /// Copy of the stack, top first.
    pub fn snapshot(self) -> Vec<String> {
        Self::with(|stack| stack.iter().rev().cloned().collect())
    }

    /// Replace the whole stack with `top_first`. An empty slice clears.
    pub fn restore(self, top_first: &[String]) {
        Self::with(|stack| {
            stack.clear();
            stack.extend(top_first.iter().rev().cloned());
        });
    }

    pub fn depth(self) -> usize {
        Self::with(|stack| stack.len())
    }

    pub fn is_empty(self) -> bool {
        Self::with(|stack| stack.is_empty())
    }

    /// Pop everything down to and including the topmost `value`.
    ///
    /// Returns `false` and leaves the stack untouched when `value` is not on
    /// the stack.
    pub fn pop_to(self, value: &str) -> bool {
        Self::with(|stack| match stack.iter().rposition(|frame| frame == value) {
            Some(index) => {
                stack.truncate(index);
                true
            }
            None => false,
        })
    }

    /// Drop this thread's stack entirely.
    pub fn remove_thread_context(self) {
        STACK.with(|slot| slot.borrow_mut().take());
    }

    /// Push one value for the lifetime of the returned scope.
    pub fn push_scope(self, value: impl Into<String>) -> StackScope {
        self.push(value);
        StackScope::new(1)
    }

    /// Push several values in order, the last one ending on top.
    pub fn push_scope_all<I, S>(self, values: I) -> StackScope
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        // Converted first: the iterator may read the stack itself.
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        let pushed = values.len();
        Self::with(|stack| stack.extend(values));
        StackScope::new(pushed)
    }

    /// Capture this thread's stack and return a task that runs with it on
    /// whichever thread calls it. The executing thread's stack is restored
    /// wholesale afterwards, also when the task panics.
    pub fn wrap<F, R>(self, task: F) -> impl FnOnce() -> R
    where
        F: FnOnce() -> R,
    {
        let captured = Self::with(|stack| stack.clone());
        move || {
            let _restore = RestoreOnDrop(Some(DiagnosticStack::replace(captured)));
            task()
        }
    }

    /// Run `f`, then put the stack back exactly as it was.
    pub fn run_with_context<R>(self, f: impl FnOnce() -> R) -> R {
        let _restore = RestoreOnDrop(Some(Self::with(|stack| stack.clone())));
        f()
    }

    /// Capture this thread's stack for a future, installed around every poll.
    pub fn wrap_future<F: Future>(self, future: F) -> WithContext<F> {
        let captured = Self::with(|stack| stack.clone());
        WithContext::from_parts(None, Some(captured), future)
    }
}

/// Undo for [`DiagnosticStack::push_scope`].
#[must_use = "dropping a scope immediately pops what it pushed"]
#[derive(Debug)]
pub struct StackScope {
    pushed: usize,
    closed: bool,
    _thread_bound: PhantomData<*const ()>,
}

impl StackScope {
    fn new(pushed: usize) -> Self {
        Self {
            pushed,
            closed: false,
            _thread_bound: PhantomData,
        }
    }

    /// Pop as many values as the scope pushed, stopping early if the stack
    /// is already shorter. Further calls do nothing.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let pushed = self.pushed;
        DiagnosticStack::with(|stack| {
            let keep = stack.len().saturating_sub(pushed);
            stack.truncate(keep);
        });
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for StackScope {
    fn drop(&mut self) {
        self.close();
    }
}

struct RestoreOnDrop(Option<Vec<String>>);

impl Drop for RestoreOnDrop {
    fn drop(&mut self) {
        if let Some(previous) = self.0.take() {
            DiagnosticStack::replace(previous);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic;
    use std::thread;

    fn fresh() -> DiagnosticStack {
        let ndc = DiagnosticStack::current();
        ndc.remove_thread_context();
        ndc
    }

    #[test]
    fn test_lifo() {
        let ndc = fresh();
        ndc.push("A").push("B");
        assert_eq!(ndc.peek().as_deref(), Some("B"));
        assert_eq!(ndc.depth(), 2);
        assert_eq!(ndc.pop().as_deref(), Some("B"));
        assert_eq!(ndc.peek().as_deref(), Some("A"));
    }

    #[test]
    fn test_push_scope_all_may_read_the_stack() {
        let ndc = fresh();
        ndc.push("root");
        {
            let _scope = ndc.push_scope_all(["a", "b"].into_iter().map(|suffix| {
                let top = DiagnosticStack::current().peek().unwrap_or_default();
                format!("{}/{}", top, suffix)
            }));
            assert_eq!(ndc.snapshot(), vec!["root/b", "root/a", "root"]);
        }
        assert_eq!(ndc.snapshot(), vec!["root"]);
    }

    struct Depth;

    impl From<Depth> for String {
        fn from(_: Depth) -> String {
            format!("depth={}", DiagnosticStack::current().depth())
        }
    }

    #[test]
    fn test_push_conversion_may_read_the_stack() {
        let ndc = fresh();
        ndc.push("A").push(Depth);
        assert_eq!(ndc.peek().as_deref(), Some("depth=1"));
    }

    #[test]
    fn test_pop_and_peek_on_empty() {
        let ndc = fresh();
        assert!(ndc.pop().is_none());
        assert!(ndc.peek().is_none());
        assert!(ndc.is_empty());
    }

    #[test]
    fn test_snapshot_top_first_and_restore() {
        let ndc = fresh();
        ndc.push("A").push("B").push("C");
        let snapshot = ndc.snapshot();
        assert_eq!(snapshot, vec!["C", "B", "A"]);

        ndc.clear().push("X");
        ndc.restore(&snapshot);
        assert_eq!(ndc.peek().as_deref(), Some("C"));
        assert_eq!(ndc.depth(), 3);

        ndc.restore(&[]);
        assert!(ndc.is_empty());
    }

    #[test]
    fn test_scope_pops_on_close() {
        let ndc = fresh();
        ndc.push("S0");
        let mut scope = ndc.push_scope("S1");
        assert_eq!(ndc.depth(), 2);
        assert_eq!(ndc.peek().as_deref(), Some("S1"));

        scope.close();
        assert_eq!(ndc.depth(), 1);
        assert_eq!(ndc.peek().as_deref(), Some("S0"));

        scope.close();
        assert_eq!(ndc.depth(), 1);
    }

    #[test]
    fn test_scope_all_last_on_top() {
        let ndc = fresh();
        {
            let _scope = ndc.push_scope_all(["a", "b", "c"]);
            assert_eq!(ndc.snapshot(), vec!["c", "b", "a"]);
        }
        assert!(ndc.is_empty());
    }

    #[test]
    fn test_scope_stops_when_stack_shorter() {
        let ndc = fresh();
        let mut scope = ndc.push_scope_all(["a", "b"]);
        ndc.pop();
        ndc.pop();
        scope.close();
        assert!(ndc.is_empty());
    }

    #[test]
    fn test_pop_to_hit() {
        let ndc = fresh();
        ndc.push("A").push("B").push("C");
        assert!(ndc.pop_to("B"));
        assert_eq!(ndc.snapshot(), vec!["A"]);
    }

    #[test]
    fn test_pop_to_takes_topmost_match() {
        let ndc = fresh();
        ndc.push("X").push("A").push("X").push("B");
        assert!(ndc.pop_to("X"));
        assert_eq!(ndc.snapshot(), vec!["A", "X"]);
    }

    #[test]
    fn test_pop_to_miss_leaves_stack() {
        let ndc = fresh();
        ndc.push("A").push("B").push("C");
        assert!(!ndc.pop_to("Z"));
        assert_eq!(ndc.snapshot(), vec!["C", "B", "A"]);
    }

    #[test]
    fn test_wrap_restores_whole_stack() {
        let ndc = fresh();
        ndc.push("main");
        let task = ndc.wrap(|| {
            let inner = DiagnosticStack::current();
            inner.push("nested");
            inner.snapshot()
        });

        let (during, after) = thread::spawn(move || {
            let worker = DiagnosticStack::current();
            worker.push("worker");
            let during = task();
            (during, worker.snapshot())
        })
        .join()
        .unwrap();

        assert_eq!(during, vec!["nested", "main"]);
        assert_eq!(after, vec!["worker"]);
    }

    #[test]
    fn test_wrap_restores_after_panic() {
        let ndc = fresh();
        ndc.push("main");
        let task = ndc.wrap(|| -> usize { panic!("task failed") });

        let after = thread::spawn(move || {
            let worker = DiagnosticStack::current();
            worker.push("worker");
            assert!(panic::catch_unwind(panic::AssertUnwindSafe(task)).is_err());
            worker.snapshot()
        })
        .join()
        .unwrap();

        assert_eq!(after, vec!["worker"]);
    }

    #[test]
    fn test_run_with_context() {
        let ndc = fresh();
        ndc.push("outer");
        let depth = ndc.run_with_context(|| {
            DiagnosticStack::current().push("a").push("b");
            DiagnosticStack::current().depth()
        });
        assert_eq!(depth, 3);
        assert_eq!(ndc.snapshot(), vec!["outer"]);
    }
}
