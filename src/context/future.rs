//! Diagnostic context for futures.
//!
//! A future may be polled by a different thread every time it wakes up, so
//! thread-local context does not follow it on its own. [`WithContext`] carries
//! a map and a stack with the future, installs them on the polling thread for
//! the duration of each poll, and takes back whatever the future left there
//! before handing the thread its own context again.

use crate::context::map::{ContextMap, DiagnosticMap};
use crate::context::stack::DiagnosticStack;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A future running with its own diagnostic map and stack.
///
/// # Example
/// ```
/// use logm::{DiagnosticMap, WithContext};
///
/// DiagnosticMap::current().put("job", "reindex");
/// let task = WithContext::new(async { DiagnosticMap::current().get("job") });
/// DiagnosticMap::current().clear();
/// # let _ = task;
/// ```
#[must_use = "futures do nothing unless polled"]
#[derive(Debug)]
pub struct WithContext<F> {
    map: Option<ContextMap>,
    stack: Option<Vec<String>>,
    future: Pin<Box<F>>,
}

impl<F: Future> WithContext<F> {
    /// Capture the calling thread's map and stack for `future`.
    pub fn new(future: F) -> Self {
        let map = DiagnosticMap::current().snapshot();
        let stack = DiagnosticStack::current().snapshot();
        // Stored bottom first, the way the thread-local keeps it.
        Self::from_parts(Some(map), Some(stack.into_iter().rev().collect()), future)
    }

    pub(crate) fn from_parts(
        map: Option<ContextMap>,
        stack: Option<Vec<String>>,
        future: F,
    ) -> Self {
        Self {
            map,
            stack,
            future: Box::pin(future),
        }
    }
}

impl<F: Future> Future for WithContext<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;

        let map_guard = this.map.take().map(MapSwap::enter);
        let stack_guard = this.stack.take().map(StackSwap::enter);

        let poll = this.future.as_mut().poll(cx);

        this.stack = stack_guard.map(StackSwap::exit);
        this.map = map_guard.map(MapSwap::exit);
        poll
    }
}

struct MapSwap {
    previous: Option<ContextMap>,
}

impl MapSwap {
    fn enter(map: ContextMap) -> Self {
        Self {
            previous: Some(DiagnosticMap::replace(map)),
        }
    }

    fn exit(mut self) -> ContextMap {
        let previous = self.previous.take().unwrap_or_default();
        DiagnosticMap::replace(previous)
    }
}

impl Drop for MapSwap {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            DiagnosticMap::replace(previous);
        }
    }
}

struct StackSwap {
    previous: Option<Vec<String>>,
}

impl StackSwap {
    fn enter(stack: Vec<String>) -> Self {
        Self {
            previous: Some(DiagnosticStack::replace(stack)),
        }
    }

    fn exit(mut self) -> Vec<String> {
        let previous = self.previous.take().unwrap_or_default();
        DiagnosticStack::replace(previous)
    }
}

impl Drop for StackSwap {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            DiagnosticStack::replace(previous);
        }
    }
}
