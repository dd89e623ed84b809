//! Logger factories.
//!
//! A [`LoggerFactory`] owns everything loggers share: the level registry,
//! the filter chain, the history store, the clock, the default sink and
//! formatter, and the metrics. Factories are cheap to clone; clones share
//! the same state.
//!
//! A process-wide factory is available through [`LoggerFactory::global`].
//!
//! # Example
//! ```
//! use logm::{LoggerFactory, WriterSink};
//! use std::sync::Arc;
//!
//! let factory = LoggerFactory::builder()
//!     .with_sink(Arc::new(WriterSink::new(std::io::sink())))
//!     .with_history_capacity(10_000)
//!     .build()
//!     .unwrap();
//!
//! factory.logger("app").info().log_with("ready").unwrap();
//! assert_eq!(factory.history().unwrap().len(), 1);
//! ```

use crate::application::error::BuildError;
use crate::application::filter::{Filter, Filters};
use crate::application::logger::Logger;
use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, Formatter, HistoryStore, Sink};
use crate::domain::level::{Level, Levels};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::formatter::DefaultFormatter;
use crate::infrastructure::history::MemoryHistory;
use crate::infrastructure::sink::WriterSink;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

static GLOBAL: Lazy<RwLock<LoggerFactory>> = Lazy::new(|| RwLock::new(LoggerFactory::new()));

/// Shared state of all loggers created by one factory.
#[derive(Clone)]
pub struct LoggerFactory {
    inner: Arc<FactoryInner>,
}

struct FactoryInner {
    levels: Levels,
    filters: Filters,
    history: RwLock<Option<Arc<dyn HistoryStore>>>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn Sink>,
    formatter: Arc<dyn Formatter>,
    metrics: Metrics,
}

impl LoggerFactory {
    /// Create a factory with defaults: system clock, unbounded in-memory
    /// history, standard output and the default formatter.
    pub fn new() -> Self {
        Self::from_inner(FactoryInner {
            levels: Levels::new(),
            filters: Filters::new(),
            history: RwLock::new(Some(Arc::new(MemoryHistory::new()))),
            clock: Arc::new(SystemClock::new()),
            sink: Arc::new(WriterSink::stdout()),
            formatter: Arc::new(DefaultFormatter::new()),
            metrics: Metrics::new(),
        })
    }

    fn from_inner(inner: FactoryInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Create a builder for configuring a factory.
    pub fn builder() -> LoggerFactoryBuilder {
        LoggerFactoryBuilder::new()
    }

    /// The process-wide factory.
    pub fn global() -> LoggerFactory {
        GLOBAL
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the process-wide factory, returning the previous one.
    ///
    /// Loggers already created keep logging through the factory they were
    /// created from.
    pub fn set_global(factory: LoggerFactory) -> LoggerFactory {
        let previous = std::mem::replace(
            &mut *GLOBAL.write().unwrap_or_else(PoisonError::into_inner),
            factory,
        );
        debug!("global logger factory replaced");
        previous
    }

    /// Create a logger with this factory's defaults.
    pub fn logger(&self, name: impl Into<String>) -> Logger {
        Logger::new(name.into(), self.clone())
    }

    pub fn levels(&self) -> &Levels {
        &self.inner.levels
    }

    pub fn filters(&self) -> &Filters {
        &self.inner.filters
    }

    /// The history store, if one is attached.
    pub fn history(&self) -> Option<Arc<dyn HistoryStore>> {
        self.inner
            .history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Attach, replace or detach the history store. A replaced store is
    /// flushed.
    pub fn set_history(&self, history: Option<Arc<dyn HistoryStore>>) {
        let previous = std::mem::replace(
            &mut *self
                .inner
                .history
                .write()
                .unwrap_or_else(PoisonError::into_inner),
            history,
        );

        if let Some(previous) = previous {
            previous.flush();
            self.inner.metrics.record_flush();
        }
    }

    /// Flush the attached history store, if any.
    pub fn flush_history(&self) {
        if let Some(history) = self.history() {
            history.flush();
            self.inner.metrics.record_flush();
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    /// Sink used by builders without their own.
    pub fn sink(&self) -> &Arc<dyn Sink> {
        &self.inner.sink
    }

    /// Formatter used by builders without their own.
    pub fn formatter(&self) -> &Arc<dyn Formatter> {
        &self.inner.formatter
    }

    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    /// Check whether two handles share the same factory.
    pub fn ptr_eq(&self, other: &LoggerFactory) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for LoggerFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LoggerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerFactory")
            .field("levels", &self.inner.levels.len())
            .field("filters", &self.inner.filters)
            .field("history", &self.history().map(|h| h.len()))
            .field("clock", &self.inner.clock)
            .field("sink", &self.inner.sink)
            .field("formatter", &self.inner.formatter)
            .field("metrics", &self.inner.metrics.snapshot())
            .finish()
    }
}

enum HistoryConfig {
    Unbounded,
    Capacity(usize),
    Custom(Arc<dyn HistoryStore>),
    Disabled,
}

/// Builder for configuring a [`LoggerFactory`].
pub struct LoggerFactoryBuilder {
    clock: Option<Arc<dyn Clock>>,
    history: HistoryConfig,
    sink: Option<Arc<dyn Sink>>,
    formatter: Option<Arc<dyn Formatter>>,
    filters: Vec<Arc<dyn Filter>>,
    levels: Vec<Level>,
}

impl LoggerFactoryBuilder {
    fn new() -> Self {
        Self {
            clock: None,
            history: HistoryConfig::Unbounded,
            sink: None,
            formatter: None,
            filters: Vec::new(),
            levels: Vec::new(),
        }
    }

    /// Set the clock used for timestamps and `Every` windows.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Use a custom history store.
    pub fn with_history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = HistoryConfig::Custom(history);
        self
    }

    /// Keep at most `capacity` registries in an in-memory history.
    ///
    /// Must be greater than zero.
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history = HistoryConfig::Capacity(capacity);
        self
    }

    /// Do not keep a history. `Every` policies then fail with
    /// `LogError::MissingHistory`.
    pub fn without_history(mut self) -> Self {
        self.history = HistoryConfig::Disabled;
        self
    }

    /// Set the default sink.
    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Set the default formatter.
    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Register a filter at the end of the chain.
    pub fn with_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Register a custom level in addition to the built-ins.
    pub fn with_level(mut self, level: Level) -> Self {
        self.levels.push(level);
        self
    }

    /// Build the factory.
    ///
    /// # Errors
    /// Returns `BuildError::ZeroHistoryCapacity` if a history capacity of
    /// zero was requested.
    pub fn build(self) -> Result<LoggerFactory, BuildError> {
        let history: Option<Arc<dyn HistoryStore>> = match self.history {
            HistoryConfig::Unbounded => Some(Arc::new(MemoryHistory::new())),
            HistoryConfig::Capacity(0) => return Err(BuildError::ZeroHistoryCapacity),
            HistoryConfig::Capacity(capacity) => {
                Some(Arc::new(MemoryHistory::with_capacity(capacity)))
            }
            HistoryConfig::Custom(history) => Some(history),
            HistoryConfig::Disabled => None,
        };

        let levels = Levels::new();
        for level in self.levels {
            levels.register(level);
        }

        let filters = Filters::new();
        for filter in self.filters {
            filters.add_shared(filter);
        }

        Ok(LoggerFactory::from_inner(FactoryInner {
            levels,
            filters,
            history: RwLock::new(history),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock::new())),
            sink: self.sink.unwrap_or_else(|| Arc::new(WriterSink::stdout())),
            formatter: self
                .formatter
                .unwrap_or_else(|| Arc::new(DefaultFormatter::new())),
            metrics: Metrics::new(),
        }))
    }
}

impl fmt::Debug for LoggerFactoryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let history = match &self.history {
            HistoryConfig::Unbounded => "unbounded".to_string(),
            HistoryConfig::Capacity(capacity) => format!("capacity({})", capacity),
            HistoryConfig::Custom(_) => "custom".to_string(),
            HistoryConfig::Disabled => "disabled".to_string(),
        };
        f.debug_struct("LoggerFactoryBuilder")
            .field("clock", &self.clock)
            .field("history", &history)
            .field("sink", &self.sink)
            .field("formatter", &self.formatter)
            .field("filters", &self.filters.len())
            .field("levels", &self.levels)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::builder::Builder;
    use crate::domain::payload::Payload;
    use crate::infrastructure::mocks::sink::MemorySink;

    fn quiet() -> LoggerFactoryBuilder {
        LoggerFactory::builder().with_sink(Arc::new(MemorySink::new()))
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = quiet().with_history_capacity(0).build().unwrap_err();
        assert_eq!(err, BuildError::ZeroHistoryCapacity);
    }

    #[test]
    fn test_bounded_history() {
        let factory = quiet().with_history_capacity(2).build().unwrap();
        let logger = factory.logger("app");
        for i in 0..5 {
            logger.info().log_with(i).unwrap();
        }
        assert_eq!(factory.history().unwrap().len(), 2);
    }

    #[test]
    fn test_without_history() {
        let factory = quiet().without_history().build().unwrap();
        assert!(factory.history().is_none());
        factory.logger("app").info().log().unwrap();
        factory.flush_history();
        assert_eq!(factory.metrics().history_flushes(), 0);
    }

    #[test]
    fn test_set_history_flushes_previous() {
        let factory = quiet().build().unwrap();
        let old = factory.history().unwrap();
        factory.logger("app").info().log().unwrap();
        assert_eq!(old.len(), 1);

        let replacement: Arc<dyn HistoryStore> = Arc::new(MemoryHistory::new());
        factory.set_history(Some(Arc::clone(&replacement)));

        assert!(old.is_empty());
        assert_eq!(factory.metrics().history_flushes(), 1);
        factory.logger("app").info().log().unwrap();
        assert_eq!(replacement.len(), 1);
    }

    #[test]
    fn test_builder_levels_and_filters() {
        let factory = quiet()
            .with_level(Level::new("audit"))
            .with_filter(|_: &Builder, payload: Option<&Payload>| payload.is_none())
            .build()
            .unwrap();

        assert!(factory.levels().contains("AUDIT"));
        assert_eq!(factory.filters().len(), 1);
        assert!(factory.logger("app").info().log().unwrap().is_suppressed());
        assert!(!factory.logger("app").info().log_with("x").unwrap().is_suppressed());
    }

    #[test]
    fn test_clones_share_state() {
        let factory = quiet().build().unwrap();
        let clone = factory.clone();
        clone.logger("app").info().log().unwrap();
        assert!(factory.ptr_eq(&clone));
        assert_eq!(factory.metrics().events_emitted(), 1);
    }
}
