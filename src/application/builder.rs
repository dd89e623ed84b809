//! Fluent construction of registries.
//!
//! A [`Builder`] collects everything about one log call and is consumed by
//! [`Builder::log`] or [`Builder::log_with`]. Finalization runs, in order:
//!
//! 1. Filter transforms, in registration order
//! 2. Filter suppression
//! 3. The `Every` policy, only if no filter suppressed
//! 4. Snapshot of the thread's diagnostic map and stack
//! 5. Construction of the immutable [`Registry`]
//! 6. Append to the history store, suppressed or not
//! 7. Formatting and sink write, only if not suppressed
//!
//! The builder is moved into `log()`, so nothing can change a registry once
//! it exists.

use crate::application::error::LogError;
use crate::application::every::Every;
use crate::application::factory::LoggerFactory;
use crate::application::ports::{Clock, Formatter, Sink};
use crate::application::registry::{Identity, Registry, RegistryParts};
use crate::context::map::DiagnosticMap;
use crate::context::stack::DiagnosticStack;
use crate::domain::cause::Cause;
use crate::domain::level::Level;
use crate::domain::marker::Marker;
use crate::domain::origin::LogOrigin;
use crate::domain::payload::Payload;
use crate::domain::stack_filter::StackFilter;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Mutable accumulator for one log call.
#[must_use = "a builder does nothing until `log()` is called"]
pub struct Builder {
    factory: LoggerFactory,
    level: Level,
    timestamp: Option<DateTime<Utc>>,
    origin: Option<LogOrigin>,
    cause: Option<Cause>,
    markers: Vec<Marker>,
    stack_filters: Vec<StackFilter>,
    prefix: String,
    suffix: String,
    formatter: Option<Arc<dyn Formatter>>,
    sink: Option<Arc<dyn Sink>>,
    every: Option<Every>,
}

impl Builder {
    /// Create a builder with empty prefix and suffix, logging through
    /// `factory`.
    pub fn new(factory: LoggerFactory, level: Level) -> Self {
        Self {
            factory,
            level,
            timestamp: None,
            origin: None,
            cause: None,
            markers: Vec::new(),
            stack_filters: Vec::new(),
            prefix: String::new(),
            suffix: String::new(),
            formatter: None,
            sink: None,
            every: None,
        }
    }

    /// Change the level.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Use a fixed timestamp instead of the clock reading at `log()`.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Override the captured call site.
    pub fn with_origin(mut self, origin: LogOrigin) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Log without a call site.
    pub fn without_origin(mut self) -> Self {
        self.origin = None;
        self
    }

    /// Rate-limit this registry with `every`.
    pub fn with_every(mut self, every: Every) -> Self {
        self.every = Some(every);
        self
    }

    /// Drop any rate limit inherited from the logger.
    pub fn without_every(mut self) -> Self {
        self.every = None;
        self
    }

    /// Text written before the formatted line.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Text written after the formatted line.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Render this registry with `formatter` instead of the factory's.
    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Write this registry to `sink` instead of the factory's.
    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Attach an error and its source chain.
    pub fn with_cause(mut self, cause: Cause) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Replace the stack filters applied to the cause's frames.
    pub fn with_stack_filters(mut self, filters: impl IntoIterator<Item = StackFilter>) -> Self {
        self.stack_filters = filters.into_iter().collect();
        self
    }

    /// Add a marker. A marker with the same name already present is kept.
    pub fn with_marker(mut self, marker: Marker) -> Self {
        if !self.markers.contains(&marker) {
            self.markers.push(marker);
        }
        self
    }

    /// Replace all markers. Duplicate names keep their first occurrence.
    pub fn with_markers(mut self, markers: impl IntoIterator<Item = Marker>) -> Self {
        self.markers.clear();
        for marker in markers {
            self = self.with_marker(marker);
        }
        self
    }

    /// The factory this builder logs through.
    pub fn factory(&self) -> &LoggerFactory {
        &self.factory
    }

    /// The level the registry will carry.
    pub fn level(&self) -> &Level {
        &self.level
    }

    /// The fixed timestamp, if one was set.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// The call site, if any.
    pub fn origin(&self) -> Option<&LogOrigin> {
        self.origin.as_ref()
    }

    /// The attached cause, if any.
    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }

    /// Markers in insertion order.
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Filters applied to the cause's frames.
    pub fn stack_filters(&self) -> &[StackFilter] {
        &self.stack_filters
    }

    /// The prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The suffix.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// The formatter override, if any.
    pub fn formatter(&self) -> Option<&Arc<dyn Formatter>> {
        self.formatter.as_ref()
    }

    /// The sink override, if any.
    pub fn sink(&self) -> Option<&Arc<dyn Sink>> {
        self.sink.as_ref()
    }

    /// The rate limit, if any.
    pub fn every(&self) -> Option<&Every> {
        self.every.as_ref()
    }

    /// Finalize a registry without payload.
    ///
    /// # Errors
    /// See [`log_with`](Self::log_with).
    pub fn log(self) -> Result<Arc<Registry>, LogError> {
        self.finish(None)
    }

    /// Finalize a registry carrying `payload`.
    ///
    /// # Errors
    /// - [`LogError::MissingHistory`] if an `Every` policy is attached and the
    ///   factory has no history store. Nothing is appended or written.
    /// - [`LogError::Sink`] if the sink write fails. The registry is already
    ///   in the history store at that point.
    pub fn log_with(self, payload: impl Into<Payload>) -> Result<Arc<Registry>, LogError> {
        self.finish(Some(payload.into()))
    }

    fn finish(self, payload: Option<Payload>) -> Result<Arc<Registry>, LogError> {
        let filters = self.factory.filters();
        let history = self.factory.history();
        let now = self.factory.clock().now();

        let payload = filters.transform(&self, payload);

        let suppressed = if filters.is_suppressed(&self, payload.as_ref()) {
            true
        } else if let Some(every) = &self.every {
            let identity = Identity::new(
                self.level.clone(),
                self.markers.clone(),
                payload.clone(),
                self.origin.clone(),
            );
            !every.can_log(&identity, now, history.as_deref())?
        } else {
            false
        };

        let context = DiagnosticMap::current().snapshot();
        let stack = DiagnosticStack::current().snapshot();

        let formatter = self
            .formatter
            .unwrap_or_else(|| Arc::clone(self.factory.formatter()));
        let sink = self.sink.unwrap_or_else(|| Arc::clone(self.factory.sink()));

        let registry = Arc::new(Registry::from_parts(RegistryParts {
            level: self.level,
            timestamp: self.timestamp.unwrap_or(now),
            origin: self.origin,
            cause: self.cause,
            markers: self.markers,
            stack_filters: self.stack_filters,
            prefix: self.prefix,
            suffix: self.suffix,
            formatter: Arc::clone(&formatter),
            payload,
            every: self.every,
            suppressed,
            context,
            stack,
        }));

        if let Some(history) = &history {
            history.append(Arc::clone(&registry));
        }

        let metrics = self.factory.metrics();
        if suppressed {
            metrics.record_suppressed();
            trace!(
                sequence = registry.sequence(),
                level = %registry.level(),
                signature = %registry.signature(),
                "registry suppressed"
            );
            return Ok(registry);
        }

        let bytes = formatter.encode(formatter.format(&registry));
        sink.write(&bytes).map_err(LogError::Sink)?;
        metrics.record_emitted();

        Ok(registry)
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("level", &self.level)
            .field("timestamp", &self.timestamp)
            .field("origin", &self.origin)
            .field("cause", &self.cause.as_ref().map(ToString::to_string))
            .field("markers", &self.markers)
            .field("stack_filters", &self.stack_filters)
            .field("prefix", &self.prefix)
            .field("suffix", &self.suffix)
            .field("every", &self.every)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::registry::tests::PayloadFormatter;
    use crate::infrastructure::mocks::clock::MockClock;
    use crate::infrastructure::mocks::sink::MemorySink;
    use chrono::TimeZone;
    use std::io;
    use std::time::Duration;

    struct Setup {
        factory: LoggerFactory,
        sink: Arc<MemorySink>,
        clock: Arc<MockClock>,
    }

    fn setup() -> Setup {
        let sink = Arc::new(MemorySink::new());
        let clock = Arc::new(MockClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        let factory = LoggerFactory::builder()
            .with_sink(sink.clone())
            .with_clock(clock.clone())
            .with_formatter(Arc::new(PayloadFormatter))
            .build()
            .unwrap();
        Setup {
            factory,
            sink,
            clock,
        }
    }

    #[test]
    fn test_log_writes_and_journals() {
        let s = setup();
        let registry = Builder::new(s.factory.clone(), Level::INFO)
            .with_suffix("\n")
            .log_with("hello")
            .unwrap();

        assert!(!registry.is_suppressed());
        assert_eq!(registry.timestamp(), s.clock.now());
        assert_eq!(s.sink.lines(), vec!["INFO hello"]);
        let history = s.factory.history().unwrap();
        assert!(history.contains(&registry));
        assert_eq!(s.factory.metrics().events_emitted(), 1);
    }

    #[test]
    fn test_timestamp_override() {
        let s = setup();
        let when = Utc.with_ymd_and_hms(2020, 6, 1, 8, 30, 0).unwrap();
        let registry = Builder::new(s.factory.clone(), Level::INFO)
            .with_timestamp(when)
            .log()
            .unwrap();
        assert_eq!(registry.timestamp(), when);
    }

    #[test]
    fn test_markers_are_an_ordered_set() {
        let s = setup();
        let builder = Builder::new(s.factory.clone(), Level::INFO)
            .with_marker(Marker::new("a"))
            .with_marker(Marker::new("b"))
            .with_marker(Marker::new("a"));
        let names: Vec<&str> = builder.markers().iter().map(Marker::name).collect();
        assert_eq!(names, vec!["a", "b"]);

        let builder = builder.with_markers([Marker::new("c")]);
        assert_eq!(builder.markers(), &[Marker::new("c")]);
    }

    #[test]
    fn test_filter_suppression_skips_every_and_sink() {
        let s = setup();
        s.factory.filters().add(|_: &Builder, _: Option<&Payload>| true);

        let registry = Builder::new(s.factory.clone(), Level::INFO)
            .with_every(Every::times(0))
            .log_with("x")
            .unwrap();

        assert!(registry.is_suppressed());
        assert!(s.sink.is_empty());
        assert_eq!(s.factory.history().unwrap().len(), 1);
        assert_eq!(s.factory.metrics().events_suppressed(), 1);
    }

    #[test]
    fn test_transform_feeds_registry_payload() {
        struct Upper;

        impl crate::application::filter::Filter for Upper {
            fn is_suppressed(&self, _: &Builder, payload: Option<&Payload>) -> bool {
                payload.is_none()
            }

            fn transform(&self, _: &Builder, payload: Option<Payload>) -> Option<Payload> {
                payload.map(|p| Payload::Text(p.to_string().to_uppercase()))
            }
        }

        let s = setup();
        s.factory.filters().add(Upper);
        let registry = Builder::new(s.factory.clone(), Level::INFO).log_with("quiet").unwrap();
        assert_eq!(registry.payload(), Some(&Payload::from("QUIET")));
        assert!(Builder::new(s.factory.clone(), Level::INFO).log().unwrap().is_suppressed());
    }

    #[test]
    fn test_every_period_with_clock() {
        let s = setup();
        let log = || {
            Builder::new(s.factory.clone(), Level::WARN)
                .with_every(Every::period(Duration::from_secs(30)))
                .log_with("slow")
                .unwrap()
        };

        assert!(!log().is_suppressed());
        s.clock.advance(Duration::from_secs(10));
        assert!(log().is_suppressed());
        s.clock.advance(Duration::from_secs(21));
        assert!(!log().is_suppressed());
        assert_eq!(s.sink.len(), 2);
    }

    #[test]
    fn test_every_without_history_fails() {
        let factory = LoggerFactory::builder()
            .with_sink(Arc::new(MemorySink::new()))
            .without_history()
            .build()
            .unwrap();
        let err = Builder::new(factory, Level::INFO)
            .with_every(Every::times(1))
            .log()
            .unwrap_err();
        assert!(matches!(err, LogError::MissingHistory { policy: "times" }));
    }

    #[test]
    fn test_sink_failure_after_history_append() {
        #[derive(Debug)]
        struct BrokenSink;

        impl Sink for BrokenSink {
            fn write(&self, _bytes: &[u8]) -> io::Result<()> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }
        }

        let s = setup();
        let err = Builder::new(s.factory.clone(), Level::SEVERE)
            .with_sink(Arc::new(BrokenSink))
            .log_with("lost?")
            .unwrap_err();

        assert!(matches!(err, LogError::Sink(_)));
        assert_eq!(s.factory.history().unwrap().len(), 1);
    }

    #[test]
    fn test_snapshots_thread_context() {
        let s = setup();
        DiagnosticMap::current().clear().put("request", "7");
        DiagnosticStack::current().clear().push("outer").push("inner");

        let registry = Builder::new(s.factory.clone(), Level::INFO).log().unwrap();
        DiagnosticMap::current().put("request", "8");
        DiagnosticStack::current().clear();

        assert_eq!(registry.context().get("request"), Some("7"));
        assert_eq!(registry.stack(), &["inner".to_string(), "outer".to_string()]);
    }
}
