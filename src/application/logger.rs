//! Named loggers.
//!
//! A [`Logger`] holds defaults that every builder it opens starts from:
//! markers, an `Every` policy, prefix, suffix, formatter, sink, stack filters
//! and builder consumers. Loggers are cheap to clone; clones are independent.

use crate::application::builder::Builder;
use crate::application::every::Every;
use crate::application::factory::LoggerFactory;
use crate::application::ports::{Formatter, Sink};
use crate::domain::level::Level;
use crate::domain::marker::Marker;
use crate::domain::origin::LogOrigin;
use crate::domain::stack_filter::StackFilter;
use std::fmt;
use std::sync::Arc;

type Consumer = Arc<dyn Fn(Builder) -> Builder + Send + Sync>;

/// Entry point for log calls.
///
/// # Example
/// ```
/// use logm::{LoggerFactory, Marker, WriterSink};
/// use std::sync::Arc;
///
/// let factory = LoggerFactory::builder()
///     .with_sink(Arc::new(WriterSink::new(std::io::sink())))
///     .build()
///     .unwrap();
/// let logger = factory.logger("app::db").with_marker(Marker::new("db"));
///
/// let registry = logger.warn().log_with("connection pool exhausted").unwrap();
/// assert_eq!(registry.markers()[0].name(), "db");
/// assert_eq!(factory.metrics().events_emitted(), 1);
/// ```
#[derive(Clone)]
pub struct Logger {
    name: String,
    factory: LoggerFactory,
    markers: Vec<Marker>,
    every: Option<Every>,
    prefix: String,
    suffix: String,
    formatter: Option<Arc<dyn Formatter>>,
    sink: Option<Arc<dyn Sink>>,
    stack_filters: Vec<StackFilter>,
    consumers: Vec<Consumer>,
}

impl Logger {
    pub(crate) fn new(name: String, factory: LoggerFactory) -> Self {
        Self {
            name,
            factory,
            markers: Vec::new(),
            every: None,
            prefix: String::new(),
            suffix: "\n".to_string(),
            formatter: None,
            sink: None,
            stack_filters: Vec::new(),
            consumers: Vec::new(),
        }
    }

    /// The name given at creation, used as the origin's module path.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The factory this logger belongs to.
    pub fn factory(&self) -> &LoggerFactory {
        &self.factory
    }

    /// Default markers copied into every builder.
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Default rate limit, if any.
    pub fn every(&self) -> Option<&Every> {
        self.every.as_ref()
    }

    /// Default prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Default suffix.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Default stack filters.
    pub fn stack_filters(&self) -> &[StackFilter] {
        &self.stack_filters
    }

    /// Add a default marker, ignoring names already present.
    pub fn with_marker(mut self, marker: Marker) -> Self {
        if !self.markers.contains(&marker) {
            self.markers.push(marker);
        }
        self
    }

    /// Replace the default markers.
    pub fn with_markers(mut self, markers: impl IntoIterator<Item = Marker>) -> Self {
        self.markers.clear();
        for marker in markers {
            self = self.with_marker(marker);
        }
        self
    }

    /// Rate-limit every registry of this logger by default.
    pub fn with_every(mut self, every: Every) -> Self {
        self.every = Some(every);
        self
    }

    /// Set the default prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the default suffix.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Render this logger's registries with `formatter`.
    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Write this logger's registries to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Replace the default stack filters.
    pub fn with_stack_filters(mut self, filters: impl IntoIterator<Item = StackFilter>) -> Self {
        self.stack_filters = filters.into_iter().collect();
        self
    }

    /// Register a function applied to every new builder. The most recently
    /// added consumer runs first.
    pub fn with_consumer<F>(mut self, consumer: F) -> Self
    where
        F: Fn(Builder) -> Builder + Send + Sync + 'static,
    {
        self.consumers.insert(0, Arc::new(consumer));
        self
    }

    /// Open a builder at `level`, recording the caller as origin.
    #[track_caller]
    pub fn registry(&self, level: Level) -> Builder {
        let origin = LogOrigin::caller().with_module_path(self.name.clone());

        let mut builder = Builder::new(self.factory.clone(), level)
            .with_origin(origin)
            .with_markers(self.markers.iter().cloned())
            .with_prefix(self.prefix.clone())
            .with_suffix(self.suffix.clone())
            .with_stack_filters(self.stack_filters.iter().cloned());

        if let Some(every) = &self.every {
            builder = builder.with_every(every.clone());
        }
        if let Some(formatter) = &self.formatter {
            builder = builder.with_formatter(Arc::clone(formatter));
        }
        if let Some(sink) = &self.sink {
            builder = builder.with_sink(Arc::clone(sink));
        }

        for consumer in &self.consumers {
            builder = consumer(builder);
        }
        builder
    }

    /// Open a builder for a level registered in the factory, by name.
    #[track_caller]
    pub fn level(&self, name: &str) -> Option<Builder> {
        let level = self.factory.levels().get(name)?;
        Some(self.registry(level))
    }

    /// Open a `TRACE` builder.
    #[track_caller]
    pub fn trace(&self) -> Builder {
        self.registry(Level::TRACE)
    }

    /// Open a `DEBUG` builder.
    #[track_caller]
    pub fn debug(&self) -> Builder {
        self.registry(Level::DEBUG)
    }

    /// Open an `INFO` builder.
    #[track_caller]
    pub fn info(&self) -> Builder {
        self.registry(Level::INFO)
    }

    /// Open a `WARN` builder.
    #[track_caller]
    pub fn warn(&self) -> Builder {
        self.registry(Level::WARN)
    }

    /// Open a `SEVERE` builder.
    #[track_caller]
    pub fn severe(&self) -> Builder {
        self.registry(Level::SEVERE)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("markers", &self.markers)
            .field("every", &self.every)
            .field("prefix", &self.prefix)
            .field("suffix", &self.suffix)
            .field("stack_filters", &self.stack_filters)
            .field("consumers", &self.consumers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mocks::sink::MemorySink;
    use std::sync::Mutex;

    fn factory() -> LoggerFactory {
        LoggerFactory::builder()
            .with_sink(Arc::new(MemorySink::new()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let logger = factory().logger("app");
        assert_eq!(logger.name(), "app");
        assert_eq!(logger.prefix(), "");
        assert_eq!(logger.suffix(), "\n");
        assert!(logger.every().is_none());
        assert!(logger.markers().is_empty());
    }

    #[test]
    fn test_origin_is_the_caller() {
        let logger = factory().logger("app::module");
        let line = line!() + 1;
        let builder = logger.info();

        let origin = builder.origin().unwrap();
        assert_eq!(origin.module_path(), Some("app::module"));
        assert!(origin.file().unwrap().ends_with("logger.rs"));
        assert_eq!(origin.line(), Some(line));
    }

    #[test]
    fn test_defaults_flow_into_builders() {
        let logger = factory()
            .logger("app")
            .with_marker(Marker::new("a"))
            .with_marker(Marker::new("a"))
            .with_prefix("[app] ")
            .with_every(Every::times(3))
            .with_stack_filters([StackFilter::SMALL]);

        let builder = logger.severe();
        assert_eq!(builder.level(), &Level::SEVERE);
        assert_eq!(builder.markers().len(), 1);
        assert_eq!(builder.prefix(), "[app] ");
        assert_eq!(builder.suffix(), "\n");
        assert!(matches!(builder.every(), Some(Every::Times(3))));
        assert_eq!(builder.stack_filters().len(), 1);
    }

    #[test]
    fn test_consumers_most_recent_first() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let first = Arc::clone(&order);
        let second = Arc::clone(&order);

        let logger = factory()
            .logger("app")
            .with_consumer(move |b| {
                first.lock().unwrap().push("first");
                b.with_suffix("!")
            })
            .with_consumer(move |b| {
                second.lock().unwrap().push("second");
                b.with_suffix("?")
            });

        let builder = logger.info();
        assert_eq!(*order.lock().unwrap(), vec!["second", "first"]);
        // The oldest consumer runs last and wins.
        assert_eq!(builder.suffix(), "!");
    }

    #[test]
    fn test_level_by_name() {
        let factory = factory();
        factory.levels().register(Level::new("audit"));
        let logger = factory.logger("app");

        assert_eq!(logger.level("AUDIT").unwrap().level().name(), "audit");
        assert!(logger.level("missing").is_none());
    }

    #[test]
    fn test_markers_replace() {
        let logger = factory()
            .logger("app")
            .with_marker(Marker::new("a"))
            .with_markers([Marker::new("b"), Marker::new("c")]);
        let names: Vec<&str> = logger.markers().iter().map(Marker::name).collect();
        assert_eq!(names, vec!["b", "c"]);
    }
}
