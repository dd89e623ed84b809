//! Bridge from the `tracing` ecosystem into registries.
//!
//! [`RegistryLayer`] is a `tracing_subscriber::Layer` that logs every
//! `tracing` event through a [`Logger`], so libraries instrumented with
//! `tracing` end up in the same history, filters and sinks as direct calls.
//!
//! ## Mapping
//!
//! - `ERROR` becomes `SEVERE`; the other levels keep their names
//! - The `message` field and all other fields become a structured payload
//! - Event metadata (module path, file, line) becomes the origin
//!
//! Events emitted by this crate itself are ignored.
//!
//! ## Example
//!
//! ```rust,no_run
//! use logm::{LoggerFactory, RegistryLayer};
//! use tracing_subscriber::prelude::*;
//!
//! let logger = LoggerFactory::global().logger("tracing");
//! tracing_subscriber::registry()
//!     .with(RegistryLayer::new(logger))
//!     .init();
//!
//! tracing::info!(user = "alice", "logged in");
//! ```

use crate::application::logger::Logger;
use crate::domain::level::Level;
use crate::domain::origin::LogOrigin;
use crate::domain::payload::Payload;
use crate::infrastructure::visitor::FieldVisitor;
use tracing::{warn, Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Layer turning `tracing` events into registries.
#[derive(Debug, Clone)]
pub struct RegistryLayer {
    logger: Logger,
}

impl RegistryLayer {
    /// Log every event through `logger`.
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}

/// Map a `tracing` level to a registry level.
pub fn level_for(level: &tracing::Level) -> Level {
    match *level {
        tracing::Level::ERROR => Level::SEVERE,
        tracing::Level::WARN => Level::WARN,
        tracing::Level::INFO => Level::INFO,
        tracing::Level::DEBUG => Level::DEBUG,
        tracing::Level::TRACE => Level::TRACE,
    }
}

fn is_internal(target: &str) -> bool {
    target == "logm" || target.starts_with("logm::")
}

impl<S> Layer<S> for RegistryLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if is_internal(metadata.target()) {
            return;
        }

        let mut visitor = FieldVisitor::new();
        event.record(&mut visitor);
        let (message, fields) = visitor.into_parts();

        let origin = LogOrigin::new(
            Some(metadata.module_path().unwrap_or(metadata.target()).to_string()),
            metadata.file().map(str::to_string),
            None,
            metadata.line(),
        );

        let result = self
            .logger
            .registry(level_for(metadata.level()))
            .with_origin(origin)
            .log_with(Payload::Structured { message, fields });

        if let Err(error) = result {
            warn!(%error, event_target = metadata.target(), "failed to log tracing event");
        }
    }
}
