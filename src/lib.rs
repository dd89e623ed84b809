//! # logm
//!
//! Fluent structured logging with history-based rate limiting and
//! thread-local diagnostic context.
//!
//! Every log call opens a [`Builder`] from a named [`Logger`], decorates it
//! with markers, a cause, a prefix or an [`Every`] policy, and finalizes it
//! into an immutable [`Registry`]. Finalized registries are appended to the
//! factory's history store (suppressed ones included) and, unless suppressed,
//! formatted and written to a sink.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use logm::{Every, LoggerFactory, Marker};
//! use std::time::Duration;
//!
//! let factory = LoggerFactory::builder()
//!     .with_history_capacity(10_000)
//!     .build()
//!     .unwrap();
//!
//! let logger = factory.logger("app::db").with_marker(Marker::new("db"));
//! logger.info().log_with("connected").unwrap();
//!
//! // At most one line per 30 seconds for the same identity.
//! for _ in 0..100 {
//!     logger
//!         .warn()
//!         .with_every(Every::period(Duration::from_secs(30)))
//!         .log_with("pool exhausted")
//!         .unwrap();
//! }
//! ```
//!
//! ## Rate Limiting
//!
//! [`Every`] decides against the history store whether a registry is
//! written:
//! - **`Every::period(d)`**: write once, then suppress the same identity until
//!   `d` has passed since the last written one
//! - **`Every::times(n)`**: write one, suppress the next `n`, repeat
//! - **`Every::custom(policy)`**: any [`EveryPolicy`]
//!
//! Two registries share an identity when they have the same level, markers
//! in order, payload and origin.
//!
//! ## Diagnostic Context
//!
//! [`DiagnosticMap`] and [`DiagnosticStack`] are thread-local and snapshotted
//! into every registry:
//!
//! ```rust
//! use logm::{DiagnosticMap, DiagnosticStack};
//!
//! let _request = DiagnosticMap::current().install(&[("request", "42")].into_iter().collect());
//! let _scope = DiagnosticStack::current().push_scope("checkout");
//!
//! assert_eq!(DiagnosticMap::current().get("request").as_deref(), Some("42"));
//! assert_eq!(DiagnosticStack::current().peek().as_deref(), Some("checkout"));
//! ```
//!
//! Use `wrap` to carry context into other threads and [`WithContext`] to
//! carry it through async tasks.
//!
//! ## Tracing Integration
//!
//! [`RegistryLayer`] forwards `tracing` events into a logger:
//!
//! ```rust,no_run
//! use logm::{LoggerFactory, RegistryLayer};
//! use tracing_subscriber::prelude::*;
//!
//! let logger = LoggerFactory::global().logger("app");
//! tracing_subscriber::registry()
//!     .with(RegistryLayer::new(logger))
//!     .init();
//!
//! tracing::info!(user = 7, "signed in");
//! ```
//!
//! ## Architecture
//!
//! - [`domain`]: plain values (levels, markers, payloads, causes)
//! - [`application`]: the pipeline and its ports
//! - [`context`]: thread-local diagnostic context
//! - [`infrastructure`]: clocks, sinks, the formatter, the history store and
//!   the `tracing` bridge

// Domain layer - plain values
pub mod domain;

// Application layer - the logging pipeline
pub mod application;

// Thread-scoped diagnostic context
pub mod context;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    cause::{Cause, Frame},
    level::{Level, Levels, Rgb},
    marker::Marker,
    origin::LogOrigin,
    payload::Payload,
    signature::EventSignature,
    stack_filter::StackFilter,
};

pub use application::{
    builder::Builder,
    error::{BuildError, LogError},
    every::{Every, EveryPolicy},
    factory::{LoggerFactory, LoggerFactoryBuilder},
    filter::{Filter, Filters},
    logger::Logger,
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, Formatter, HistoryStore, Sink},
    registry::{Identity, Registry},
};

pub use context::{ContextMap, DiagnosticMap, DiagnosticStack, MapScope, StackScope, WithContext};

pub use infrastructure::{
    clock::SystemClock,
    formatter::{DefaultFormatter, DEFAULT_DATE_FORMAT},
    history::MemoryHistory,
    layer::RegistryLayer,
    sink::WriterSink,
};
