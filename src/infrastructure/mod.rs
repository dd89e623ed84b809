//! Infrastructure layer - external adapters and integrations.
//!
//! This layer provides adapters for:
//! - Clock abstraction (system time vs mock)
//! - The in-memory history store
//! - Writer sinks and the default text formatter
//! - Tracing integration (Layer trait)

pub mod clock;
pub mod formatter;
pub mod history;
pub mod layer;
pub mod sink;
pub(crate) mod visitor;

/// Mock implementations for testing.
///
/// This module is only available when the `test-helpers` feature is enabled,
/// or during test builds. It provides a controllable clock and an in-memory
/// sink.
///
/// To use these mocks in integration tests, add to your `Cargo.toml`:
/// ```toml
/// [dev-dependencies]
/// logm = { version = "*", features = ["test-helpers"] }
/// ```
#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;
