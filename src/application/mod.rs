//! Application layer - the logging pipeline.
//!
//! This layer turns builder calls into finalized registries:
//! - Loggers, factories and builders
//! - The filter chain and `Every` rate limiting
//! - Immutable registries and their identities
//! - Metrics
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement: clocks, formatters, sinks and history stores.

pub mod builder;
pub mod error;
pub mod every;
pub mod factory;
pub mod filter;
pub mod logger;
pub mod metrics;
pub mod ports;
pub mod registry;
