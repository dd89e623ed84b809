//! Error types returned by the logging core.

use std::io;
use thiserror::Error;

/// Failure of a `log()` call.
#[derive(Debug, Error)]
pub enum LogError {
    /// An `Every` policy needs a history store and none is attached.
    #[error("`{policy}` policy requires a history store, but none is configured")]
    MissingHistory { policy: &'static str },

    /// Writing to the sink failed. The registry was already appended to the
    /// history store.
    #[error("failed to write registry to sink")]
    Sink(#[source] io::Error),
}

/// Errors that can occur when building a logger factory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// History capacity must be greater than zero.
    #[error("history capacity must be greater than 0")]
    ZeroHistoryCapacity,
}
