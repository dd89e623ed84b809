//! Domain layer - plain values with no knowledge of sinks or history.
//!
//! This layer contains the vocabulary of a log registry:
//! - Levels and the level registry
//! - Markers, origins and payloads
//! - Error causes and stack trimming
//! - Identity signatures
//!
//! All types in this layer are pure and easily testable.

pub mod cause;
pub mod level;
pub mod marker;
pub mod origin;
pub mod payload;
pub mod signature;
pub mod stack_filter;
