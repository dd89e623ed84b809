//! Mock implementations for testing.
//!
//! This module provides test doubles for infrastructure adapters,
//! enabling controlled testing of the logging core.

pub mod clock;
pub mod sink;

pub use clock::MockClock;
pub use sink::MemorySink;
