//! Thread-scoped diagnostic context.
//!
//! Two independent per-thread structures are attached to every registry when
//! it is logged:
//! - [`DiagnosticMap`]: ordered key/value pairs (request ids, tenants, ...)
//! - [`DiagnosticStack`]: nested operation names
//!
//! Threads never see each other's context. To carry context to another
//! thread use `wrap`, and to carry it through an async task use
//! [`WithContext`].

pub mod future;
pub mod map;
pub mod stack;

pub use future::WithContext;
pub use map::{ContextMap, DiagnosticMap, MapScope};
pub use stack::{DiagnosticStack, StackScope};
