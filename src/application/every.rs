//! `Every` policies: history-based rate limiting and deduplication.
//!
//! A policy decides whether a registry may be written now by looking at the
//! registries already in the history store that share its [`Identity`].
//!
//! ## Built-in policies
//!
//! - **Period**: write at most once per time window. Only registries that
//!   were actually written count, so a suppressed registry never extends the
//!   window.
//! - **Times**: write the first occurrence, then every `(n + 1)`-th one.
//!   Every prior occurrence counts, suppressed or not, so `times(2)` writes
//!   occurrences 1, 4, 7 and so on.
//!
//! Custom policies implement [`EveryPolicy`].

use crate::application::error::LogError;
use crate::application::ports::HistoryStore;
use crate::application::registry::{Identity, Registry};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Trait for user-supplied `Every` policies.
pub trait EveryPolicy: Send + Sync + fmt::Debug {
    /// Decide whether a registry with `identity` may be written at `now`.
    fn can_log(&self, identity: &Identity, now: DateTime<Utc>, history: &dyn HistoryStore)
        -> bool;
}

/// Rate limiting policy attached to a logger or a single builder.
#[derive(Clone)]
pub enum Every {
    /// At most one written registry per window.
    Period(Duration),
    /// The first occurrence, then every `(n + 1)`-th.
    Times(usize),
    /// A user-supplied policy.
    Custom(Arc<dyn EveryPolicy>),
}

impl Every {
    /// Write at most once per `duration`.
    pub fn period(duration: Duration) -> Self {
        Every::Period(duration)
    }

    /// Write the first occurrence, then skip `skip` occurrences between
    /// written ones.
    pub fn times(skip: usize) -> Self {
        Every::Times(skip)
    }

    /// Use a custom policy.
    pub fn custom(policy: impl EveryPolicy + 'static) -> Self {
        Every::Custom(Arc::new(policy))
    }

    /// Name used in errors and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Every::Period(_) => "period",
            Every::Times(_) => "times",
            Every::Custom(_) => "custom",
        }
    }

    /// Decide whether a registry with `identity` may be written at `now`.
    ///
    /// # Errors
    /// Returns [`LogError::MissingHistory`] when `history` is `None`.
    pub fn can_log(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
        history: Option<&dyn HistoryStore>,
    ) -> Result<bool, LogError> {
        let history = history.ok_or(LogError::MissingHistory {
            policy: self.name(),
        })?;

        let allowed = match self {
            Every::Period(duration) => {
                let last = history
                    .last_where(&|registry: &Registry| {
                        !registry.is_suppressed() && identity.matches(registry)
                    });

                match last {
                    None => true,
                    Some(last) => window_end(last.timestamp(), *duration)
                        .map(|end| end < now)
                        .unwrap_or(false),
                }
            }
            Every::Times(skip) => {
                let count = history.count_where(&|registry: &Registry| identity.matches(registry));
                allowed_by_count(count, *skip)
            }
            Every::Custom(policy) => policy.can_log(identity, now, history),
        };

        Ok(allowed)
    }
}

/// `None` when the end of the window is not representable, i.e. never.
fn window_end(start: DateTime<Utc>, duration: Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|duration| start.checked_add_signed(duration))
}

/// `count` is the number of prior occurrences.
fn allowed_by_count(count: usize, skip: usize) -> bool {
    match skip.checked_add(1) {
        Some(cycle) => count % cycle == 0,
        None => count == 0,
    }
}

impl fmt::Debug for Every {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Every::Period(duration) => f.debug_tuple("Period").field(duration).finish(),
            Every::Times(skip) => f.debug_tuple("Times").field(skip).finish(),
            Every::Custom(policy) => f.debug_tuple("Custom").field(policy).finish(),
        }
    }
}
