//! Finalized log registries.
//!
//! A [`Registry`] is what a `log()` call produces: one immutable record of a
//! log event, kept in the history store and rendered to the sink unless it
//! was suppressed. Nothing about a registry changes after `log()` returns.

use crate::application::every::Every;
use crate::application::ports::Formatter;
use crate::context::map::ContextMap;
use crate::domain::cause::{Cause, Frame};
use crate::domain::level::Level;
use crate::domain::marker::Marker;
use crate::domain::origin::LogOrigin;
use crate::domain::payload::Payload;
use crate::domain::signature::EventSignature;
use crate::domain::stack_filter::StackFilter;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// The identity `Every` policies rate-limit on.
///
/// Two registries share an identity when they have the same level, the same
/// marker names in the same order, equal payloads and equal origins. A
/// missing payload or origin only matches another missing one.
#[derive(Debug, Clone)]
pub struct Identity {
    level: Level,
    markers: Vec<Marker>,
    payload: Option<Payload>,
    origin: Option<LogOrigin>,
    signature: EventSignature,
}

impl Identity {
    pub fn new(
        level: Level,
        markers: Vec<Marker>,
        payload: Option<Payload>,
        origin: Option<LogOrigin>,
    ) -> Self {
        let signature =
            EventSignature::new(&level, &markers, payload.as_ref(), origin.as_ref());
        Self {
            level,
            markers,
            payload,
            origin,
            signature,
        }
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    pub fn origin(&self) -> Option<&LogOrigin> {
        self.origin.as_ref()
    }

    pub fn signature(&self) -> EventSignature {
        self.signature
    }

    /// Check whether a registry has this identity.
    pub fn matches(&self, registry: &Registry) -> bool {
        registry.signature == self.signature
            && registry.level == self.level
            && registry.markers == self.markers
            && registry.payload == self.payload
            && registry.origin == self.origin
    }
}

/// Everything a builder hands over when it finalizes.
pub(crate) struct RegistryParts {
    pub level: Level,
    pub timestamp: DateTime<Utc>,
    pub origin: Option<LogOrigin>,
    pub cause: Option<Cause>,
    pub markers: Vec<Marker>,
    pub stack_filters: Vec<StackFilter>,
    pub prefix: String,
    pub suffix: String,
    pub formatter: Arc<dyn Formatter>,
    pub payload: Option<Payload>,
    pub every: Option<Every>,
    pub suppressed: bool,
    pub context: ContextMap,
    pub stack: Vec<String>,
}

/// One finalized, immutable log event.
#[derive(Clone)]
pub struct Registry {
    sequence: u64,
    level: Level,
    timestamp: DateTime<Utc>,
    origin: Option<LogOrigin>,
    cause: Option<Cause>,
    markers: Vec<Marker>,
    stack_filters: Vec<StackFilter>,
    prefix: String,
    suffix: String,
    formatter: Arc<dyn Formatter>,
    payload: Option<Payload>,
    every: Option<Every>,
    suppressed: bool,
    context: ContextMap,
    stack: Vec<String>,
    signature: EventSignature,
}

impl Registry {
    pub(crate) fn from_parts(parts: RegistryParts) -> Self {
        let signature = EventSignature::new(
            &parts.level,
            &parts.markers,
            parts.payload.as_ref(),
            parts.origin.as_ref(),
        );

        Self {
            sequence: NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed),
            level: parts.level,
            timestamp: parts.timestamp,
            origin: parts.origin,
            cause: parts.cause,
            markers: parts.markers,
            stack_filters: parts.stack_filters,
            prefix: parts.prefix,
            suffix: parts.suffix,
            formatter: parts.formatter,
            payload: parts.payload,
            every: parts.every,
            suppressed: parts.suppressed,
            context: parts.context,
            stack: parts.stack,
            signature,
        }
    }

    /// Process-unique number, increasing in creation order.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn origin(&self) -> Option<&LogOrigin> {
        self.origin.as_ref()
    }

    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn stack_filters(&self) -> &[StackFilter] {
        &self.stack_filters
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn formatter(&self) -> &Arc<dyn Formatter> {
        &self.formatter
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    pub fn every(&self) -> Option<&Every> {
        self.every.as_ref()
    }

    /// Whether a filter or the `Every` policy held this registry back.
    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Diagnostic map of the logging thread when `log()` ran.
    pub fn context(&self) -> &ContextMap {
        &self.context
    }

    /// Diagnostic stack of the logging thread when `log()` ran, top first.
    pub fn stack(&self) -> &[String] {
        &self.stack
    }

    pub fn signature(&self) -> EventSignature {
        self.signature
    }

    /// Identity of this registry for `Every` matching.
    pub fn identity(&self) -> Identity {
        Identity {
            level: self.level.clone(),
            markers: self.markers.clone(),
            payload: self.payload.clone(),
            origin: self.origin.clone(),
            signature: self.signature,
        }
    }

    /// Frames of the cause after applying the stack filters in order.
    pub fn filtered_frames(&self) -> Vec<Frame> {
        match &self.cause {
            Some(cause) => StackFilter::apply_all(&self.stack_filters, cause.frames()),
            None => Vec::new(),
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("sequence", &self.sequence)
            .field("level", &self.level)
            .field("timestamp", &self.timestamp)
            .field("origin", &self.origin)
            .field("cause", &self.cause.as_ref().map(ToString::to_string))
            .field("markers", &self.markers)
            .field("payload", &self.payload)
            .field("suppressed", &self.suppressed)
            .field("context", &self.context)
            .field("stack", &self.stack)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatter.format(self))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io;

    #[derive(Debug)]
    pub(crate) struct PayloadFormatter;

    impl Formatter for PayloadFormatter {
        fn format(&self, registry: &Registry) -> String {
            let payload = registry.payload().map(ToString::to_string).unwrap_or_default();
            format!("{}{} {}{}", registry.prefix(), registry.level(), payload, registry.suffix())
        }
    }

    pub(crate) fn parts(level: Level, payload: Option<Payload>) -> RegistryParts {
        RegistryParts {
            level,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            origin: None,
            cause: None,
            markers: Vec::new(),
            stack_filters: Vec::new(),
            prefix: String::new(),
            suffix: String::new(),
            formatter: Arc::new(PayloadFormatter),
            payload,
            every: None,
            suppressed: false,
            context: ContextMap::new(),
            stack: Vec::new(),
        }
    }

    #[test]
    fn test_sequence_increases() {
        let a = Registry::from_parts(parts(Level::INFO, None));
        let b = Registry::from_parts(parts(Level::INFO, None));
        assert!(b.sequence() > a.sequence());
    }

    #[test]
    fn test_identity_matches_own_registry() {
        let mut p = parts(Level::WARN, Some(Payload::from("disk low")));
        p.markers = vec![Marker::new("disk")];
        p.origin = Some(LogOrigin::new(None, Some("a.rs".into()), None, Some(3)));
        let registry = Registry::from_parts(p);

        let identity = registry.identity();
        assert!(identity.matches(&registry));
        assert_eq!(identity.signature(), registry.signature());
    }

    #[test]
    fn test_identity_mismatch() {
        let registry = Registry::from_parts(parts(Level::WARN, Some(Payload::from("x"))));

        let other_level = Identity::new(Level::INFO, Vec::new(), Some(Payload::from("x")), None);
        let other_payload = Identity::new(Level::WARN, Vec::new(), Some(Payload::from("y")), None);
        let no_payload = Identity::new(Level::WARN, Vec::new(), None, None);
        let with_origin = Identity::new(
            Level::WARN,
            Vec::new(),
            Some(Payload::from("x")),
            Some(LogOrigin::new(None, None, None, Some(1))),
        );

        assert!(!other_level.matches(&registry));
        assert!(!other_payload.matches(&registry));
        assert!(!no_payload.matches(&registry));
        assert!(!with_origin.matches(&registry));
        assert!(Identity::new(Level::new("warn"), Vec::new(), Some(Payload::from("x")), None)
            .matches(&registry));
    }

    #[test]
    fn test_display_uses_formatter() {
        let mut p = parts(Level::INFO, Some(Payload::from("hello")));
        p.prefix = "> ".into();
        p.suffix = "\n".into();
        let registry = Registry::from_parts(p);
        assert_eq!(registry.to_string(), "> INFO hello\n");
    }

    #[test]
    fn test_filtered_frames() {
        let frames = (0..10).map(|i| Frame::new(format!("f{}", i), Some("x.rs".into()), Some(i)));
        let mut p = parts(Level::SEVERE, None);
        p.cause = Some(
            Cause::new(io::Error::new(io::ErrorKind::Other, "boom")).with_frames(frames),
        );
        p.stack_filters = vec![StackFilter::First(3)];
        let registry = Registry::from_parts(p);

        assert_eq!(registry.filtered_frames().len(), 3);
        assert_eq!(registry.cause().map(|c| c.frames().len()), Some(10));
    }

    #[test]
    fn test_no_cause_no_frames() {
        let registry = Registry::from_parts(parts(Level::INFO, None));
        assert!(registry.filtered_frames().is_empty());
    }
}
