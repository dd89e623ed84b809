//! Plain-text default formatter.

use crate::application::ports::Formatter;
use crate::application::registry::Registry;
use chrono::format::{Item, StrftimeItems};
use std::fmt::Write as _;
use tracing::warn;

/// `yy-dd-MM HH:MM:SS.mmm`
pub const DEFAULT_DATE_FORMAT: &str = "%y-%d-%m %H:%M:%S%.3f";

/// Renders registries as one header line plus the cause chain.
///
/// ```text
/// | 24-15-03 09:12:44.120 WARN  db  repo:42 {tenant=acme} [sync/flush] - slow query
/// ```
///
/// Markers are followed by their direct children. The diagnostic context and
/// stack are only shown when non-empty, the stack from bottom to top. The
/// result is wrapped in the registry's prefix and suffix.
#[derive(Debug, Clone)]
pub struct DefaultFormatter {
    date_format: String,
}

impl DefaultFormatter {
    pub fn new() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    /// Use a `chrono` strftime pattern for timestamps.
    ///
    /// A pattern `chrono` cannot parse is replaced by [`DEFAULT_DATE_FORMAT`].
    pub fn with_date_format(mut self, date_format: impl Into<String>) -> Self {
        let date_format = date_format.into();
        if StrftimeItems::new(&date_format).any(|item| matches!(item, Item::Error)) {
            warn!(pattern = %date_format, "invalid date format, using default");
            self.date_format = DEFAULT_DATE_FORMAT.to_string();
        } else {
            self.date_format = date_format;
        }
        self
    }

    fn header(&self, registry: &Registry, out: &mut String) {
        let mut date = String::with_capacity(24);
        // Only fails on a pattern rejected by `with_date_format`.
        if write!(date, "{}", registry.timestamp().format(&self.date_format)).is_err() {
            date.clear();
        }
        let _ = write!(out, "| {:<21} {} ", date, registry.level());

        let markers = registry.markers();
        for marker in markers {
            let _ = write!(out, " {}", marker);
            for child in marker.references() {
                let _ = write!(out, " {}", child);
            }
        }
        if !markers.is_empty() {
            out.push(' ');
        }

        if let Some(origin) = registry.origin() {
            let _ = write!(out, " {}", origin.short_label());
        }

        let context = registry.context();
        if !context.is_empty() {
            out.push_str(" {");
            for (index, (key, value)) in context.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{}={}", key, value);
            }
            out.push('}');
        }

        let stack = registry.stack();
        if !stack.is_empty() {
            let path: Vec<&str> = stack.iter().rev().map(String::as_str).collect();
            let _ = write!(out, " [{}]", path.join("/"));
        }

        out.push_str(" - ");
    }

    fn cause(&self, registry: &Registry, out: &mut String) {
        let Some(cause) = registry.cause() else {
            return;
        };

        if registry.payload().is_some() {
            out.push('\n');
        }

        let mut chain = cause.chain();
        if let Some(head) = chain.next() {
            let _ = write!(out, "{}", head.to_string().replace('\r', ""));
        }
        for frame in registry.filtered_frames() {
            let _ = write!(out, "\n\tat {}", frame);
        }
        for source in chain {
            let _ = write!(out, "\nCaused by: {}", source.to_string().replace('\r', ""));
        }
    }
}

impl Default for DefaultFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for DefaultFormatter {
    fn format(&self, registry: &Registry) -> String {
        let mut out = String::with_capacity(128);
        out.push_str(registry.prefix());

        self.header(registry, &mut out);
        if let Some(payload) = registry.payload() {
            out.push_str(&payload.to_string().replace('\r', ""));
        }
        self.cause(registry, &mut out);

        out.push_str(registry.suffix());
        out
    }
}
