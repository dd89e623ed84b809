//! Call-site descriptors for log registries.

use std::fmt;
use std::panic::Location;

/// Where a log call was made.
///
/// Loggers capture the origin with `#[track_caller]`, so the recorded
/// location is the first frame outside this crate. Bridges such as the
/// tracing layer fill the module path from event metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogOrigin {
    module_path: Option<String>,
    file: Option<String>,
    function: Option<String>,
    line: Option<u32>,
}

impl LogOrigin {
    /// Create an origin from its parts.
    pub fn new(
        module_path: Option<String>,
        file: Option<String>,
        function: Option<String>,
        line: Option<u32>,
    ) -> Self {
        Self {
            module_path,
            file,
            function,
            line,
        }
    }

    /// Origin of the caller of the function this is called from.
    #[track_caller]
    pub fn caller() -> Self {
        Self::from_location(Location::caller())
    }

    /// Origin for a source location.
    pub fn from_location(location: &Location<'_>) -> Self {
        Self {
            module_path: None,
            file: Some(location.file().to_string()),
            function: None,
            line: Some(location.line()),
        }
    }

    /// Set the module path.
    pub fn with_module_path(mut self, module_path: impl Into<String>) -> Self {
        self.module_path = Some(module_path.into());
        self
    }

    /// Set the function name.
    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    pub fn module_path(&self) -> Option<&str> {
        self.module_path.as_deref()
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn function(&self) -> Option<&str> {
        self.function.as_deref()
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }

    /// Short human label: last module segment (or file name) plus the line,
    /// e.g. `handler:42`.
    pub fn short_label(&self) -> String {
        let source = self
            .module_path
            .as_deref()
            .and_then(|path| path.rsplit("::").next())
            .or_else(|| {
                self.file
                    .as_deref()
                    .and_then(|file| file.rsplit(['/', '\\']).next())
            })
            .unwrap_or("?");

        match self.line {
            Some(line) => format!("{}:{}", source, line),
            None => source.to_string(),
        }
    }
}

impl fmt::Display for LogOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.module_path, &self.function) {
            (Some(module), Some(function)) => write!(f, "{}::{}", module, function)?,
            (Some(module), None) => f.write_str(module)?,
            (None, Some(function)) => f.write_str(function)?,
            (None, None) => {}
        }

        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "({}:{})", file, line),
            (Some(file), None) => write!(f, "({})", file),
            (None, _) => f.write_str("(Unknown Source)"),
        }
    }
}
