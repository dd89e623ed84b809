//! Log levels and the level registry.
//!
//! A level is a named severity. Two levels are the same level when their
//! names match ignoring ASCII case, so `Level::new("info") == Level::INFO`.
//! Each logger factory owns a [`Levels`] registry seeded with the built-ins
//! which can be extended with custom levels at runtime.

use dashmap::DashMap;
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A 24-bit RGB color hint for formatters that render levels and markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// A named log severity.
///
/// # Example
/// ```
/// use logm::Level;
///
/// let custom = Level::new("audit");
/// assert_eq!(custom, Level::new("AUDIT"));
/// assert_ne!(custom, Level::INFO);
/// ```
#[derive(Debug, Clone)]
pub struct Level {
    name: Cow<'static, str>,
    color: Option<Rgb>,
}

impl Level {
    /// Fine-grained tracing output.
    pub const TRACE: Level = Level::builtin("TRACE", None);
    /// Diagnostic output for development.
    pub const DEBUG: Level = Level::builtin("DEBUG", Some(Rgb(230, 150, 175)));
    /// Progress of the application.
    pub const INFO: Level = Level::builtin("INFO", Some(Rgb(160, 160, 160)));
    /// Potentially harmful situations.
    pub const WARN: Level = Level::builtin("WARN", Some(Rgb(255, 255, 0)));
    /// Serious failures.
    pub const SEVERE: Level = Level::builtin("SEVERE", Some(Rgb(220, 0, 0)));

    const fn builtin(name: &'static str, color: Option<Rgb>) -> Self {
        Self {
            name: Cow::Borrowed(name),
            color,
        }
    }

    /// Create a custom level with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            color: None,
        }
    }

    /// Attach a color hint to this level.
    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }

    /// The level name as it was declared.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The color hint, if any.
    pub fn color(&self) -> Option<Rgb> {
        self.color
    }

    /// The built-in levels, least severe first.
    pub fn builtins() -> [Level; 5] {
        [
            Level::TRACE,
            Level::DEBUG,
            Level::INFO,
            Level::WARN,
            Level::SEVERE,
        ]
    }
}

impl PartialEq for Level {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for Level {}

impl Hash for Level {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Must agree with the case-insensitive `PartialEq`.
        for byte in self.name.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
        state.write_usize(self.name.len());
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Registry of the levels known to a logger factory.
///
/// Lookups are case-insensitive. The registry is safe to share and extend
/// from any thread.
#[derive(Debug)]
pub struct Levels {
    levels: DashMap<String, Level>,
}

impl Levels {
    /// Create a registry seeded with the built-in levels.
    pub fn new() -> Self {
        let levels = Self::empty();
        for level in Level::builtins() {
            levels.register(level);
        }
        levels
    }

    /// Create a registry without any level.
    pub fn empty() -> Self {
        Self {
            levels: DashMap::new(),
        }
    }

    /// Register a level, returning the previously registered level with the
    /// same name if one was replaced.
    pub fn register(&self, level: Level) -> Option<Level> {
        self.levels.insert(level.name().to_ascii_uppercase(), level)
    }

    /// Look a level up by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<Level> {
        self.levels
            .get(&name.to_ascii_uppercase())
            .map(|entry| entry.value().clone())
    }

    /// Check whether a level with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.levels.contains_key(&name.to_ascii_uppercase())
    }

    /// Number of registered levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Check if no level is registered.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Copy of all registered levels, sorted by name.
    pub fn to_vec(&self) -> Vec<Level> {
        let mut levels: Vec<Level> = self
            .levels
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        levels.sort_by(|a, b| a.name().cmp(b.name()));
        levels
    }
}

impl Default for Levels {
    fn default() -> Self {
        Self::new()
    }
}
