//! Markers: named tags attached to log registries.
//!
//! A marker may reference child markers, forming a small tree used to group
//! related tags. Marker identity is the name alone; color and children do not
//! take part in equality or hashing.

use crate::domain::level::Rgb;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A named, optionally colored tag.
#[derive(Debug, Clone)]
pub struct Marker {
    name: String,
    color: Option<Rgb>,
    references: Vec<Marker>,
}

impl Marker {
    /// Create an uncolored marker.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: None,
            references: Vec::new(),
        }
    }

    /// Create a marker with a color hint.
    pub fn colored(name: impl Into<String>, color: Rgb) -> Self {
        Self {
            color: Some(color),
            ..Self::new(name)
        }
    }

    /// The marker name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The color hint, if any.
    pub fn color(&self) -> Option<Rgb> {
        self.color
    }

    /// Add a child reference. Adding a marker whose name is already
    /// referenced does nothing.
    pub fn add_reference(&mut self, reference: Marker) {
        if !self.references.contains(&reference) {
            self.references.push(reference);
        }
    }

    /// Fluent form of [`add_reference`](Self::add_reference).
    pub fn with_reference(mut self, reference: Marker) -> Self {
        self.add_reference(reference);
        self
    }

    /// Remove the child reference with this name.
    pub fn remove_reference(&mut self, name: &str) -> bool {
        let before = self.references.len();
        self.references.retain(|marker| marker.name != name);
        self.references.len() != before
    }

    /// Check if this marker references any child.
    pub fn has_references(&self) -> bool {
        !self.references.is_empty()
    }

    /// Check whether a direct child with this name is referenced.
    pub fn contains(&self, name: &str) -> bool {
        self.references.iter().any(|marker| marker.name == name)
    }

    /// Iterate over the direct children in insertion order.
    pub fn references(&self) -> impl Iterator<Item = &Marker> {
        self.references.iter()
    }
}

impl PartialEq for Marker {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Marker {}

impl Hash for Marker {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
