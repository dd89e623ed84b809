//! Stack trace trimming policies.
//!
//! Filters are applied in order to the frames of a registry's cause before
//! formatting. Each filter receives the output of the previous one.

use crate::domain::cause::Frame;
use std::fmt;
use std::sync::Arc;

/// A function from frames to frames.
#[derive(Clone)]
pub enum StackFilter {
    /// Keep every frame.
    Full,
    /// Drop every frame.
    None,
    /// Drop frames without a source location.
    Native,
    /// Keep the first `n` frames.
    First(usize),
    /// User-supplied trimming.
    Custom(Arc<dyn Fn(&[Frame]) -> Vec<Frame> + Send + Sync>),
}

impl StackFilter {
    /// Keep the first 7 frames.
    pub const SMALL: StackFilter = StackFilter::First(7);
    /// Keep the first 12 frames.
    pub const MEDIUM: StackFilter = StackFilter::First(12);
    /// Keep the first 17 frames.
    pub const LARGE: StackFilter = StackFilter::First(17);

    /// Create a custom filter.
    pub fn custom<F>(filter: F) -> Self
    where
        F: Fn(&[Frame]) -> Vec<Frame> + Send + Sync + 'static,
    {
        StackFilter::Custom(Arc::new(filter))
    }

    /// Apply this filter to a list of frames.
    pub fn apply(&self, frames: Vec<Frame>) -> Vec<Frame> {
        match self {
            StackFilter::Full => frames,
            StackFilter::None => Vec::new(),
            StackFilter::Native => frames.into_iter().filter(|f| !f.is_native()).collect(),
            StackFilter::First(n) => {
                let mut frames = frames;
                frames.truncate(*n);
                frames
            }
            StackFilter::Custom(filter) => filter(&frames),
        }
    }

    /// Apply filters in sequence. An empty list keeps every frame.
    pub fn apply_all(filters: &[StackFilter], frames: &[Frame]) -> Vec<Frame> {
        filters
            .iter()
            .fold(frames.to_vec(), |frames, filter| filter.apply(frames))
    }
}

impl fmt::Debug for StackFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackFilter::Full => write!(f, "Full"),
            StackFilter::None => write!(f, "None"),
            StackFilter::Native => write!(f, "Native"),
            StackFilter::First(n) => f.debug_tuple("First").field(n).finish(),
            StackFilter::Custom(_) => write!(f, "Custom(<fn>)"),
        }
    }
}
