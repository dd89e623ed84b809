//! In-memory sink for testing.

use crate::application::ports::Sink;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

/// Sink that captures every write.
///
/// Clones share the same buffer, so a test can hand one clone to a factory
/// and inspect the output through another.
///
/// # Examples
///
/// ```
/// use logm::infrastructure::mocks::MemorySink;
/// use logm::application::ports::Sink;
///
/// let sink = MemorySink::new();
/// sink.write(b"first\n").unwrap();
/// sink.write(b"second\n").unwrap();
///
/// assert_eq!(sink.len(), 2);
/// assert_eq!(sink.lines(), vec!["first", "second"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// All writes concatenated and decoded as UTF-8 (lossy).
    pub fn contents(&self) -> String {
        let writes = self.writes.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&writes.concat()).into_owned()
    }

    /// Captured output split into lines.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    /// Number of writes.
    pub fn len(&self) -> usize {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if nothing was written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every write.
    pub fn clear(&self) {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Sink for MemorySink {
    fn write(&self, bytes: &[u8]) -> io::Result<()> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(bytes.to_vec());
        Ok(())
    }
}
