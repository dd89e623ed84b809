//! Error causes attached to registries, with optional stack frames.

use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// One stack frame of a captured trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    symbol: String,
    file: Option<String>,
    line: Option<u32>,
}

impl Frame {
    pub fn new(symbol: impl Into<String>, file: Option<String>, line: Option<u32>) -> Self {
        Self {
            symbol: symbol.into(),
            file,
            line,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }

    /// A frame with no source location, e.g. libc or runtime glue.
    pub fn is_native(&self) -> bool {
        self.file.is_none()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "{} ({}:{})", self.symbol, file, line),
            (Some(file), None) => write!(f, "{} ({})", self.symbol, file),
            (None, _) => write!(f, "{} (Native Method)", self.symbol),
        }
    }
}

/// An error attached to a registry.
///
/// The error is shared, so cloning a cause or the registry holding it is
/// cheap. Frames are only present when the cause was built with
/// [`Cause::capture`] or [`Cause::with_frames`].
#[derive(Debug, Clone)]
pub struct Cause {
    error: Arc<dyn Error + Send + Sync>,
    frames: Arc<[Frame]>,
}

impl Cause {
    /// Wrap an error without frames.
    pub fn new(error: impl Error + Send + Sync + 'static) -> Self {
        Self::from_arc(Arc::new(error))
    }

    /// Wrap an already shared error.
    pub fn from_arc(error: Arc<dyn Error + Send + Sync>) -> Self {
        Self {
            error,
            frames: Arc::from(Vec::new()),
        }
    }

    /// Wrap an error and capture the current thread's backtrace.
    pub fn capture(error: impl Error + Send + Sync + 'static) -> Self {
        let backtrace = Backtrace::force_capture();
        Self::new(error).with_frames(parse_backtrace(&backtrace.to_string()))
    }

    /// Replace the frames of this cause.
    pub fn with_frames(mut self, frames: impl IntoIterator<Item = Frame>) -> Self {
        self.frames = frames.into_iter().collect::<Vec<_>>().into();
        self
    }

    /// The wrapped error.
    pub fn error(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.error.as_ref()
    }

    /// Frames as captured, before any stack filter.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// The error followed by its `source()` chain.
    pub fn chain(&self) -> impl Iterator<Item = &(dyn Error + 'static)> {
        let head: &(dyn Error + 'static) = self.error.as_ref();
        std::iter::successors(Some(head), |error| Error::source(*error))
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

/// Parse the textual form of a `std::backtrace::Backtrace`.
///
/// Symbol lines look like `  3: crate::module::function` and are optionally
/// followed by `at path/to/file.rs:12:5`.
pub(crate) fn parse_backtrace(text: &str) -> Vec<Frame> {
    let mut frames: Vec<Frame> = Vec::new();

    for line in text.lines().map(str::trim) {
        if let Some(location) = line.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                let (file, line) = split_location(location);
                frame.file = Some(file);
                frame.line = line;
            }
            continue;
        }

        if let Some((index, symbol)) = line.split_once(": ") {
            if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) {
                frames.push(Frame::new(symbol.trim(), None, None));
            }
        }
    }

    frames
}

fn split_location(location: &str) -> (String, Option<u32>) {
    // `file:line:column`, where the file itself may contain ':' on Windows.
    let mut parts = location.rsplitn(3, ':');
    let column = parts.next();
    let line = parts.next();
    let file = parts.next();

    match (file, line, column) {
        (Some(file), Some(line), Some(_)) => match line.parse() {
            Ok(line) => (file.to_string(), Some(line)),
            Err(_) => (location.to_string(), None),
        },
        _ => (location.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[derive(Debug)]
    struct Outer(io::Error);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("outer failure")
        }
    }

    impl Error for Outer {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_chain_follows_sources() {
        let cause = Cause::new(Outer(io::Error::new(io::ErrorKind::Other, "disk gone")));
        let messages: Vec<String> = cause.chain().map(|e| e.to_string()).collect();
        assert_eq!(messages, vec!["outer failure", "disk gone"]);
        assert!(cause.frames().is_empty());
    }

    #[test]
    fn test_parse_backtrace() {
        let text = "   0: app::run\n             at ./src/main.rs:10:5\n   1: __libc_start_main\n   2: app::main\n             at C:\\src\\main.rs:3:1\n";
        let frames = parse_backtrace(text);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0], Frame::new("app::run", Some("./src/main.rs".into()), Some(10)));
        assert!(frames[1].is_native());
        assert_eq!(frames[2].file(), Some("C:\\src\\main.rs"));
        assert_eq!(frames[2].line(), Some(3));
    }

    #[test]
    fn test_parse_ignores_noise() {
        assert!(parse_backtrace("disabled backtrace").is_empty());
        assert!(parse_backtrace("note: run with `RUST_BACKTRACE=1`").is_empty());
    }

    #[test]
    fn test_frame_display() {
        assert_eq!(
            Frame::new("a::b", Some("a.rs".into()), Some(4)).to_string(),
            "a::b (a.rs:4)"
        );
        assert_eq!(Frame::new("ffi", None, None).to_string(), "ffi (Native Method)");
    }

    #[test]
    fn test_capture_records_frames() {
        let cause = Cause::capture(io::Error::new(io::ErrorKind::Other, "boom"));
        assert_eq!(cause.to_string(), "boom");
        // Symbolication may be unavailable, frames are best effort.
        let _ = cause.frames().len();
    }
}
