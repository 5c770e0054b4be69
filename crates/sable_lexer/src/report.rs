//! Diagnostic collection.
//!
//! All user-facing errors in the compiler are funneled through an
//! [`ErrorReporter`]. Passes take checkpoints on entry to a scope and ask
//! whether new errors arrived since, which lets them discard speculative
//! work instead of cascading.

use crate::span::SourceLocation;
use std::fmt;

/// A kind of user-facing error.
///
/// Implemented by the per-crate error enums. The `code` is a stable string
/// used to identify the error in tests and tooling; the `Display` impl
/// renders the human-readable message.
pub trait ErrorKind: fmt::Display {
    fn code(&self) -> &'static str;
}

/// A single reported error.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub code: &'static str,
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// A position in the error stream, used to detect new errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// Collects diagnostics for one compilation.
///
/// Diagnostics are appended in source order within a file; each file is
/// processed by a single logical task so no synchronization is needed.
#[derive(Debug, Default)]
pub struct ErrorReporter {
    diagnostics: Vec<Diagnostic>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports an error at the given location.
    pub fn report(&mut self, location: SourceLocation, kind: impl ErrorKind) {
        self.diagnostics.push(Diagnostic {
            code: kind.code(),
            message: kind.to_string(),
            location,
        });
    }

    /// Returns a marker for the current end of the error stream.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.diagnostics.len())
    }

    /// Returns true if any error was reported after the checkpoint was taken.
    pub fn errors_since(&self, checkpoint: Checkpoint) -> bool {
        self.diagnostics.len() > checkpoint.0
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::{Point, SourceLocation};
    use std::sync::Arc;

    struct TestKind;

    impl fmt::Display for TestKind {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "something went wrong")
        }
    }

    impl ErrorKind for TestKind {
        fn code(&self) -> &'static str {
            "TEST_KIND"
        }
    }

    #[test]
    fn test_checkpoint() {
        let mut reporter = ErrorReporter::new();
        let loc = SourceLocation::new(Arc::from("a.sable"), Point::new(1, 1), Point::new(1, 2));

        let before = reporter.checkpoint();
        assert!(!reporter.errors_since(before));

        reporter.report(loc, TestKind);
        assert!(reporter.errors_since(before));
        assert!(!reporter.errors_since(reporter.checkpoint()));

        assert_eq!(reporter.diagnostics()[0].code, "TEST_KIND");
        assert_eq!(reporter.diagnostics()[0].message, "something went wrong");
    }
}
