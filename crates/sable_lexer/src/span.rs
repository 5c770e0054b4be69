//! Source location tracking for error messages and AST nodes.

use std::fmt;
use std::sync::Arc;

/// A line/column position in a source file.
///
/// Both coordinates are 1-based. Points are totally ordered within a file,
/// first by line and then by column.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Point {
    pub line: u32,
    pub column: u32,
}

impl Point {
    /// The position of a node that was synthesized rather than parsed.
    pub const UNKNOWN: Point = Point { line: 0, column: 0 };

    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Returns true if this point refers to a real source position.
    pub fn is_known(&self) -> bool {
        self.line > 0
    }

    /// Returns a copy of this point shifted by `delta` columns.
    pub fn offset_column(&self, delta: i32) -> Point {
        Point {
            line: self.line,
            column: self.column.saturating_add_signed(delta),
        }
    }

    /// Creates a single-point location in the given file.
    pub fn as_location(&self, file: &Arc<str>) -> SourceLocation {
        SourceLocation {
            file: Arc::clone(file),
            begin: *self,
            end: *self,
        }
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A span of source text, identified by a file and a pair of inclusive
/// [`Point`]s.
///
/// Locations are immutable and cheap to clone (the file name is shared).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file: Arc<str>,
    pub begin: Point,
    pub end: Point,
}

impl SourceLocation {
    pub fn new(file: Arc<str>, begin: Point, end: Point) -> Self {
        debug_assert!(!begin.is_known() || begin <= end, "begin must be <= end");
        Self { file, begin, end }
    }

    /// A location for nodes with no source counterpart.
    pub fn unknown(file: Arc<str>) -> Self {
        Self {
            file,
            begin: Point::UNKNOWN,
            end: Point::UNKNOWN,
        }
    }

    /// Returns true if this location refers to a real span of text.
    pub fn is_known(&self) -> bool {
        self.begin.is_known()
    }

    /// Returns the smallest location covering both `self` and `other`.
    pub fn extend(&self, other: &SourceLocation) -> SourceLocation {
        if !self.is_known() {
            return other.clone();
        }
        if !other.is_known() {
            return self.clone();
        }
        SourceLocation {
            file: Arc::clone(&self.file),
            begin: self.begin.min(other.begin),
            end: self.end.max(other.end),
        }
    }

    /// The location of just the first point of this span.
    pub fn begin_location(&self) -> SourceLocation {
        self.begin.as_location(&self.file)
    }

    /// The location of just the last point of this span.
    pub fn end_location(&self) -> SourceLocation {
        self.end.as_location(&self.file)
    }

    /// Returns a copy with the begin column shifted by `delta`.
    pub fn offset_start_col(&self, delta: i32) -> SourceLocation {
        SourceLocation {
            file: Arc::clone(&self.file),
            begin: self.begin.offset_column(delta),
            end: self.end,
        }
    }

    /// Maps a point expressed relative to the start of this location (line 1,
    /// column 1 is the first character) into an absolute point.
    ///
    /// Expression text handed to the parser is located by the span of the
    /// surrounding command; token positions are lexed relative to that text
    /// and rebased here.
    pub fn resolve_relative(&self, relative: Point) -> Point {
        if !self.is_known() {
            return Point::UNKNOWN;
        }
        if relative.line == 1 {
            Point {
                line: self.begin.line,
                column: self.begin.column + relative.column - 1,
            }
        } else {
            Point {
                line: self.begin.line + relative.line - 1,
                column: relative.column,
            }
        }
    }

    /// Rebases a relative begin/end pair (see [`resolve_relative`]) into a
    /// full location in this file.
    ///
    /// [`resolve_relative`]: SourceLocation::resolve_relative
    pub fn resolve_span(&self, begin: Point, end: Point) -> SourceLocation {
        SourceLocation {
            file: Arc::clone(&self.file),
            begin: self.resolve_relative(begin),
            end: self.resolve_relative(end),
        }
    }
}

impl fmt::Debug for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}-{}:{}",
            self.file, self.begin.line, self.begin.column, self.end.line, self.end.column
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> Arc<str> {
        Arc::from("test.sable")
    }

    #[test]
    fn test_point_ordering() {
        assert!(Point::new(1, 9) < Point::new(2, 1));
        assert!(Point::new(3, 4) < Point::new(3, 5));
    }

    #[test]
    fn test_extend() {
        let f = file();
        let a = SourceLocation::new(Arc::clone(&f), Point::new(1, 5), Point::new(1, 9));
        let b = SourceLocation::new(Arc::clone(&f), Point::new(2, 1), Point::new(2, 3));
        let joined = a.extend(&b);
        assert_eq!(joined.begin, Point::new(1, 5));
        assert_eq!(joined.end, Point::new(2, 3));
    }

    #[test]
    fn test_extend_unknown() {
        let f = file();
        let a = SourceLocation::unknown(Arc::clone(&f));
        let b = SourceLocation::new(Arc::clone(&f), Point::new(4, 1), Point::new(4, 2));
        assert_eq!(a.extend(&b), b);
        assert_eq!(b.extend(&a), b);
    }

    #[test]
    fn test_resolve_relative() {
        let f = file();
        // the expression starts at line 7, column 12
        let base = SourceLocation::new(Arc::clone(&f), Point::new(7, 12), Point::new(7, 40));
        assert_eq!(base.resolve_relative(Point::new(1, 1)), Point::new(7, 12));
        assert_eq!(base.resolve_relative(Point::new(1, 5)), Point::new(7, 16));
        // a token on a later relative line keeps its own column
        assert_eq!(base.resolve_relative(Point::new(2, 3)), Point::new(8, 3));
    }
}
