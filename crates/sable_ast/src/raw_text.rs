//! Raw template text with a mapping back to source positions.
//!
//! The outer parser joins adjacent text and strips whitespace around line
//! breaks, so a raw-text node's string is not contiguous in the source. An
//! anchor table records the source point at the start of each contiguous
//! segment; positions between anchors advance column by column. Anchors
//! also remember where whitespace was removed, which the HTML rewriter
//! needs to terminate unquoted attribute values.

use sable_lexer::{Point, SourceLocation};
use std::sync::Arc;

/// One contiguous segment boundary in a raw-text string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Anchor {
    /// Byte index into the text where the segment starts.
    index: usize,
    /// Source point of the character at `index`.
    point: Point,
    /// True if whitespace was stripped immediately before `index`.
    joined: bool,
}

/// The index-to-point mapping for a raw-text node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceOffsets {
    /// Sorted by index; the first anchor is at index 0. A trailing anchor at
    /// `text.len()` records whitespace joined after the last character.
    anchors: Vec<Anchor>,
}

/// A run of literal template text.
#[derive(Clone, Debug, PartialEq)]
pub struct RawText {
    text: String,
    location: SourceLocation,
    offsets: SourceOffsets,
}

impl RawText {
    /// Creates a raw-text node for contiguous text starting at `begin`.
    ///
    /// The text must not span stripped whitespace; use [`RawTextBuilder`]
    /// for joined text.
    pub fn contiguous(file: Arc<str>, begin: Point, text: impl Into<String>) -> Self {
        let mut builder = RawTextBuilder::new(file, begin);
        builder.push_text(&text.into());
        builder.build()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// The source point of the character at the given byte index.
    pub fn point_at(&self, index: usize) -> Point {
        debug_assert!(index < self.text.len(), "index {index} out of bounds");
        let anchor = self.anchor_before(index);
        advance_columns(anchor.point, &self.text[anchor.index..index])
    }

    /// The location of the single character at the given byte index.
    pub fn location_at(&self, index: usize) -> SourceLocation {
        self.point_at(index).as_location(&self.location.file)
    }

    /// The location spanning the characters in `[start, end)`.
    pub fn substring_location(&self, start: usize, end: usize) -> SourceLocation {
        debug_assert!(start < end && end <= self.text.len());
        let last = last_char_boundary(&self.text, start, end);
        SourceLocation::new(
            Arc::clone(&self.location.file),
            self.point_at(start),
            self.point_at(last),
        )
    }

    /// Returns true if whitespace was stripped immediately before `index`.
    ///
    /// `index` may equal `len()`, reporting whitespace joined after the last
    /// character.
    pub fn missing_whitespace_at(&self, index: usize) -> bool {
        self.offsets
            .anchors
            .iter()
            .any(|a| a.index == index && a.joined)
    }

    /// Extracts `[start, end)` as a new raw-text node with remapped anchors.
    pub fn substring(&self, start: usize, end: usize) -> RawText {
        debug_assert!(start < end && end <= self.text.len());
        let text = self.text[start..end].to_string();
        let mut anchors = vec![Anchor {
            index: 0,
            point: self.point_at(start),
            joined: self.missing_whitespace_at(start),
        }];
        for anchor in &self.offsets.anchors {
            if anchor.index > start && anchor.index <= end {
                anchors.push(Anchor {
                    index: anchor.index - start,
                    point: anchor.point,
                    joined: anchor.joined,
                });
            }
        }
        RawText {
            location: self.substring_location(start, end),
            text,
            offsets: SourceOffsets { anchors },
        }
    }

    fn anchor_before(&self, index: usize) -> Anchor {
        let pos = self
            .offsets
            .anchors
            .partition_point(|a| a.index <= index);
        debug_assert!(pos > 0, "no anchor at or before {index}");
        self.offsets.anchors[pos - 1]
    }
}

/// Advances `point` over `text`, one column per char and resetting at
/// newlines.
fn advance_columns(point: Point, text: &str) -> Point {
    let mut line = point.line;
    let mut column = point.column;
    for c in text.chars() {
        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    Point::new(line, column)
}

/// The largest char boundary in `[start, end)`.
fn last_char_boundary(text: &str, start: usize, end: usize) -> usize {
    let mut last = start;
    for (offset, _) in text[start..end].char_indices() {
        last = start + offset;
    }
    last
}

/// Assembles a [`RawText`] from contiguous segments, recording the points
/// where the outer parser stripped whitespace.
pub struct RawTextBuilder {
    file: Arc<str>,
    text: String,
    anchors: Vec<Anchor>,
    next_point: Point,
}

impl RawTextBuilder {
    pub fn new(file: Arc<str>, begin: Point) -> Self {
        Self {
            file,
            text: String::new(),
            anchors: vec![Anchor { index: 0, point: begin, joined: false }],
            next_point: begin,
        }
    }

    /// Appends contiguous text, tracking line/column advancement.
    pub fn push_text(&mut self, text: &str) -> &mut Self {
        self.text.push_str(text);
        self.next_point = advance_columns(self.next_point, text);
        self
    }

    /// Records that whitespace was stripped here; subsequent text resumes at
    /// `resume`.
    pub fn mark_joined(&mut self, resume: Point) -> &mut Self {
        let index = self.text.len();
        // replace a zero-width anchor left by a previous call at this index
        self.anchors.retain(|a| a.index != index || index == 0);
        if index == 0 {
            if let Some(first) = self.anchors.first_mut() {
                first.point = resume;
                first.joined = true;
            }
        } else {
            self.anchors.push(Anchor { index, point: resume, joined: true });
        }
        self.next_point = resume;
        self
    }

    pub fn build(self) -> RawText {
        debug_assert!(!self.text.is_empty(), "raw text must be non-empty");
        let end = {
            let last = last_char_boundary(&self.text, 0, self.text.len());
            let raw = RawText {
                text: self.text.clone(),
                location: SourceLocation::unknown(Arc::clone(&self.file)),
                offsets: SourceOffsets { anchors: self.anchors.clone() },
            };
            raw.point_at(last)
        };
        let begin = self.anchors[0].point;
        RawText {
            location: SourceLocation::new(self.file, begin, end),
            text: self.text,
            offsets: SourceOffsets { anchors: self.anchors },
        }
    }
}
