//! Source spans.

use std::fmt;

/// A byte-offset range into the original source text. Every EIR node and
/// token carries one so that parse and type-resolution errors can point
/// back at source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Inclusive start byte offset.
    pub start: u32,
    /// Exclusive end byte offset.
    pub end: u32,
}

impl Span {
    /// Build a span from a `(start, end)` byte-offset pair.
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// A zero-width span at offset 0, used for synthesized nodes that have
    /// no corresponding source text (e.g. lowering's inserted `update()`
    /// call in `modify(t){...}`).
    pub fn synthetic() -> Self {
        Self { start: 0, end: 0 }
    }

    /// The smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Maps byte offsets to 1-based `(line, column)` pairs. Built once per
/// source string and reused for every diagnostic that needs to resolve a
/// span, so repeated lookups (one per parse error) don't rescan the text.
pub struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    /// Build a line index over `source`.
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (offset, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset as u32 + 1);
            }
        }
        Self { line_starts }
    }

    /// Resolve a byte offset to a 1-based `(line, column)` pair.
    pub fn line_column(&self, offset: u32) -> (u32, u32) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let column = offset - self.line_starts[line];
        (line as u32 + 1, column + 1)
    }
}
