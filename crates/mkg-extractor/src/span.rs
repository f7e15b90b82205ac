//! Character-offset spans
//!
//! Offsets count `char`s, not bytes, so distances between cues and numerals
//! are measured the same way regardless of how many bytes a CJK character
//! occupies.

/// Half-open `[start, end)` range of char offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// `other` lies entirely within `self`
    pub fn covers(&self, other: &Span) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// The two spans share at least one char without either covering the other
    pub fn crosses(&self, other: &Span) -> bool {
        let overlap = self.start < other.end && other.start < self.end;
        overlap && !self.covers(other) && !other.covers(self)
    }
}

/// Convert a byte range of `text` to char offsets
pub(crate) fn char_span(text: &str, byte_start: usize, byte_end: usize) -> Span {
    let start = text[..byte_start].chars().count();
    let len = text[byte_start..byte_end].chars().count();
    Span::new(start, start + len)
}

/// Non-overlapping left-to-right occurrences of a literal
pub(crate) fn find_literal(text: &str, pattern: &str) -> Vec<Span> {
    if pattern.is_empty() {
        return Vec::new();
    }
    text.match_indices(pattern)
        .map(|(at, m)| char_span(text, at, at + m.len()))
        .collect()
}
