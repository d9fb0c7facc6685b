use serde::{Deserialize, Serialize};

/// Half-open byte interval `[start, end)` into a document's Markdown buffer.
///
/// Spans always land on UTF-8 character boundaries; both detectors guarantee
/// this because `aho_corasick` and `regex` only report boundary-aligned
/// offsets when matching `&str` haystacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start < end, "span must be non-empty");
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Does `self` fully contain `other`?
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Do the two spans share at least one byte?
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The exact byte slice this span covers.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment_and_overlap() {
        let outer = Span::new(10, 20);
        let inner = Span::new(12, 18);
        let disjoint = Span::new(20, 25);
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(outer.overlaps(&inner));
        assert!(!outer.overlaps(&disjoint));
    }

    #[test]
    fn slice_is_byte_exact() {
        let text = "héllo wörld";
        let span = Span::new(0, 6);
        assert_eq!(span.slice(text), "héllo");
    }
}
