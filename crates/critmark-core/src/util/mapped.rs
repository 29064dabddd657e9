//! Derived text views that remember where every byte came from.
//!
//! Searching a folded, whitespace-collapsed or markup-stripped copy of a
//! buffer is easy; reporting the hit as an offset into the original buffer is
//! not. A [`MappedText`] carries, for each byte of the view, the byte range of
//! the source character it was produced from, and each transformation composes
//! those ranges.

use super::fold::push_folded;
use icu::casemap::CaseMapper;
use memchr::memmem;
use std::ops::Range;

#[derive(Debug, Clone)]
pub struct MappedText {
    text: String,
    /// Source range for every byte of `text`.
    spans: Vec<(usize, usize)>,
    source_len: usize,
}

impl MappedText {
    /// Identity view of `source`.
    pub fn new(source: &str) -> Self {
        let mut spans = Vec::with_capacity(source.len());
        for (i, c) in source.char_indices() {
            let end = i + c.len_utf8();
            spans.extend(std::iter::repeat((i, end)).take(c.len_utf8()));
        }
        Self {
            text: source.to_string(),
            spans,
            source_len: source.len(),
        }
    }

    fn derived(&self) -> Self {
        Self {
            text: String::with_capacity(self.text.len()),
            spans: Vec::with_capacity(self.spans.len()),
            source_len: self.source_len,
        }
    }

    fn push(&mut self, piece: &str, span: (usize, usize)) {
        self.text.push_str(piece);
        self.spans
            .extend(std::iter::repeat(span).take(piece.len()));
    }

    fn char_span(&self, view_start: usize, len: usize) -> (usize, usize) {
        (self.spans[view_start].0, self.spans[view_start + len - 1].1)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Source offset of view byte `view`; the view end maps to the source end.
    pub fn source_offset(&self, view: usize) -> usize {
        self.spans
            .get(view)
            .map(|s| s.0)
            .unwrap_or(self.source_len)
    }

    /// Source range covered by the view range.
    pub fn source_range(&self, view: Range<usize>) -> Range<usize> {
        if view.start >= view.end || view.start >= self.spans.len() {
            let at = self.source_offset(view.start);
            return at..at;
        }
        let last = view.end.min(self.spans.len()) - 1;
        self.spans[view.start].0..self.spans[last].1
    }

    /// Case-folded view.
    pub fn fold(&self) -> Self {
        let mapper = CaseMapper::new();
        let mut out = self.derived();
        let mut piece = String::new();
        for (i, c) in self.text.char_indices() {
            piece.clear();
            push_folded(c, &mapper, &mut piece);
            let span = self.char_span(i, c.len_utf8());
            out.push(&piece, span);
        }
        out
    }

    /// View with every whitespace run replaced by one space.
    pub fn collapse_whitespace(&self) -> Self {
        let mut out = self.derived();
        let mut run: Option<(usize, usize)> = None;
        for (i, c) in self.text.char_indices() {
            let span = self.char_span(i, c.len_utf8());
            if c.is_whitespace() {
                run = Some(match run {
                    Some((start, _)) => (start, span.1),
                    None => span,
                });
                continue;
            }
            if let Some(ws) = run.take() {
                out.push(" ", ws);
            }
            let mut buf = [0u8; 4];
            out.push(c.encode_utf8(&mut buf), span);
        }
        if let Some(ws) = run {
            out.push(" ", ws);
        }
        out
    }

    /// View with the given view ranges removed. Ranges must be sorted and
    /// fall on character boundaries.
    pub fn without(&self, ranges: &[Range<usize>]) -> Self {
        let mut out = self.derived();
        let mut cursor = 0;
        for range in ranges {
            if range.start > cursor {
                out.copy_from(self, cursor..range.start);
            }
            cursor = cursor.max(range.end);
        }
        if cursor < self.text.len() {
            out.copy_from(self, cursor..self.text.len());
        }
        out
    }

    fn copy_from(&mut self, other: &Self, range: Range<usize>) {
        self.text.push_str(&other.text[range.clone()]);
        self.spans.extend_from_slice(&other.spans[range]);
    }

    /// Every non-overlapping occurrence of `needle` in the view, as source ranges.
    pub fn find_all(&self, needle: &str) -> Vec<Range<usize>> {
        if needle.is_empty() {
            return Vec::new();
        }
        memmem::find_iter(self.text.as_bytes(), needle.as_bytes())
            .map(|at| self.source_range(at..at + needle.len()))
            .collect()
    }
}
