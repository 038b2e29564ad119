//! Manifest text with a line table and character-offset helpers.
//!
//! Every offset handled here is a character offset, which is what the YAML
//! parser reports in its marks. Byte offsets are only used internally for
//! slicing.

use crate::domain::model::Span;

const BOM: char = '\u{feff}';

/// Zero-based line and column of a character offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineColumn {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    text: String,
    /// Byte index of every char, plus one trailing entry for `text.len()`.
    char_to_byte: Vec<usize>,
    /// Char offset at which each line starts.
    line_starts: Vec<usize>,
}

impl Document {
    /// A leading byte order mark is dropped, so offsets count from the first
    /// char after it.
    pub fn new(text: impl Into<String>) -> Self {
        let mut text = text.into();
        if text.starts_with(BOM) {
            text.remove(0);
        }
        let mut char_to_byte = Vec::with_capacity(text.len() + 1);
        let mut line_starts = vec![0];
        for (index, (byte, ch)) in text.char_indices().enumerate() {
            char_to_byte.push(byte);
            if ch == '\n' {
                line_starts.push(index + 1);
            }
        }
        char_to_byte.push(text.len());
        Self {
            text,
            char_to_byte,
            line_starts,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.char_to_byte.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn char_at(&self, offset: usize) -> Option<char> {
        if offset >= self.len() {
            return None;
        }
        self.text[self.char_to_byte[offset]..].chars().next()
    }

    /// Text covered by `span`, clamped to the document.
    pub fn slice(&self, span: Span) -> &str {
        let start = self.to_byte(span.start);
        let end = self.to_byte(span.end).max(start);
        &self.text[start..end]
    }

    fn to_byte(&self, offset: usize) -> usize {
        self.char_to_byte
            .get(offset)
            .copied()
            .unwrap_or(self.text.len())
    }

    /// Line containing `offset`. The document length itself belongs to the last line.
    pub fn line_of_offset(&self, offset: usize) -> Option<usize> {
        if offset > self.len() {
            return None;
        }
        Some(match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        })
    }

    pub fn line_column(&self, offset: usize) -> Option<LineColumn> {
        let line = self.line_of_offset(offset)?;
        Some(LineColumn {
            line,
            column: offset - self.line_starts[line],
        })
    }

    pub fn offset_of(&self, line: usize, column: usize) -> Option<usize> {
        let region = self.line_region(line)?;
        (column <= region.len()).then_some(region.start + column)
    }

    /// Extent of `line` without its line delimiter.
    pub fn line_region(&self, line: usize) -> Option<Span> {
        let start = *self.line_starts.get(line)?;
        let mut end = self
            .line_starts
            .get(line + 1)
            .map_or(self.len(), |next| next - 1);
        if end > start && self.char_at(end - 1) == Some('\r') {
            end -= 1;
        }
        Some(Span::new(start, end))
    }

    /// Widen a dirty region to whole lines.
    ///
    /// A region inside one line becomes that line. A region spanning several
    /// lines runs from the start of the first line to the last char but one
    /// of the last line. A region reaching outside the document becomes the
    /// whole document.
    pub fn line_aligned(&self, region: Span) -> Span {
        let last = region.start + region.len().saturating_sub(1);
        let lines = self
            .line_of_offset(region.start)
            .zip(self.line_of_offset(last))
            .and_then(|(first, last)| {
                let regions = self.line_region(first).zip(self.line_region(last))?;
                Some((first == last, regions))
            });
        match lines {
            Some((true, (line, _))) => line,
            Some((false, (first, last))) => {
                Span::new(first.start, last.start + last.len().saturating_sub(1))
            }
            None => Span::new(0, self.len()),
        }
    }

    /// Pull a node's raw end mark back over trailing whitespace.
    ///
    /// A mark at the document end, or on a non-whitespace char, is returned
    /// unchanged. Otherwise the result is one past the last non-whitespace
    /// char before the mark.
    pub fn trim_end(&self, end: usize) -> usize {
        let len = self.len();
        if end >= len {
            return len;
        }
        match (0..=end)
            .rev()
            .find(|offset| !self.char_at(*offset).is_some_and(char::is_whitespace))
        {
            Some(offset) if offset == end => end,
            Some(offset) => offset + 1,
            None => 0,
        }
    }

    /// Span of a node with raw marks `[start, end)`, trailing whitespace trimmed.
    pub fn node_span(&self, start: usize, end: usize) -> Span {
        let start = start.min(self.len());
        Span::new(start, self.trim_end(end).max(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_end_pulls_back_to_closing_quote() {
        let doc = Document::new("name: \"foo\"\n\n\n");
        // Raw mark on the third whitespace char after the quote.
        assert_eq!(doc.trim_end(13), 11);
        assert_eq!(doc.slice(doc.node_span(0, 13)), "name: \"foo\"");
    }

    #[test]
    fn trim_end_keeps_mark_at_document_end() {
        let doc = Document::new("name: foo\n\n");
        assert_eq!(doc.trim_end(doc.len()), doc.len());
        assert_eq!(doc.trim_end(doc.len() + 5), doc.len());
    }

    #[test]
    fn trim_end_keeps_mark_on_content() {
        let doc = Document::new("- name: a\n- name: b\n");
        assert_eq!(doc.trim_end(10), 10);
    }

    #[test]
    fn trim_end_of_all_whitespace_prefix_is_zero() {
        let doc = Document::new("   x");
        assert_eq!(doc.trim_end(2), 0);
        assert_eq!(doc.node_span(1, 2), Span::new(1, 1));
    }

    #[test]
    fn offsets_are_counted_in_chars() {
        let doc = Document::new("name: héllo\nnext: 1\n");
        assert_eq!(doc.len(), 20);
        assert_eq!(doc.char_at(7), Some('é'));
        assert_eq!(doc.slice(Span::new(6, 11)), "héllo");
        assert_eq!(
            doc.line_column(14),
            Some(LineColumn { line: 1, column: 2 })
        );
        assert_eq!(doc.offset_of(1, 2), Some(14));
    }

    #[test]
    fn line_aligned_expands_to_whole_lines() {
        let doc = Document::new("one\ntwo\nthree\n");
        assert_eq!(doc.line_aligned(Span::new(5, 6)), Span::new(4, 7));
        // Several lines stop one char short of the end of the last line.
        assert_eq!(doc.line_aligned(Span::new(1, 10)), Span::new(0, 12));
        assert_eq!(doc.line_aligned(Span::new(1, 5)), Span::new(0, 6));
        assert_eq!(doc.line_aligned(Span::new(2, 2)), Span::new(0, 3));
    }

    #[test]
    fn line_aligned_outside_document_is_whole_document() {
        let doc = Document::new("one\ntwo");
        assert_eq!(doc.line_aligned(Span::new(3, 40)), Span::new(0, 7));
    }

    #[test]
    fn leading_byte_order_mark_is_dropped() {
        let doc = Document::new("\u{feff}name: foo\n");
        assert_eq!(doc.text(), "name: foo\n");
        assert_eq!(doc.len(), 10);
        assert_eq!(doc.char_at(0), Some('n'));

        let inner = Document::new("a: \u{feff}\n");
        assert_eq!(inner.len(), 5);
    }

    #[test]
    fn line_region_strips_carriage_return() {
        let doc = Document::new("a: 1\r\nb: 2");
        assert_eq!(doc.line_region(0), Some(Span::new(0, 4)));
        assert_eq!(doc.line_region(1), Some(Span::new(6, 10)));
        assert_eq!(doc.line_region(2), None);
    }
}
