//! Byte offsets ↔ 1-based line/column conversion.

use std::fmt;

/// Byte range in a source file.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Span { start, end }
    }

    /// Convert a logos byte range. Sources larger than 4 GiB are clamped.
    #[inline]
    pub fn from_range(range: std::ops::Range<usize>) -> Self {
        let clamp = |v: usize| u32::try_from(v).unwrap_or(u32::MAX);
        Span::new(clamp(range.start), clamp(range.end))
    }

    /// Smallest span covering both.
    #[must_use]
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// The same range moved `by` bytes to the right.
    #[must_use]
    pub fn shift(self, by: u32) -> Span {
        Span::new(self.start.saturating_add(by), self.end.saturating_add(by))
    }

    #[inline]
    pub fn contains(self, offset: u32) -> bool {
        self.start <= offset && offset <= self.end
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A character wider than one byte, as stored in a line's table.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct WideChar {
    /// Byte column of the character's first byte.
    start: u32,
    utf8_len: u32,
    utf16_len: u32,
}

impl WideChar {
    /// Bytes beyond what the character counts as in columns.
    fn extra(self) -> u32 {
        self.utf8_len - self.utf16_len
    }
}

/// Line start table for one file.
///
/// Offsets are bytes; columns are UTF-16 code units, the way editors and
/// the playground client count them. Lines holding only ASCII need no
/// extra bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<u32>,
    /// `(line, wide characters in column order)`, for non-ASCII lines only.
    wide_chars: Vec<(u32, Vec<WideChar>)>,
    len: u32,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        let mut wide_chars: Vec<(u32, Vec<WideChar>)> = Vec::new();
        let mut line = 0u32;
        let mut line_start = 0usize;
        for (idx, c) in text.char_indices() {
            if c == '\n' {
                line_starts.push(to_u32(idx + 1));
                line += 1;
                line_start = idx + 1;
                continue;
            }
            if c.is_ascii() {
                continue;
            }
            let wide = WideChar {
                start: to_u32(idx - line_start),
                utf8_len: to_u32(c.len_utf8()),
                utf16_len: to_u32(c.len_utf16()),
            };
            match wide_chars.last_mut() {
                Some((last, chars)) if *last == line => chars.push(wide),
                _ => wide_chars.push((line, vec![wide])),
            }
        }
        LineIndex {
            line_starts,
            wide_chars,
            len: to_u32(text.len()),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    fn wide_chars(&self, line: usize) -> &[WideChar] {
        let line = to_u32(line);
        match self.wide_chars.binary_search_by_key(&line, |(l, _)| *l) {
            Ok(idx) => &self.wide_chars[idx].1,
            Err(_) => &[],
        }
    }

    /// 1-based `(line, column)` of a byte offset. Columns count UTF-16 code
    /// units.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        let bytes = offset - self.line_starts[line];
        let extra: u32 = self
            .wide_chars(line)
            .iter()
            .take_while(|c| c.start < bytes)
            .map(|c| c.extra())
            .sum();
        (to_u32(line) + 1, bytes.saturating_sub(extra) + 1)
    }

    /// Byte offset of a 0-based `(line, column)` cursor, the column in
    /// UTF-16 code units.
    ///
    /// Returns `None` when the line does not exist, the column runs past
    /// the end of the line or splits a surrogate pair. The position just
    /// after the last character is valid.
    pub fn offset(&self, line: usize, column: usize) -> Option<u32> {
        let start = *self.line_starts.get(line)?;
        let end = match self.line_starts.get(line + 1) {
            Some(next) => next - 1,
            None => self.len,
        };
        let column = u32::try_from(column).ok()?;
        let mut extra = 0u32;
        for c in self.wide_chars(line) {
            let char_column = c.start - extra;
            if column <= char_column {
                break;
            }
            if column < char_column + c.utf16_len {
                return None;
            }
            extra += c.extra();
        }
        let offset = start.checked_add(column)?.checked_add(extra)?;
        (offset <= end).then_some(offset)
    }
}

fn to_u32(v: usize) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}
