//! Position-tracked view over a decoded text buffer.
//!
//! Every parser in this crate walks one of these instead of carrying parser
//! state in struct fields. Positions are byte offsets into the buffer; all
//! structural characters in git's output grammars are ASCII, so the skip
//! widths used by the parsers always land on character boundaries.

use serde::Serialize;

/// Which line ending terminated a line of output. Recorded so lines copied
/// back out (diff contents, blame contents) reproduce their original ending
/// exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineEnding {
    Lf,
    CrLf,
    /// Final line of a buffer with no terminator.
    None,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
            LineEnding::None => "",
        }
    }

    /// Byte width of the terminator.
    pub fn len(&self) -> usize {
        self.as_str().len()
    }

    pub fn is_none(&self) -> bool {
        matches!(self, LineEnding::None)
    }
}

/// Where the current line's content stops and how it is terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEnd {
    /// Absolute position one past the last content byte.
    pub content_end: usize,
    pub ending: LineEnding,
}

#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a str) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Everything from the current position to the end of the buffer.
    pub fn remaining(&self) -> &'a str {
        &self.buf[self.pos..]
    }

    pub fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    pub fn read_char(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Advance by `n` bytes, clamped to the end of the buffer.
    pub fn skip(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.buf.len());
        debug_assert!(self.buf.is_char_boundary(self.pos));
    }

    pub fn starts_with(&self, literal: &str) -> bool {
        self.remaining().starts_with(literal)
    }

    /// Peek-and-consume: advance past `literal` only if it is next.
    pub fn skip_if_matches(&mut self, literal: &str) -> bool {
        if self.starts_with(literal) {
            self.pos += literal.len();
            true
        } else {
            false
        }
    }

    /// Absolute position of the next occurrence of `literal`.
    pub fn find_str(&self, literal: &str) -> Option<usize> {
        self.remaining().find(literal).map(|i| self.pos + i)
    }

    pub fn find_char(&self, c: char) -> Option<usize> {
        self.remaining().find(c).map(|i| self.pos + i)
    }

    /// Locate the end of the current line. `\r\n` is distinguished from a
    /// bare `\n` by inspecting the byte immediately preceding the `\n`; a
    /// buffer ending without a terminator reports `LineEnding::None`.
    pub fn find_line_end(&self) -> LineEnd {
        match self.find_char('\n') {
            Some(nl) => {
                if nl > self.pos && self.buf.as_bytes()[nl - 1] == b'\r' {
                    LineEnd {
                        content_end: nl - 1,
                        ending: LineEnding::CrLf,
                    }
                } else {
                    LineEnd {
                        content_end: nl,
                        ending: LineEnding::Lf,
                    }
                }
            }
            None => LineEnd {
                content_end: self.buf.len(),
                ending: LineEnding::None,
            },
        }
    }

    /// True at end of buffer or when the next bytes are a line terminator.
    pub fn is_at_line_end(&self) -> bool {
        self.is_at_end() || self.starts_with("\n") || self.starts_with("\r\n")
    }

    /// Read up to the absolute position `end`, then skip `trailing_skip`
    /// additional bytes (typically the delimiter that `end` points at).
    pub fn read_up_to(&mut self, end: usize, trailing_skip: usize) -> &'a str {
        debug_assert!(end >= self.pos && end <= self.buf.len());
        let text = &self.buf[self.pos..end];
        self.pos = (end + trailing_skip).min(self.buf.len());
        text
    }

    /// Read the rest of the current line and consume its terminator.
    /// Returns the content and which ending was consumed.
    pub fn read_line(&mut self) -> (&'a str, LineEnding) {
        let LineEnd {
            content_end,
            ending,
        } = self.find_line_end();
        let text = self.read_up_to(content_end, ending.len());
        (text, ending)
    }

    /// Save the position for speculative lookahead.
    pub fn save(&self) -> usize {
        self.pos
    }

    pub fn restore(&mut self, saved: usize) {
        debug_assert!(saved <= self.buf.len());
        self.pos = saved;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_line_distinguishes_endings() {
        let mut cur = Cursor::new("one\ntwo\r\nthree");
        assert_eq!(cur.read_line(), ("one", LineEnding::Lf));
        assert_eq!(cur.read_line(), ("two", LineEnding::CrLf));
        assert_eq!(cur.read_line(), ("three", LineEnding::None));
        assert!(cur.is_at_end());
    }

    #[test]
    fn skip_if_matches_consumes_only_on_match() {
        let mut cur = Cursor::new("diff --git a/x b/x");
        assert!(!cur.skip_if_matches("index"));
        assert_eq!(cur.position(), 0);
        assert!(cur.skip_if_matches("diff --git "));
        assert_eq!(cur.remaining(), "a/x b/x");
    }

    #[test]
    fn find_is_absolute() {
        let mut cur = Cursor::new("abc:def:ghi");
        cur.skip(4);
        assert_eq!(cur.find_char(':'), Some(7));
        assert_eq!(cur.find_str("ghi"), Some(8));
        assert_eq!(cur.find_char('!'), None);
    }

    #[test]
    fn read_up_to_with_trailing_skip() {
        let mut cur = Cursor::new("40charsXrest");
        let end = cur.find_char('X').unwrap();
        assert_eq!(cur.read_up_to(end, 1), "40chars");
        assert_eq!(cur.remaining(), "rest");
    }

    #[test]
    fn save_restore_roundtrip() {
        let mut cur = Cursor::new("abcdef");
        cur.skip(2);
        let saved = cur.save();
        cur.skip(3);
        assert_eq!(cur.remaining(), "f");
        cur.restore(saved);
        assert_eq!(cur.remaining(), "cdef");
    }

    #[test]
    fn line_end_at_empty_line() {
        let cur = Cursor::new("");
        assert!(cur.is_at_line_end());
        assert_eq!(
            cur.find_line_end(),
            LineEnd {
                content_end: 0,
                ending: LineEnding::None
            }
        );
    }
}
