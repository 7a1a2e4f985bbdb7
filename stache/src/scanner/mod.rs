//! The text scanner.
//!
//! A character-by-character state machine that recognizes the two
//! dynamically-reconfigurable delimiter pairs, tracks source position, and
//! emits [`TextPart`] events with trim metadata for the parser to consume.

pub(crate) mod trim;

use crate::delimiters::{Delimiters, TRIPLE_END, TRIPLE_START};
use crate::error::{Error, ErrorKind};

/// The kind of tag a [`TextPart`] represents, classified by the scanner from
/// the tag body's leading sigil.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartType {
    StaticText,
    Comment,
    Delimiters,
    Interpolation,
    UnescapedInterpolation,
    Section,
    InvertedSection,
    CloseSection,
    Partial,
    Parent,
    Block,
}

impl PartType {
    /// Everything except plain text and (un)escaped interpolations can be a
    /// standalone line.
    pub fn can_be_standalone(self) -> bool {
        !matches!(
            self,
            PartType::StaticText | PartType::Interpolation | PartType::UnescapedInterpolation
        )
    }
}

/// A single event produced by the scanner: either a run of plain text or the
/// (already sigil-stripped) body of a tag.
#[derive(Debug, Clone, Copy)]
pub struct TextPart<'src> {
    pub content: &'src str,
    pub line: u32,
    pub column: u32,
    pub part_type: PartType,
    pub left_trim_at: Option<usize>,
    pub right_trim_at: Option<usize>,
    /// Byte offset of the start of this part within the scanner's source.
    /// The parser diffs these to recover a section's verbatim inner text for
    /// lambda re-rendering; not part of the element model.
    pub(crate) src_offset: usize,
}

pub(crate) struct Scanner<'src> {
    source: &'src str,
    pos: usize,
    line: u32,
    column: u32,
    delimiters: Delimiters,
    /// A tag boundary found while scanning the preceding static-text run, to
    /// be scanned as a tag on the very next call. Keeping this means every
    /// static-text part (even an empty one) is always immediately followed
    /// by the tag it precedes, so the parser can always look one part ahead.
    pending_tag: Option<(usize, bool)>,
    done: bool,
}

impl<'src> Scanner<'src> {
    pub(crate) fn new(source: &'src str) -> Self {
        Scanner {
            source,
            pos: 0,
            line: 1,
            column: 1,
            delimiters: Delimiters::default(),
            pending_tag: None,
            done: false,
        }
    }

    /// Validates and installs a new delimiter pair. Must be called at least
    /// once (the default pair counts) before the first `next`.
    pub(crate) fn set_delimiters(&mut self, delimiters: Delimiters) {
        self.delimiters = delimiters;
    }

    pub(crate) fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    fn advance_to(&mut self, new_pos: usize) {
        for &byte in self.source.as_bytes()[self.pos..new_pos].iter() {
            if byte == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.pos = new_pos;
    }

    /// Finds the next tag opening at or after `self.pos`, preferring the
    /// triple-mustache marker over the regular one when both match.
    fn find_open(&self) -> Option<(usize, bool)> {
        let haystack = self.source.as_bytes();
        let start = self.delimiters.start().as_bytes();

        for i in self.pos..haystack.len() {
            if haystack[i..].starts_with(TRIPLE_START.as_bytes()) {
                return Some((i, true));
            }
            if haystack[i..].starts_with(start) {
                return Some((i, false));
            }
        }

        None
    }

    fn classify(
        raw: &'src str,
        triple: bool,
        line: u32,
        column: u32,
    ) -> Result<(PartType, &'src str), Error> {
        if triple {
            return Ok((PartType::UnescapedInterpolation, raw));
        }

        let bytes = raw.as_bytes();
        let sigil_idx = bytes.iter().position(|b| !b.is_ascii_whitespace());

        let sigil_idx = match sigil_idx {
            Some(idx) => idx,
            None => return Ok((PartType::Interpolation, raw)),
        };

        let part_type = match bytes[sigil_idx] {
            b'!' => PartType::Comment,
            b'#' => PartType::Section,
            b'^' => PartType::InvertedSection,
            b'/' => PartType::CloseSection,
            b'>' => PartType::Partial,
            b'<' => PartType::Parent,
            b'$' => PartType::Block,
            b'&' => PartType::UnescapedInterpolation,
            b'=' => PartType::Delimiters,
            _ => return Ok((PartType::Interpolation, raw)),
        };

        let after_sigil = &raw[sigil_idx + 1..];

        if part_type == PartType::Delimiters {
            let trimmed = after_sigil.trim();
            match trimmed.strip_suffix('=') {
                Some(inner) => Ok((part_type, inner.trim())),
                None => Err(Error::parse(ErrorKind::InvalidDelimiters, line, column)),
            }
        } else {
            Ok((part_type, after_sigil))
        }
    }

    /// Advances the scanner and returns the next part, or `None` once the end
    /// of input has been fully consumed.
    pub(crate) fn next(&mut self) -> Result<Option<TextPart<'src>>, Error> {
        if self.done {
            return Ok(None);
        }

        if let Some((tag_start, triple)) = self.pending_tag.take() {
            return self.scan_tag(tag_start, triple);
        }

        let run_start = self.pos;
        let (start_line, start_col) = (self.line, self.column);

        match self.find_open() {
            None => {
                self.done = true;
                let content = &self.source[run_start..];
                self.advance_to(self.source.len());
                Ok(Some(TextPart {
                    content,
                    line: start_line,
                    column: start_col,
                    part_type: PartType::StaticText,
                    left_trim_at: trim::left_trim_at(content),
                    right_trim_at: trim::right_trim_at(content),
                    src_offset: run_start,
                }))
            }
            Some((tag_start, triple)) => {
                let content = &self.source[run_start..tag_start];
                self.advance_to(tag_start);
                self.pending_tag = Some((tag_start, triple));
                Ok(Some(TextPart {
                    content,
                    line: start_line,
                    column: start_col,
                    part_type: PartType::StaticText,
                    left_trim_at: trim::left_trim_at(content),
                    right_trim_at: trim::right_trim_at(content),
                    src_offset: run_start,
                }))
            }
        }
    }

    fn scan_tag(&mut self, tag_start: usize, triple: bool) -> Result<Option<TextPart<'src>>, Error> {
        debug_assert_eq!(self.pos, tag_start);

        let (open_marker, close_marker) = if triple {
            (TRIPLE_START, TRIPLE_END)
        } else {
            (self.delimiters.start(), self.delimiters.end())
        };

        let tag_line = self.line;
        let tag_col = self.column;

        let body_start = tag_start + open_marker.len();
        let close_idx = self.source[body_start..]
            .find(close_marker)
            .map(|idx| body_start + idx);

        let close_idx = match close_idx {
            Some(idx) => idx,
            None => {
                self.advance_to(self.source.len());
                self.done = true;
                return Err(Error::parse(ErrorKind::UnexpectedEof, tag_line, tag_col));
            }
        };

        let raw = &self.source[body_start..close_idx];
        let next_pos = close_idx + close_marker.len();

        let (part_type, content) = Self::classify(raw, triple, tag_line, tag_col)?;

        self.advance_to(next_pos);

        Ok(Some(TextPart {
            content,
            line: tag_line,
            column: tag_col,
            part_type,
            left_trim_at: None,
            right_trim_at: None,
            src_offset: tag_start,
        }))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn collect(source: &str) -> Vec<(PartType, String)> {
        let mut scanner = Scanner::new(source);
        let mut out = Vec::new();
        while let Some(part) = scanner.next().unwrap() {
            out.push((part.part_type, part.content.to_string()));
        }
        out
    }

    #[test]
    fn plain_text_only() {
        assert_eq!(
            collect("hello"),
            vec![(PartType::StaticText, "hello".into())]
        );
    }

    #[test]
    fn interpolation() {
        assert_eq!(
            collect("Hi {{name}}!"),
            vec![
                (PartType::StaticText, "Hi ".into()),
                (PartType::Interpolation, "name".into()),
                (PartType::StaticText, "!".into()),
            ]
        );
    }

    #[test]
    fn triple_preferred_over_regular() {
        assert_eq!(
            collect("{{{raw}}}"),
            vec![
                (PartType::StaticText, "".into()),
                (PartType::UnescapedInterpolation, "raw".into()),
                (PartType::StaticText, "".into()),
            ]
        );
    }

    #[test]
    fn sigils_are_stripped() {
        assert_eq!(
            collect("{{#a}}{{/a}}{{^b}}{{!c}}{{>d}}{{<e}}{{$f}}{{&g}}"),
            vec![
                (PartType::StaticText, "".into()),
                (PartType::Section, "a".into()),
                (PartType::StaticText, "".into()),
                (PartType::CloseSection, "a".into()),
                (PartType::StaticText, "".into()),
                (PartType::InvertedSection, "b".into()),
                (PartType::StaticText, "".into()),
                (PartType::Comment, "c".into()),
                (PartType::StaticText, "".into()),
                (PartType::Partial, "d".into()),
                (PartType::StaticText, "".into()),
                (PartType::Parent, "e".into()),
                (PartType::StaticText, "".into()),
                (PartType::Block, "f".into()),
                (PartType::StaticText, "".into()),
                (PartType::UnescapedInterpolation, "g".into()),
                (PartType::StaticText, "".into()),
            ]
        );
    }

    #[test]
    fn reports_position_at_tag_open() {
        let mut scanner = Scanner::new("hello{{/section}}");
        let text = scanner.next().unwrap().unwrap();
        assert_eq!((text.line, text.column), (1, 1));
        let tag = scanner.next().unwrap().unwrap();
        assert_eq!((tag.line, tag.column), (1, 6));
    }

    #[test]
    fn unclosed_tag_is_eof() {
        let mut scanner = Scanner::new("hello {{name");
        scanner.next().unwrap(); // static text
        let err = scanner.next().unwrap_err();
        assert!(matches!(
            err,
            Error::Parse {
                kind: ErrorKind::UnexpectedEof,
                ..
            }
        ));
    }

    #[test]
    fn delimiter_tag_requires_trailing_equals() {
        let mut scanner = Scanner::new("{{=<% %>}}");
        scanner.next().unwrap(); // leading (empty) static text
        let err = scanner.next().unwrap_err();
        assert!(matches!(
            err,
            Error::Parse {
                kind: ErrorKind::InvalidDelimiters,
                ..
            }
        ));
    }

    #[test]
    fn delimiter_tag_strips_markers() {
        assert_eq!(
            collect("{{=<% %>=}}"),
            vec![
                (PartType::StaticText, "".into()),
                (PartType::Delimiters, "<% %>".into()),
                (PartType::StaticText, "".into()),
            ]
        );
    }
}
