//! The delimiter model.
//!
//! A template carries a pair of regular delimiters (`{{` / `}}` by default)
//! that can be redefined at any point via a `{{=new_start new_end=}}` tag.
//! The triple-mustache pair `{{{` / `}}}` is fixed and always recognized for
//! unescaped interpolation, regardless of the regular pair currently active.

use crate::error::{Error, ErrorKind};

pub(crate) const TRIPLE_START: &str = "{{{";
pub(crate) const TRIPLE_END: &str = "}}}";

/// A pair of opening/closing tag markers in effect at some point in the
/// source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    start: Box<str>,
    end: Box<str>,
}

impl Delimiters {
    /// Build a new delimiter pair: neither may be empty, neither may contain
    /// the other, and they must differ.
    pub fn new(start: &str, end: &str) -> Result<Self, Error> {
        if start.is_empty() {
            return Err(Error::parse(ErrorKind::StartingDelimiterMismatch, 0, 0));
        }
        if end.is_empty() {
            return Err(Error::parse(ErrorKind::EndingDelimiterMismatch, 0, 0));
        }
        if start == end {
            return Err(Error::parse(ErrorKind::InvalidDelimiters, 0, 0));
        }
        if start.contains(end) || end.contains(start) {
            return Err(Error::parse(ErrorKind::InvalidDelimiters, 0, 0));
        }

        Ok(Delimiters {
            start: start.into(),
            end: end.into(),
        })
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }

    /// Lookahead window needed to recognize either the regular or the
    /// triple-mustache opening marker at a given position.
    pub(crate) fn max_open_len(&self) -> usize {
        self.start.len().max(TRIPLE_START.len())
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Delimiters {
            start: "{{".into(),
            end: "}}".into(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_equal_delimiters() {
        assert!(Delimiters::new("<%", "<%").is_err());
    }

    #[test]
    fn rejects_empty() {
        assert!(Delimiters::new("", "}}").is_err());
        assert!(Delimiters::new("{{", "").is_err());
    }

    #[test]
    fn rejects_containment() {
        assert!(Delimiters::new("<", "<%").is_err());
        assert!(Delimiters::new("<%", "%").is_err());
    }

    #[test]
    fn defaults_to_mustaches() {
        let d = Delimiters::default();
        assert_eq!(d.start(), "{{");
        assert_eq!(d.end(), "}}");
    }
}
