//! The element model: the typed, flattened, pre-order output of the parser.

use beef::lean::Cow;

use crate::delimiters::Delimiters;
use crate::path::Path;

/// A section's metadata: its dotted path, how many subsequent elements make
/// up its body, the verbatim inner text (captured only when lambda support
/// is enabled, for re-parsing inside a lambda invocation) and the delimiter
/// pair that was active when the section tag was opened (also needed to
/// re-parse a lambda's returned string under the right delimiters).
#[derive(Debug, Clone)]
pub struct SectionMeta<'tpl> {
    pub path: Path<'tpl>,
    pub children: usize,
    pub inner_text: Option<Cow<'tpl, str>>,
    pub delimiters: Delimiters,
}

/// A single node in the flat, pre-order element sequence produced by the
/// parser. Section-like variants do not materialize a closing element; the
/// `children` count on each gives the length of the contiguous suffix that
/// makes up its body.
#[derive(Debug, Clone)]
pub enum Element<'tpl> {
    StaticText(Cow<'tpl, str>),
    Interpolation(Path<'tpl>),
    UnescapedInterpolation(Path<'tpl>),
    Section(SectionMeta<'tpl>),
    InvertedSection { path: Path<'tpl>, children: usize },
    Partial {
        key: Cow<'tpl, str>,
        indentation: Option<Cow<'tpl, str>>,
    },
    Parent {
        key: Cow<'tpl, str>,
        children: usize,
        indentation: Option<Cow<'tpl, str>>,
    },
    Block { key: Cow<'tpl, str>, children: usize },
}

impl<'tpl> Element<'tpl> {
    /// The number of subsequent elements in the flat sequence that belong to
    /// this element's scope (0 for anything that isn't section-like).
    pub fn children(&self) -> usize {
        match self {
            Element::Section(meta) => meta.children,
            Element::InvertedSection { children, .. } => *children,
            Element::Parent { children, .. } => *children,
            Element::Block { children, .. } => *children,
            _ => 0,
        }
    }
}
