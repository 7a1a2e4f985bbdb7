//! Dotted path names, e.g. `a.b.c`, split into segments at parse time and
//! carried on [`crate::element::Element`] for the renderer to walk.
//!
//! Each segment keeps a precomputed FNV hash alongside its text, so native
//! `Content` dispatch can match on the hash first, falling back to the
//! string only to rule out a collision.
//!
//! Segments are stored inline (no heap allocation) for the common case of
//! shallow paths; deeper paths spill onto the heap.

use std::fmt;
use std::hash::Hasher;

use arrayvec::ArrayVec;
use fnv::FnvHasher;

/// Paths up to this many segments are stored without allocating.
const INLINE_SEGMENTS: usize = 4;

#[inline]
pub(crate) fn hash_segment(name: &str) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(name.as_bytes());
    hasher.finish()
}

/// One dotted-path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub name: &'a str,
    pub hash: u64,
}

impl<'a> Segment<'a> {
    pub fn new(name: &'a str) -> Self {
        Segment {
            name,
            hash: hash_segment(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segments<'a> {
    Inline(ArrayVec<Segment<'a>, INLINE_SEGMENTS>),
    Spilled(Vec<Segment<'a>>),
}

/// An ordered sequence of name parts. The implicit iterator `.` is
/// represented as an empty path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path<'a> {
    segments: Segments<'a>,
}

impl<'a> Default for Path<'a> {
    fn default() -> Self {
        Path {
            segments: Segments::Inline(ArrayVec::new()),
        }
    }
}

impl<'a> Path<'a> {
    /// Parses an identifier into a dotted path. `.` alone yields the empty
    /// (implicit-iterator) path.
    pub fn parse(identifier: &'a str) -> Self {
        if identifier == "." {
            return Path::default();
        }

        let mut inline = ArrayVec::<Segment<'a>, INLINE_SEGMENTS>::new();
        let mut iter = identifier.split('.').map(Segment::new);

        for seg in iter.by_ref() {
            if inline.try_push(seg).is_err() {
                // Ran out of inline capacity: spill the rest onto the heap.
                let mut spilled: Vec<Segment<'a>> = inline.into_iter().collect();
                spilled.push(seg);
                spilled.extend(iter);
                return Path {
                    segments: Segments::Spilled(spilled),
                };
            }
        }

        Path {
            segments: Segments::Inline(inline),
        }
    }

    pub fn is_implicit(&self) -> bool {
        self.segments().is_empty()
    }

    pub fn segments(&self) -> &[Segment<'a>] {
        match &self.segments {
            Segments::Inline(v) => v.as_slice(),
            Segments::Spilled(v) => v.as_slice(),
        }
    }

    pub fn first(&self) -> Option<Segment<'a>> {
        self.segments().first().copied()
    }

    pub fn rest(&self) -> &[Segment<'a>] {
        self.segments().get(1..).unwrap_or(&[])
    }
}

impl<'a> fmt::Display for Path<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_implicit() {
            return f.write_str(".");
        }
        for (idx, seg) in self.segments().iter().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            f.write_str(seg.name)?;
        }
        Ok(())
    }
}
