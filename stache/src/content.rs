//! The context resolver and native invoker.
//!
//! [`Content`] is a value carrying, conceptually, a small table of
//! operations (`is_truthy`, `render_escaped`/`render_unescaped`,
//! `get_field`/`render_field_*`) rather than a fixed struct of fields. It is
//! object-safe (`&dyn Content`) so the renderer's context stack
//! (`render::Stack`) can hold an arbitrary number of ancestor frames, and so
//! its path-resolution walk is not bounded to any fixed depth.
//!
//! Field-render methods take the active [`Stack`] even though most
//! implementors ignore it: lambda adapters need the current context to
//! re-render their returned template text against.

use crate::encoding::Encoder;
use crate::error::Error;
use crate::path::Segment;
use crate::render::{RenderContext, Section, Stack};

/// Data accessible to templates. Implement this directly for adapters that
/// don't fit the derive macro (e.g. a hand-written lookup), or derive it
/// with `#[derive(Content)]` for ordinary structs.
///
/// Every method has a default that behaves as "not present" or "falsy", so
/// implementors only need to override what applies to them — exactly as the
/// fields on a `#[derive(Content)]` struct only override `get_field` and the
/// field render methods for the names they declare.
pub trait Content {
    /// Whether this value is truthy for the purposes of rendering a section
    /// or its inverse. Defaults to `true`; only `()`, `bool`, numbers,
    /// strings, `Option`, and collections override it.
    #[inline]
    fn is_truthy(&self) -> bool {
        true
    }

    /// How much output capacity this value is likely to need, used to
    /// pre-size the output buffer. Purely an optimization hint.
    #[inline]
    fn capacity_hint(&self) -> usize {
        0
    }

    /// Renders `self` as an interpolated variable, HTML-escaping the usual
    /// five characters. `stack` is the context active at the call site,
    /// needed only by lambda adapters that re-render their returned string
    /// as a template; ordinary values ignore it.
    #[inline]
    fn render_escaped<'stack>(
        &'stack self,
        _stack: &Stack<'stack>,
        _encoder: &mut dyn Encoder,
    ) -> Result<(), Error> {
        Ok(())
    }

    /// Renders `self` as an interpolated variable without escaping.
    #[inline]
    fn render_unescaped<'stack>(
        &'stack self,
        stack: &Stack<'stack>,
        encoder: &mut dyn Encoder,
    ) -> Result<(), Error> {
        self.render_escaped(stack, encoder)
    }

    /// Renders a `{{#section}}` with `self` pushed onto the context stack,
    /// once if truthy and not at all otherwise. Collections override this to
    /// iterate, pushing each item in turn.
    #[inline]
    fn render_section<'stack>(
        &'stack self,
        section: Section<'_, 'stack>,
        stack: &Stack<'stack>,
        encoder: &mut dyn Encoder,
    ) -> Result<(), Error> {
        if self.is_truthy() {
            section.render(stack.push(self), encoder)
        } else {
            Ok(())
        }
    }

    /// Renders a `{{^section}}` — the complement of [`Content::render_section`].
    #[inline]
    fn render_inverse<'stack>(
        &'stack self,
        section: Section<'_, 'stack>,
        stack: &Stack<'stack>,
        encoder: &mut dyn Encoder,
    ) -> Result<(), Error> {
        if !self.is_truthy() {
            section.render(stack.clone(), encoder)
        } else {
            Ok(())
        }
    }

    /// Looks up a direct field by name, for path segments beyond the first
    /// (which never fall back to a parent frame). Structs generated by
    /// `#[derive(Content)]` override this to match on `segment`.
    #[inline]
    fn get_field(&self, _segment: Segment<'_>) -> Option<&dyn Content> {
        None
    }

    /// The special `len` segment on a sequence-like value.
    #[inline]
    fn get_len(&self) -> Option<usize> {
        None
    }

    /// Renders a named field as an escaped variable. Returns whether the
    /// field was found at all (distinguishing "found but empty" from
    /// "not found", which matters for parent-frame fallback on the first
    /// path segment).
    #[inline]
    fn render_field_escaped<'stack>(
        &'stack self,
        _segment: Segment<'_>,
        _stack: &Stack<'stack>,
        _encoder: &mut dyn Encoder,
    ) -> Result<bool, Error> {
        Ok(false)
    }

    /// Renders a named field as an unescaped variable. See
    /// [`Content::render_field_escaped`].
    #[inline]
    fn render_field_unescaped<'stack>(
        &'stack self,
        _segment: Segment<'_>,
        _stack: &Stack<'stack>,
        _encoder: &mut dyn Encoder,
    ) -> Result<bool, Error> {
        Ok(false)
    }

    /// Renders a named field as a section.
    #[inline]
    fn render_field_section<'stack>(
        &'stack self,
        _segment: Segment<'_>,
        _section: Section<'_, 'stack>,
        _stack: &Stack<'stack>,
        _encoder: &mut dyn Encoder,
    ) -> Result<bool, Error> {
        Ok(false)
    }

    /// Renders a named field as an inverted section.
    #[inline]
    fn render_field_inverse<'stack>(
        &'stack self,
        _segment: Segment<'_>,
        _section: Section<'_, 'stack>,
        _stack: &Stack<'stack>,
        _encoder: &mut dyn Encoder,
    ) -> Result<bool, Error> {
        Ok(false)
    }
}

impl Content for () {
    #[inline]
    fn is_truthy(&self) -> bool {
        false
    }
}

impl Content for str {
    #[inline]
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }

    #[inline]
    fn capacity_hint(&self) -> usize {
        self.len()
    }

    #[inline]
    fn render_escaped<'stack>(
        &'stack self,
        _stack: &Stack<'stack>,
        encoder: &mut dyn Encoder,
    ) -> Result<(), Error> {
        encoder.write_escaped(self)
    }

    #[inline]
    fn render_unescaped<'stack>(
        &'stack self,
        _stack: &Stack<'stack>,
        encoder: &mut dyn Encoder,
    ) -> Result<(), Error> {
        encoder.write_unescaped(self)
    }
}

impl Content for String {
    #[inline]
    fn is_truthy(&self) -> bool {
        self.as_str().is_truthy()
    }

    #[inline]
    fn capacity_hint(&self) -> usize {
        self.len()
    }

    #[inline]
    fn render_escaped<'stack>(
        &'stack self,
        stack: &Stack<'stack>,
        encoder: &mut dyn Encoder,
    ) -> Result<(), Error> {
        self.as_str().render_escaped(stack, encoder)
    }

    #[inline]
    fn render_unescaped<'stack>(
        &'stack self,
        stack: &Stack<'stack>,
        encoder: &mut dyn Encoder,
    ) -> Result<(), Error> {
        self.as_str().render_unescaped(stack, encoder)
    }
}

impl Content for bool {
    #[inline]
    fn is_truthy(&self) -> bool {
        *self
    }

    #[inline]
    fn capacity_hint(&self) -> usize {
        5
    }

    #[inline]
    fn render_escaped<'stack>(
        &'stack self,
        _stack: &Stack<'stack>,
        encoder: &mut dyn Encoder,
    ) -> Result<(), Error> {
        encoder.write_unescaped(if *self { "true" } else { "false" })
    }
}

macro_rules! impl_number_types {
    ($( $ty:ty ),*) => {
        $(
            impl Content for $ty {
                #[inline]
                fn is_truthy(&self) -> bool {
                    *self != 0 as $ty
                }

                #[inline]
                fn capacity_hint(&self) -> usize {
                    5
                }

                #[inline]
                fn render_escaped<'stack>(
                    &'stack self,
                    _stack: &Stack<'stack>,
                    encoder: &mut dyn Encoder,
                ) -> Result<(), Error> {
                    encoder.write_fmt_unescaped(format_args!("{}", self))
                }
            }
        )*
    }
}

impl_number_types!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

macro_rules! impl_float_types {
    ($( $ty:ty ),*) => {
        $(
            impl Content for $ty {
                #[inline]
                fn is_truthy(&self) -> bool {
                    // Floats shouldn't be directly compared to 0.
                    self.abs() > <$ty>::EPSILON
                }

                #[inline]
                fn capacity_hint(&self) -> usize {
                    5
                }

                #[inline]
                fn render_escaped<'stack>(
                    &'stack self,
                    _stack: &Stack<'stack>,
                    encoder: &mut dyn Encoder,
                ) -> Result<(), Error> {
                    encoder.write_fmt_unescaped(format_args!("{}", self))
                }
            }
        )*
    }
}

impl_float_types!(f32, f64);

impl<T: Content> Content for Option<T> {
    #[inline]
    fn is_truthy(&self) -> bool {
        self.as_ref().is_some_and(Content::is_truthy)
    }

    #[inline]
    fn capacity_hint(&self) -> usize {
        self.as_ref().map_or(0, Content::capacity_hint)
    }

    #[inline]
    fn render_escaped<'stack>(
        &'stack self,
        stack: &Stack<'stack>,
        encoder: &mut dyn Encoder,
    ) -> Result<(), Error> {
        match self {
            Some(inner) => inner.render_escaped(stack, encoder),
            None => Ok(()),
        }
    }

    #[inline]
    fn render_unescaped<'stack>(
        &'stack self,
        stack: &Stack<'stack>,
        encoder: &mut dyn Encoder,
    ) -> Result<(), Error> {
        match self {
            Some(inner) => inner.render_unescaped(stack, encoder),
            None => Ok(()),
        }
    }

    #[inline]
    fn render_section<'stack>(
        &'stack self,
        section: Section<'_, 'stack>,
        stack: &Stack<'stack>,
        encoder: &mut dyn Encoder,
    ) -> Result<(), Error> {
        match self {
            Some(inner) => inner.render_section(section, stack, encoder),
            None => Ok(()),
        }
    }
}

fn render_sequence_section<'stack, T: Content>(
    items: &'stack [T],
    section: Section<'_, 'stack>,
    stack: &Stack<'stack>,
    encoder: &mut dyn Encoder,
) -> Result<(), Error> {
    for item in items {
        section.clone().render(stack.push(item), encoder)?;
    }
    Ok(())
}

impl<T: Content> Content for Vec<T> {
    #[inline]
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }

    #[inline]
    fn get_len(&self) -> Option<usize> {
        Some(self.len())
    }

    #[inline]
    fn render_section<'stack>(
        &'stack self,
        section: Section<'_, 'stack>,
        stack: &Stack<'stack>,
        encoder: &mut dyn Encoder,
    ) -> Result<(), Error> {
        render_sequence_section(self.as_slice(), section, stack, encoder)
    }
}

impl<T: Content> Content for [T] {
    #[inline]
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }

    #[inline]
    fn get_len(&self) -> Option<usize> {
        Some(self.len())
    }

    #[inline]
    fn render_section<'stack>(
        &'stack self,
        section: Section<'_, 'stack>,
        stack: &Stack<'stack>,
        encoder: &mut dyn Encoder,
    ) -> Result<(), Error> {
        render_sequence_section(self, section, stack, encoder)
    }
}

impl<T: Content, const N: usize> Content for [T; N] {
    #[inline]
    fn is_truthy(&self) -> bool {
        N != 0
    }

    #[inline]
    fn get_len(&self) -> Option<usize> {
        Some(N)
    }

    #[inline]
    fn render_section<'stack>(
        &'stack self,
        section: Section<'_, 'stack>,
        stack: &Stack<'stack>,
        encoder: &mut dyn Encoder,
    ) -> Result<(), Error> {
        render_sequence_section(self.as_slice(), section, stack, encoder)
    }
}

fn render_map_section<'stack, V: Content>(
    lookup: impl Fn(&str) -> Option<&'stack V>,
    segment: Segment<'_>,
    section: Section<'_, 'stack>,
    stack: &Stack<'stack>,
    encoder: &mut dyn Encoder,
) -> Result<bool, Error> {
    match lookup(segment.name) {
        Some(v) => v.render_section(section, stack, encoder).map(|_| true),
        None => Ok(false),
    }
}

impl<K, V, S> Content for std::collections::HashMap<K, V, S>
where
    K: std::borrow::Borrow<str> + std::hash::Hash + Eq,
    V: Content,
    S: std::hash::BuildHasher,
{
    #[inline]
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }

    #[inline]
    fn get_field(&self, segment: Segment<'_>) -> Option<&dyn Content> {
        self.get(segment.name).map(|v| v as &dyn Content)
    }

    #[inline]
    fn render_field_escaped<'stack>(
        &'stack self,
        segment: Segment<'_>,
        stack: &Stack<'stack>,
        encoder: &mut dyn Encoder,
    ) -> Result<bool, Error> {
        match self.get(segment.name) {
            Some(v) => v.render_escaped(stack, encoder).map(|_| true),
            None => Ok(false),
        }
    }

    #[inline]
    fn render_field_unescaped<'stack>(
        &'stack self,
        segment: Segment<'_>,
        stack: &Stack<'stack>,
        encoder: &mut dyn Encoder,
    ) -> Result<bool, Error> {
        match self.get(segment.name) {
            Some(v) => v.render_unescaped(stack, encoder).map(|_| true),
            None => Ok(false),
        }
    }

    #[inline]
    fn render_field_section<'stack>(
        &'stack self,
        segment: Segment<'_>,
        section: Section<'_, 'stack>,
        stack: &Stack<'stack>,
        encoder: &mut dyn Encoder,
    ) -> Result<bool, Error> {
        render_map_section(|k| self.get(k), segment, section, stack, encoder)
    }
}

impl<K, V> Content for std::collections::BTreeMap<K, V>
where
    K: std::borrow::Borrow<str> + Ord,
    V: Content,
{
    #[inline]
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }

    #[inline]
    fn get_field(&self, segment: Segment<'_>) -> Option<&dyn Content> {
        self.get(segment.name).map(|v| v as &dyn Content)
    }

    #[inline]
    fn render_field_escaped<'stack>(
        &'stack self,
        segment: Segment<'_>,
        stack: &Stack<'stack>,
        encoder: &mut dyn Encoder,
    ) -> Result<bool, Error> {
        match self.get(segment.name) {
            Some(v) => v.render_escaped(stack, encoder).map(|_| true),
            None => Ok(false),
        }
    }

    #[inline]
    fn render_field_unescaped<'stack>(
        &'stack self,
        segment: Segment<'_>,
        stack: &Stack<'stack>,
        encoder: &mut dyn Encoder,
    ) -> Result<bool, Error> {
        match self.get(segment.name) {
            Some(v) => v.render_unescaped(stack, encoder).map(|_| true),
            None => Ok(false),
        }
    }

    #[inline]
    fn render_field_section<'stack>(
        &'stack self,
        segment: Segment<'_>,
        section: Section<'_, 'stack>,
        stack: &Stack<'stack>,
        encoder: &mut dyn Encoder,
    ) -> Result<bool, Error> {
        render_map_section(|k| self.get(k), segment, section, stack, encoder)
    }
}

macro_rules! impl_pointer_types {
    ($( $ty:ident ),*) => {
        $(
            impl<T: Content + ?Sized> Content for std::$ty<T> {
                #[inline]
                fn is_truthy(&self) -> bool {
                    (**self).is_truthy()
                }

                #[inline]
                fn capacity_hint(&self) -> usize {
                    (**self).capacity_hint()
                }

                #[inline]
                fn render_escaped<'stack>(
                    &'stack self,
                    stack: &Stack<'stack>,
                    encoder: &mut dyn Encoder,
                ) -> Result<(), Error> {
                    (**self).render_escaped(stack, encoder)
                }

                #[inline]
                fn render_unescaped<'stack>(
                    &'stack self,
                    stack: &Stack<'stack>,
                    encoder: &mut dyn Encoder,
                ) -> Result<(), Error> {
                    (**self).render_unescaped(stack, encoder)
                }

                #[inline]
                fn get_field(&self, segment: Segment<'_>) -> Option<&dyn Content> {
                    (**self).get_field(segment)
                }

                #[inline]
                fn get_len(&self) -> Option<usize> {
                    (**self).get_len()
                }

                #[inline]
                fn render_field_escaped<'stack>(
                    &'stack self,
                    segment: Segment<'_>,
                    stack: &Stack<'stack>,
                    encoder: &mut dyn Encoder,
                ) -> Result<bool, Error> {
                    (**self).render_field_escaped(segment, stack, encoder)
                }

                #[inline]
                fn render_field_unescaped<'stack>(
                    &'stack self,
                    segment: Segment<'_>,
                    stack: &Stack<'stack>,
                    encoder: &mut dyn Encoder,
                ) -> Result<bool, Error> {
                    (**self).render_field_unescaped(segment, stack, encoder)
                }
            }
        )*
    }
}

impl_pointer_types!(boxed, rc, sync);

impl<T: Content + ?Sized> Content for &T {
    #[inline]
    fn is_truthy(&self) -> bool {
        (**self).is_truthy()
    }

    #[inline]
    fn capacity_hint(&self) -> usize {
        (**self).capacity_hint()
    }

    #[inline]
    fn render_escaped<'stack>(
        &'stack self,
        stack: &Stack<'stack>,
        encoder: &mut dyn Encoder,
    ) -> Result<(), Error> {
        (**self).render_escaped(stack, encoder)
    }

    #[inline]
    fn render_unescaped<'stack>(
        &'stack self,
        stack: &Stack<'stack>,
        encoder: &mut dyn Encoder,
    ) -> Result<(), Error> {
        (**self).render_unescaped(stack, encoder)
    }

    #[inline]
    fn get_field(&self, segment: Segment<'_>) -> Option<&dyn Content> {
        (**self).get_field(segment)
    }
}
