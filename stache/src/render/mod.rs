//! The renderer.
//!
//! Drives a flat, pre-order [`Element`] array against a [`Stack`] of
//! [`Content`] frames: walk the array by index, write static text verbatim,
//! dispatch variable/section tags to the context, and skip a section's body
//! in one jump using its precomputed child count. Dispatch happens through
//! `dyn Content`, so this is generic only over lifetimes, and indexes
//! `[Element]` by `Element::children()`.

mod context_stack;

pub use context_stack::{RenderContext, Stack};

use std::collections::HashMap;
use std::marker::PhantomData;

use crate::content::Content;
use crate::delimiters::Delimiters;
use crate::element::Element;
use crate::encoding::Encoder;
use crate::error::Error;
use crate::options::{ContextMissPolicy, PartialMissPolicy};
use crate::path::{Path, Segment};

/// Block-name overrides collected from a `{{<parent}}...{{/parent}}` call
/// site, consulted while rendering the parent's own body. Scoped to that one
/// body: a `{{>partial}}` or nested `{{<parent}}` encountered while applying
/// overrides starts fresh. An override naming a block the parent doesn't
/// have is simply never consulted — a no-op, not an error.
type Overrides<'tpl> = HashMap<&'tpl str, &'tpl [Element<'tpl>]>;

/// A section's body, handed to [`Content::render_section`] /
/// [`Content::render_inverse`] so collection adapters can render it once per
/// item without knowing anything about the element model.
#[derive(Clone)]
pub struct Section<'tpl, 'r> {
    body: &'tpl [Element<'tpl>],
    inner_text: &'tpl str,
    delimiters: Delimiters,
    _stack: PhantomData<&'r ()>,
}

impl<'tpl, 'r> Section<'tpl, 'r> {
    fn new(body: &'tpl [Element<'tpl>], inner_text: &'tpl str, delimiters: Delimiters) -> Self {
        Section {
            body,
            inner_text,
            delimiters,
            _stack: PhantomData,
        }
    }

    /// Renders this section's body once against `stack`.
    pub fn render(self, stack: Stack<'r>, encoder: &mut dyn Encoder) -> Result<(), Error> {
        render_body(self.body, &stack, None, encoder)
    }

    /// The section's verbatim, unrendered source text — empty unless the
    /// template was parsed with lambdas enabled.
    pub fn inner_text(&self) -> &'tpl str {
        self.inner_text
    }

    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }
}

fn context_miss(path: &Path<'_>, ctx: &RenderContext<'_>) -> Result<(), Error> {
    match ctx.options.context_misses {
        ContextMissPolicy::Empty => Ok(()),
        ContextMissPolicy::Fail => {
            #[cfg(feature = "diagnostics")]
            tracing::warn!(target: "stache::render", path = %path, "context miss treated as fatal");

            Err(Error::ContextMiss(path.to_string().into_boxed_str()))
        }
    }
}

fn partials_disabled(ctx: &RenderContext<'_>) -> Result<(), Error> {
    match ctx.options.partial_misses {
        PartialMissPolicy::Empty => Ok(()),
        PartialMissPolicy::Fail => {
            #[cfg(feature = "diagnostics")]
            tracing::warn!(target: "stache::render", "partial rendered with no partials map supplied");

            Err(Error::PartialsDisabled)
        }
    }
}

fn partial_not_found(key: &str, ctx: &RenderContext<'_>) -> Result<(), Error> {
    match ctx.options.partial_misses {
        PartialMissPolicy::Empty => Ok(()),
        PartialMissPolicy::Fail => {
            #[cfg(feature = "diagnostics")]
            tracing::warn!(target: "stache::render", key, "partial not found in partials map");

            Err(Error::PartialNotFound(key.into()))
        }
    }
}

fn write_content<'r>(
    content: &'r dyn Content,
    stack: &Stack<'r>,
    escape: bool,
    encoder: &mut dyn Encoder,
) -> Result<(), Error> {
    if escape {
        content.render_escaped(stack, encoder)
    } else {
        content.render_unescaped(stack, encoder)
    }
}

enum Terminal<'r> {
    Content(&'r dyn Content),
    Len(usize),
}

fn resolve_terminal<'r>(owner: &'r dyn Content, seg: Segment<'_>) -> Option<Terminal<'r>> {
    if seg.name == "len" {
        if let Some(n) = owner.get_len() {
            return Some(Terminal::Len(n));
        }
    }
    owner.get_field(seg).map(Terminal::Content)
}

/// Resolves and renders an interpolation tag: the first path segment retries
/// on each ancestor frame up to the stack root; every later segment resolves
/// only against the previous step's result, with no fallback.
fn render_variable<'r>(
    path: &Path<'_>,
    stack: &Stack<'r>,
    escape: bool,
    encoder: &mut dyn Encoder,
) -> Result<(), Error> {
    if path.is_implicit() {
        return write_content(stack.head(), stack, escape, encoder);
    }

    let segments = path.segments();
    let first = segments[0];
    let rest = &segments[1..];

    let mut current: Option<&'r dyn Content> = None;

    for frame in stack.frames() {
        if rest.is_empty() {
            let found = if escape {
                frame.render_field_escaped(first, stack, encoder)?
            } else {
                frame.render_field_unescaped(first, stack, encoder)?
            };
            if found {
                return Ok(());
            }
        }
        if let Some(next) = frame.get_field(first) {
            current = Some(next);
            break;
        }
    }

    let Some(mut current) = current else {
        return context_miss(path, stack.ctx());
    };

    if rest.is_empty() {
        return write_content(current, stack, escape, encoder);
    }

    let (last, middle) = rest.split_last().expect("rest is non-empty");
    for seg in middle {
        match current.get_field(*seg) {
            Some(next) => current = next,
            None => return context_miss(path, stack.ctx()),
        }
    }

    match resolve_terminal(current, *last) {
        Some(Terminal::Content(c)) => write_content(c, stack, escape, encoder),
        Some(Terminal::Len(n)) => {
            if escape {
                encoder.write_fmt_escaped(format_args!("{}", n))
            } else {
                encoder.write_fmt_unescaped(format_args!("{}", n))
            }
        }
        None => context_miss(path, stack.ctx()),
    }
}

/// Resolves and renders a `{{#section}}` or `{{^section}}` tag.
fn render_section_like<'tpl, 'r>(
    path: &Path<'tpl>,
    body: &'tpl [Element<'tpl>],
    inner_text: &'tpl str,
    delimiters: Delimiters,
    stack: &Stack<'r>,
    inverted: bool,
    encoder: &mut dyn Encoder,
) -> Result<(), Error> {
    let section = Section::new(body, inner_text, delimiters);

    if path.is_implicit() {
        let head = stack.head();
        return if inverted {
            head.render_inverse(section, stack, encoder)
        } else {
            head.render_section(section, stack, encoder)
        };
    }

    let segments = path.segments();
    let first = segments[0];
    let rest = &segments[1..];

    let render_absent = |stack: &Stack<'r>, encoder: &mut dyn Encoder| {
        if inverted {
            section.render(stack.clone(), encoder)
        } else {
            Ok(())
        }
    };

    if rest.is_empty() {
        for frame in stack.frames() {
            let found = if inverted {
                frame.render_field_inverse(first, section, stack, encoder)?
            } else {
                frame.render_field_section(first, section, stack, encoder)?
            };
            if found {
                return Ok(());
            }
            if let Some(next) = frame.get_field(first) {
                return if inverted {
                    next.render_inverse(section, stack, encoder)
                } else {
                    next.render_section(section, stack, encoder)
                };
            }
        }
        return render_absent(stack, encoder);
    }

    let mut current: Option<&'r dyn Content> = None;
    for frame in stack.frames() {
        if let Some(next) = frame.get_field(first) {
            current = Some(next);
            break;
        }
    }
    let Some(mut current) = current else {
        return render_absent(stack, encoder);
    };

    let (last, middle) = rest.split_last().expect("rest is non-empty");
    for seg in middle {
        match current.get_field(*seg) {
            Some(next) => current = next,
            None => return render_absent(stack, encoder),
        }
    }

    match current.get_field(*last) {
        Some(target) => {
            if inverted {
                target.render_inverse(section, stack, encoder)
            } else {
                target.render_section(section, stack, encoder)
            }
        }
        None => render_absent(stack, encoder),
    }
}

/// An [`Encoder`] that prepends a captured indentation string after every
/// newline it writes (and before its first byte of output), per-line
/// reindenting a standalone partial tag's output. Tracks line-start state
/// across multiple write calls so a partial's elements, each written
/// independently, still reindent consistently.
struct IndentingEncoder<'e> {
    inner: &'e mut dyn Encoder,
    indent: &'e str,
    at_line_start: bool,
}

impl<'e> IndentingEncoder<'e> {
    fn new(inner: &'e mut dyn Encoder, indent: &'e str) -> Self {
        IndentingEncoder {
            inner,
            indent,
            at_line_start: true,
        }
    }

    fn write_lines(&mut self, part: &str, escaped: bool) -> Result<(), Error> {
        let mut rest = part;

        while !rest.is_empty() {
            if self.at_line_start {
                self.inner.write_unescaped(self.indent)?;
                self.at_line_start = false;
            }

            match rest.find('\n') {
                Some(idx) => {
                    let (line, remainder) = rest.split_at(idx + 1);
                    if escaped {
                        self.inner.write_escaped(line)?;
                    } else {
                        self.inner.write_unescaped(line)?;
                    }
                    self.at_line_start = true;
                    rest = remainder;
                }
                None => {
                    if escaped {
                        self.inner.write_escaped(rest)?;
                    } else {
                        self.inner.write_unescaped(rest)?;
                    }
                    rest = "";
                }
            }
        }

        Ok(())
    }
}

impl<'e> Encoder for IndentingEncoder<'e> {
    fn write_unescaped(&mut self, part: &str) -> Result<(), Error> {
        self.write_lines(part, false)
    }

    fn write_escaped(&mut self, part: &str) -> Result<(), Error> {
        self.write_lines(part, true)
    }
}

fn collect_blocks<'tpl>(elements: &'tpl [Element<'tpl>], out: &mut Overrides<'tpl>) {
    let mut i = 0;
    while i < elements.len() {
        let count = elements[i].children();
        if let Element::Block { key, .. } = &elements[i] {
            out.insert(key.as_ref(), &elements[i + 1..i + 1 + count]);
        }
        i += 1 + count;
    }
}

fn render_partial<'r>(
    key: &str,
    indent: Option<&str>,
    stack: &Stack<'r>,
    encoder: &mut dyn Encoder,
) -> Result<(), Error> {
    // Unknown partials, and partials used where none were supplied, render
    // as empty unless `render.partial_misses` is configured to fail.
    let Some(partials) = stack.ctx().partials else {
        return partials_disabled(stack.ctx());
    };
    let Some(body) = partials.get(key) else {
        return partial_not_found(key, stack.ctx());
    };

    match indent {
        Some(ind) if !ind.is_empty() => {
            let mut indenting = IndentingEncoder::new(encoder, ind);
            render_body(body, stack, None, &mut indenting)
        }
        _ => render_body(body, stack, None, encoder),
    }
}

fn render_parent<'tpl, 'r>(
    key: &str,
    overrides: &Overrides<'tpl>,
    indent: Option<&str>,
    stack: &Stack<'r>,
    encoder: &mut dyn Encoder,
) -> Result<(), Error> {
    let Some(partials) = stack.ctx().partials else {
        return partials_disabled(stack.ctx());
    };
    let Some(body) = partials.get(key) else {
        return partial_not_found(key, stack.ctx());
    };

    match indent {
        Some(ind) if !ind.is_empty() => {
            let mut indenting = IndentingEncoder::new(encoder, ind);
            render_body(body, stack, Some(overrides), &mut indenting)
        }
        _ => render_body(body, stack, Some(overrides), encoder),
    }
}

/// The main driver loop: walks a flat element array by index, dispatching
/// each element and skipping straight past a section-like element's body
/// using its `children()` count.
pub(crate) fn render_body<'tpl, 'r>(
    elements: &'tpl [Element<'tpl>],
    stack: &Stack<'r>,
    overrides: Option<&Overrides<'tpl>>,
    encoder: &mut dyn Encoder,
) -> Result<(), Error> {
    let mut i = 0;

    while i < elements.len() {
        match &elements[i] {
            Element::StaticText(text) => {
                encoder.write_unescaped(text)?;
                i += 1;
            }
            Element::Interpolation(path) => {
                render_variable(path, stack, true, encoder)?;
                i += 1;
            }
            Element::UnescapedInterpolation(path) => {
                render_variable(path, stack, false, encoder)?;
                i += 1;
            }
            Element::Section(meta) => {
                let body = &elements[i + 1..i + 1 + meta.children];
                let inner_text = meta.inner_text.as_deref().unwrap_or("");
                render_section_like(
                    &meta.path,
                    body,
                    inner_text,
                    meta.delimiters.clone(),
                    stack,
                    false,
                    encoder,
                )?;
                i += 1 + meta.children;
            }
            Element::InvertedSection { path, children } => {
                let body = &elements[i + 1..i + 1 + children];
                render_section_like(path, body, "", Delimiters::default(), stack, true, encoder)?;
                i += 1 + children;
            }
            Element::Partial { key, indentation } => {
                render_partial(key, indentation.as_deref(), stack, encoder)?;
                i += 1;
            }
            Element::Parent {
                key,
                children,
                indentation,
            } => {
                let override_body = &elements[i + 1..i + 1 + children];
                let mut overrides = Overrides::new();
                collect_blocks(override_body, &mut overrides);
                render_parent(key, &overrides, indentation.as_deref(), stack, encoder)?;
                i += 1 + children;
            }
            Element::Block { key, children } => {
                let default_body = &elements[i + 1..i + 1 + children];
                let body = overrides
                    .and_then(|o| o.get(key.as_ref()).copied())
                    .unwrap_or(default_body);
                render_body(body, stack, overrides, encoder)?;
                i += 1 + children;
            }
        }
    }

    Ok(())
}

/// Renders `elements` against `root`, the public entry point used by
/// [`crate::template::Template::render`].
pub(crate) fn render<'tpl, 'r>(
    elements: &'tpl [Element<'tpl>],
    root: &'r dyn Content,
    ctx: &'r RenderContext<'r>,
    encoder: &mut dyn Encoder,
) -> Result<(), Error> {
    #[cfg(feature = "diagnostics")]
    tracing::debug!(target: "stache::render", elements = elements.len(), "rendering template");

    let stack = Stack::root(ctx, root);
    let result = render_body(elements, &stack, None, encoder);

    #[cfg(feature = "diagnostics")]
    if let Err(err) = &result {
        tracing::warn!(target: "stache::render", %err, "render failed");
    }

    result
}

/// Re-parses a lambda's buffered output as a template under `delimiters`
/// and renders it against `stack`, writing the result escaped or not to
/// match the call site. Gated by the configured `max_recursion`: once the
/// current nesting has reached it, renders nothing rather than erroring.
pub(crate) fn render_lambda_output<'r>(
    output: &str,
    delimiters: &Delimiters,
    stack: &Stack<'r>,
    escape: bool,
    encoder: &mut dyn Encoder,
) -> Result<(), Error> {
    let ctx = stack.ctx();

    if ctx.lambda_depth.get() >= ctx.max_recursion {
        #[cfg(feature = "diagnostics")]
        tracing::warn!(target: "stache::render", depth = ctx.lambda_depth.get(), max = ctx.max_recursion, "lambda recursion limit reached, discarding output");

        return Ok(());
    }

    ctx.lambda_depth.set(ctx.lambda_depth.get() + 1);
    let rendered = render_lambda_inner(output, delimiters, stack, &ctx.parser_options);
    ctx.lambda_depth.set(ctx.lambda_depth.get() - 1);

    let rendered = rendered?;

    if escape {
        encoder.write_escaped(&rendered)
    } else {
        encoder.write_unescaped(&rendered)
    }
}

fn render_lambda_inner<'r>(
    output: &str,
    delimiters: &Delimiters,
    stack: &Stack<'r>,
    parser_options: &crate::options::ParserOptions,
) -> Result<String, Error> {
    let elements = crate::parser::parse_with_delimiters(output, parser_options, delimiters.clone())?;
    let mut rendered = String::new();
    render_body(&elements, stack, None, &mut rendered)?;
    Ok(rendered)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::options::{ParserOptions, RenderOptions};
    use crate::partials::Partials;

    fn render(source: &str, render_options: RenderOptions, partials: Option<&Partials<'_>>) -> Result<String, Error> {
        let elements = crate::parser::parse(source, &ParserOptions::default())?;
        let ctx = RenderContext::new(partials, render_options, ParserOptions::default());
        let mut out = String::new();
        super::render(&elements, &(), &ctx, &mut out)?;
        Ok(out)
    }

    #[test]
    fn partial_with_no_partials_map_renders_empty_by_default() {
        assert_eq!(render("a{{>missing}}b", RenderOptions::default(), None).unwrap(), "ab");
    }

    #[test]
    fn partial_with_no_partials_map_fails_when_configured() {
        let err = render("a{{>missing}}b", RenderOptions::failing_on_partial_miss(), None).unwrap_err();
        assert!(matches!(err, Error::PartialsDisabled));
    }

    #[test]
    fn unknown_partial_in_a_supplied_map_fails_when_configured() {
        let partials = Partials::new();
        let err = render(
            "a{{>missing}}b",
            RenderOptions::failing_on_partial_miss(),
            Some(&partials),
        )
        .unwrap_err();
        assert!(matches!(err, Error::PartialNotFound(key) if &*key == "missing"));
    }
}
