//! The public `Template` type: preprocesses source text once into the flat
//! element array, then renders it against any [`Content`] value any number
//! of times.
//!
//! Partials are resolved at *render* time against a [`Partials`] map
//! supplied by the caller — built once via [`Templates::from_folder`], or
//! assembled by hand — rather than discovered recursively from disk while
//! parsing. That keeps a string-only template and a file-backed one on the
//! same render path, and means a `{{>partial}}` with nothing registered for
//! it isn't a hard error, just unresolved: it renders empty.

use std::fs;
use std::io;
use std::path::Path as FsPath;

use beef::lean::Cow;

use crate::content::Content;
use crate::element::Element;
use crate::encoding::IoEncoder;
use crate::error::Error;
use crate::options::{OutputMode, ParserOptions, RenderOptions};
use crate::partials::Partials;
use crate::render::{self, RenderContext};

/// A preprocessed template, ready to render against any [`Content`].
pub struct Template<'tpl> {
    elements: Vec<Element<'tpl>>,
    source: Cow<'tpl, str>,
    parser_options: ParserOptions,
}

impl<'tpl> Template<'tpl> {
    /// Parses `source` with the default [`ParserOptions`].
    pub fn new<S>(source: S) -> Result<Self, Error>
    where
        S: Into<Cow<'tpl, str>>,
    {
        Self::with_options(source, ParserOptions::default())
    }

    /// Parses `source` with explicit options.
    ///
    /// `options.output` must be [`OutputMode::Cache`] (the default):
    /// `Template` always holds its whole element array in memory, ready to
    /// render repeatedly. [`OutputMode::Render`] is for the streaming entry
    /// points in [`crate::stream`], which parse and render a source in
    /// bounded batches instead of building one and caching it.
    pub fn with_options<S>(source: S, options: ParserOptions) -> Result<Self, Error>
    where
        S: Into<Cow<'tpl, str>>,
    {
        if options.output == OutputMode::Render {
            return Err(Error::StreamingModeNotSupported);
        }

        let source = source.into();

        // SAFETY: `elements` borrows from the bytes backing `source`, which
        // is never mutated or moved again once stored on `Template` (it's a
        // private field, never exposed by `&mut`). Aliasing a `&'tpl str`
        // onto those bytes ahead of moving `source` into the struct lets the
        // owned and borrowing cases share one code path instead of
        // duplicating parsing for `&str` and `String` sources.
        let aliased: &'tpl str = unsafe {
            std::str::from_utf8_unchecked(std::slice::from_raw_parts(source.as_ptr(), source.len()))
        };

        let elements = crate::parser::parse(aliased, &options)?;

        Ok(Template {
            elements,
            source,
            parser_options: options,
        })
    }

    /// The source text this template was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn elements(&self) -> &[Element<'tpl>] {
        &self.elements
    }

    /// A rough estimate of the rendered output size, used to pre-size the
    /// output buffer.
    pub fn capacity_hint(&self) -> usize {
        self.source.len()
    }

    /// Renders against `content` with no partials available; any
    /// `{{>partial}}`/`{{<parent}}` tag renders as empty.
    pub fn render<C: Content>(&self, content: &C) -> String {
        self.render_with(content, None, RenderOptions::default())
    }

    /// Renders against `content`, resolving partials against `partials`.
    pub fn render_with_partials<'p, C: Content>(
        &self,
        content: &C,
        partials: &'p Partials<'p>,
    ) -> String
    where
        C: 'p,
    {
        self.render_with(content, Some(partials), RenderOptions::default())
    }

    fn render_with<'p, C: Content>(
        &self,
        content: &C,
        partials: Option<&'p Partials<'p>>,
        render_options: RenderOptions,
    ) -> String
    where
        C: 'p,
    {
        let mut capacity = content.capacity_hint().max(self.capacity_hint());
        capacity += capacity / 4;

        let mut buf = String::with_capacity(capacity);
        let ctx = RenderContext::new(partials, render_options, self.parser_options.clone());
        // A render error only ever comes from a fatal `ContextMiss` (when
        // configured) or a lambda's own error; both are opt-in, and the
        // infallible default path never produces one.
        let _ = render::render(&self.elements, content, &ctx, &mut buf);
        buf
    }

    /// Renders to any [`io::Write`] sink, escaping the same way as
    /// [`Template::render`].
    pub fn render_to_writer<W, C>(&self, writer: &mut W, content: &C) -> Result<(), Error>
    where
        W: io::Write,
        C: Content,
    {
        let mut encoder = IoEncoder::new(writer);
        let ctx = RenderContext::new(None, RenderOptions::default(), self.parser_options.clone());
        render::render(&self.elements, content, &ctx, &mut encoder)
    }
}

/// A cache of named templates loaded from a directory, used as a render-time
/// partials source.
pub struct Templates {
    partials: Partials<'static>,
}

impl Templates {
    /// Walks `dir` recursively, parsing every file with a matching
    /// extension and registering it under its path relative to `dir`.
    /// File contents are leaked to give their elements a `'static`
    /// lifetime — acceptable for a cache that is built once and kept for
    /// the life of the process.
    pub fn from_folder<P: AsRef<FsPath>>(dir: P, extension: &str) -> Result<Self, Error> {
        let dir = fs::canonicalize(dir.as_ref())?;
        let mut partials = Partials::new();
        load_folder(&dir, &dir, extension, &mut partials)?;
        Ok(Templates { partials })
    }

    pub fn partials(&self) -> &Partials<'static> {
        &self.partials
    }

    pub fn get(&self, name: &str) -> Option<&[Element<'static>]> {
        self.partials.get(name)
    }
}

fn load_folder(
    root: &FsPath,
    dir: &FsPath,
    extension: &str,
    partials: &mut Partials<'static>,
) -> Result<(), Error> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_dir() {
            load_folder(root, &path, extension, partials)?;
            continue;
        }

        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }

        let name = relative_name(root, &path);
        if partials.contains(&name) {
            continue;
        }

        let source: &'static str = Box::leak(fs::read_to_string(&path)?.into_boxed_str());
        let elements = crate::parser::parse(source, &ParserOptions::default())?;
        partials.insert(name, elements);
    }

    Ok(())
}

fn relative_name(root: &FsPath, path: &FsPath) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .with_extension("")
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn template_from_string_is_static() {
        let tpl: Template<'static> = Template::new(String::from("hello")).unwrap();
        assert_eq!(tpl.source(), "hello");
    }

    #[test]
    fn renders_plain_text() {
        let tpl = Template::new("hello world").unwrap();
        assert_eq!(tpl.render(&()), "hello world");
    }

    #[test]
    fn renders_interpolation() {
        let tpl = Template::new("hi {{name}}!").unwrap();
        let mut ctx = std::collections::HashMap::new();
        ctx.insert("name", "there");
        assert_eq!(tpl.render(&ctx), "hi there!");
    }

    #[test]
    fn unresolved_partial_renders_empty() {
        let tpl = Template::new("a{{>missing}}b").unwrap();
        assert_eq!(tpl.render(&()), "ab");
    }

    #[test]
    fn render_output_mode_is_rejected() {
        use crate::options::OutputMode;

        let mut opts = ParserOptions::default();
        opts.output = OutputMode::Render;
        let err = Template::with_options("hello", opts).unwrap_err();
        assert!(matches!(err, Error::StreamingModeNotSupported));
    }
}
