//! Lambda content: a closure wrapped as [`Content`] whose buffered output is
//! re-parsed as a template and rendered against the active stack.
//!
//! A lambda that wants to interpolate template source written through
//! [`LambdaContext::write`] gets that for free: the whole buffer is re-parsed
//! and rendered once the closure returns. A lambda that instead wants to
//! render a sub-template against the *current* stack right away, e.g. to
//! build a piece of text that must not itself be reparsed as more template
//! source, uses [`LambdaContext::render`], which parses and renders
//! immediately and appends the already-rendered text to the buffer.

use std::fmt;

use crate::content::Content;
use crate::delimiters::Delimiters;
use crate::encoding::Encoder;
use crate::error::Error;
use crate::render::{render_body, render_lambda_output, Section, Stack};

/// Output builder handed to a lambda closure. The closure appends the
/// template source it wants rendered; once it returns, that source is
/// re-parsed under the delimiters active at the call site and rendered
/// against the current context stack.
pub struct LambdaContext<'text, 'a, 'r> {
    inner_text: &'text str,
    buffer: String,
    stack: &'a Stack<'r>,
    delimiters: &'a Delimiters,
}

impl<'text, 'a, 'r> LambdaContext<'text, 'a, 'r> {
    fn new(inner_text: &'text str, stack: &'a Stack<'r>, delimiters: &'a Delimiters) -> Self {
        LambdaContext {
            inner_text,
            buffer: String::new(),
            stack,
            delimiters,
        }
    }

    /// The section's unrendered body text. Empty for an interpolation-site
    /// lambda, which has no section to capture from.
    pub fn inner_text(&self) -> &str {
        self.inner_text
    }

    pub fn write(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    pub fn write_fmt(&mut self, args: fmt::Arguments<'_>) {
        use fmt::Write;
        let _ = self.buffer.write_fmt(args);
    }

    /// Parses `template` under the delimiters active at the call site,
    /// renders it against the current context stack, and appends the
    /// rendered text to the buffer immediately, unlike [`Self::write`],
    /// whose argument waits to be (re)parsed until the closure returns.
    pub fn render(&mut self, template: &str) -> Result<(), Error> {
        let elements = crate::parser::parse_with_delimiters(
            template,
            &self.stack.ctx().parser_options,
            self.delimiters.clone(),
        )?;
        render_body(&elements, self.stack, None, &mut self.buffer)
    }
}

/// Wraps a closure as [`Content`]. At an interpolation site it is invoked
/// with empty inner text; at a section site, with that section's captured
/// inner text. Either way, a lambda is always truthy and its buffered
/// output is always re-parsed as a template and rendered before being
/// written — escaped or not, matching the call site.
pub struct Lambda<F> {
    func: F,
}

impl<F> Lambda<F>
where
    F: Fn(&mut LambdaContext<'_, '_, '_>) -> Result<(), Error>,
{
    pub fn new(func: F) -> Self {
        Lambda { func }
    }

    fn invoke<'r>(
        &self,
        inner_text: &str,
        delimiters: &Delimiters,
        stack: &Stack<'r>,
        escape: bool,
        encoder: &mut dyn Encoder,
    ) -> Result<(), Error> {
        let mut ctx = LambdaContext::new(inner_text, stack, delimiters);
        (self.func)(&mut ctx)?;
        render_lambda_output(&ctx.buffer, delimiters, stack, escape, encoder)
    }
}

impl<F> Content for Lambda<F>
where
    F: Fn(&mut LambdaContext<'_, '_, '_>) -> Result<(), Error>,
{
    #[inline]
    fn render_escaped<'r>(&'r self, stack: &Stack<'r>, encoder: &mut dyn Encoder) -> Result<(), Error> {
        self.invoke("", &Delimiters::default(), stack, true, encoder)
    }

    #[inline]
    fn render_unescaped<'r>(&'r self, stack: &Stack<'r>, encoder: &mut dyn Encoder) -> Result<(), Error> {
        self.invoke("", &Delimiters::default(), stack, false, encoder)
    }

    #[inline]
    fn render_section<'r>(
        &'r self,
        section: Section<'_, 'r>,
        stack: &Stack<'r>,
        encoder: &mut dyn Encoder,
    ) -> Result<(), Error> {
        self.invoke(section.inner_text(), section.delimiters(), stack, false, encoder)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::options::{ParserOptions, RenderOptions};
    use crate::render::RenderContext;

    #[test]
    fn interpolation_lambda_rerenders_its_output() {
        let lambda = Lambda::new(|ctx: &mut LambdaContext<'_, '_, '_>| {
            ctx.write("<b>");
            Ok(())
        });
        let ctx = RenderContext::new(
            None,
            RenderOptions::default(),
            ParserOptions::default().with_lambdas(10),
        );
        let root: &dyn Content = &lambda;
        let stack = Stack::root(&ctx, root);
        let mut out = String::new();
        lambda.render_escaped(&stack, &mut out).unwrap();
        assert_eq!(out, "&lt;b&gt;");
    }

    #[test]
    fn render_renders_against_the_current_stack_immediately() {
        use std::collections::HashMap;

        let mut fields = HashMap::new();
        fields.insert("name".to_string(), "<Pat>".to_string());

        let lambda = Lambda::new(|ctx: &mut LambdaContext<'_, '_, '_>| {
            ctx.render("{{name}}")?;
            ctx.write(" says hi");
            Ok(())
        });
        let ctx = RenderContext::new(
            None,
            RenderOptions::default(),
            ParserOptions::default().with_lambdas(10),
        );
        let root: &dyn Content = &fields;
        let stack = Stack::root(&ctx, root);
        let mut out = String::new();
        lambda.render_escaped(&stack, &mut out).unwrap();
        // "{{name}}" is rendered (and escaped) eagerly via `render`, so the
        // already-escaped text survives the later whole-buffer reparse;
        // " says hi" is appended raw and still reparsed as usual.
        assert_eq!(out, "&amp;lt;Pat&amp;gt; says hi");
    }
}
