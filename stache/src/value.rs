//! An adapter that implements [`Content`] directly over `serde_json::Value`,
//! for rendering against a dynamically typed value tree (parsed JSON, a
//! config document, anything that doesn't have a native Rust struct to
//! derive against). Gated behind the `json` feature.
//!
//! Follows the same shape as the `HashMap`/`Vec` impls in [`crate::content`]:
//! objects resolve fields by key, arrays iterate as a section, and scalars
//! fall back to their usual truthiness (`false`/`0`/`""`/`null` are falsy,
//! everything else is truthy).

use serde_json::Value;

use crate::content::Content;
use crate::encoding::Encoder;
use crate::error::Error;
use crate::path::Segment;
use crate::render::{Section, Stack};

impl Content for Value {
    fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
        }
    }

    fn capacity_hint(&self) -> usize {
        match self {
            Value::String(s) => s.len(),
            _ => 0,
        }
    }

    fn render_escaped<'stack>(
        &'stack self,
        stack: &Stack<'stack>,
        encoder: &mut dyn Encoder,
    ) -> Result<(), Error> {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => b.render_escaped(stack, encoder),
            Value::Number(n) => encoder.write_fmt_escaped(format_args!("{n}")),
            Value::String(s) => s.as_str().render_escaped(stack, encoder),
            Value::Array(_) | Value::Object(_) => Ok(()),
        }
    }

    fn render_unescaped<'stack>(
        &'stack self,
        stack: &Stack<'stack>,
        encoder: &mut dyn Encoder,
    ) -> Result<(), Error> {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => b.render_unescaped(stack, encoder),
            Value::Number(n) => encoder.write_fmt_unescaped(format_args!("{n}")),
            Value::String(s) => s.as_str().render_unescaped(stack, encoder),
            Value::Array(_) | Value::Object(_) => Ok(()),
        }
    }

    fn render_section<'stack>(
        &'stack self,
        section: Section<'_, 'stack>,
        stack: &Stack<'stack>,
        encoder: &mut dyn Encoder,
    ) -> Result<(), Error> {
        match self {
            Value::Array(items) => {
                for item in items {
                    let pushed = stack.push(item);
                    section.clone().render(pushed, encoder)?;
                }
                Ok(())
            }
            _ => {
                if self.is_truthy() {
                    section.render(stack.push(self), encoder)
                } else {
                    Ok(())
                }
            }
        }
    }

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

    fn get_field(&self, segment: Segment<'_>) -> Option<&dyn Content> {
        match self {
            Value::Object(map) => map.get(segment.name).map(|v| v as &dyn Content),
            _ => None,
        }
    }

    fn get_len(&self) -> Option<usize> {
        match self {
            Value::Array(a) => Some(a.len()),
            Value::Object(o) => Some(o.len()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::options::{ParserOptions, RenderOptions};
    use crate::render::RenderContext;

    fn render(value: &Value, tpl: &str) -> String {
        let ctx = RenderContext::new(None, RenderOptions::default(), ParserOptions::default());
        let elements = crate::parser::parse(tpl, &ctx.parser_options).unwrap();
        let mut out = String::new();
        crate::render::render(&elements, value, &ctx, &mut out).unwrap();
        out
    }

    #[test]
    fn object_field_lookup() {
        let value: Value = serde_json::json!({ "name": "Ada" });
        assert_eq!(render(&value, "hi {{name}}"), "hi Ada");
    }

    #[test]
    fn array_as_section() {
        let value: Value = serde_json::json!({ "items": [1, 2, 3] });
        assert_eq!(render(&value, "{{#items}}{{.}},{{/items}}"), "1,2,3,");
    }

    #[test]
    fn null_and_false_are_falsy() {
        let value: Value = serde_json::json!({ "flag": false, "nothing": null });
        assert_eq!(render(&value, "{{^flag}}no{{/flag}}{{^nothing}}none{{/nothing}}"), "nonone");
    }
}
