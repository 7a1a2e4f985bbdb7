//! The parser.
//!
//! Drives the [`Scanner`](crate::scanner::Scanner) to completion, decides
//! standalone-line trimming, and builds the flat, pre-order [`Element`]
//! sequence, resolving nested sections via an explicit open-frame stack
//! rather than recursion, so nesting depth is bounded only by available
//! memory rather than a fixed limit.

use beef::lean::Cow;

use crate::delimiters::Delimiters;
use crate::element::{Element, SectionMeta};
use crate::error::{Error, ErrorKind};
use crate::options::ParserOptions;
use crate::path::Path;
use crate::scanner::{trim, PartType, Scanner, TextPart};

/// One section-like tag (`#`, `^`, `<`, `$`) still waiting for its `{{/name}}`.
struct OpenFrame<'tpl> {
    /// Index of this section's placeholder element in the output vector.
    index: usize,
    /// The raw tag body, for `{{/name}}` mismatch diagnostics.
    name: &'tpl str,
    /// Delimiters in effect when the section was opened, carried onto
    /// `SectionMeta` for re-parsing a lambda's returned string.
    delimiters: Delimiters,
    /// Byte offset where the section's body begins, i.e. where the static
    /// text right after the open tag starts.
    body_start: usize,
    capture_inner_text: bool,
}

fn make_cow<'tpl>(options: &ParserOptions, s: &'tpl str) -> Cow<'tpl, str> {
    if options.copy_strings {
        Cow::owned(s.to_string())
    } else {
        Cow::borrowed(s)
    }
}

/// Folds a newly-seen static-text run into the running "is everything since
/// the last newline blank" flag.
fn advance_line_clean(line_clean: bool, content: &str) -> bool {
    if trim::right_trim_at(content).is_some() {
        true
    } else if content.contains('\n') {
        false
    } else {
        line_clean && trim::is_all_blank(content)
    }
}

/// Whether everything from the static-text part at `parts[idx]` onward, up
/// to the next real newline (or end of input), is blank — walking through
/// any further zero-gap standalone-capable tags in between (e.g. a section
/// opened and closed with nothing separating the two tags but an empty
/// static-text run).
fn after_is_blank(parts: &[(TextPart, Delimiters)], mut idx: usize) -> bool {
    loop {
        let content = parts[idx].0.content;

        if trim::left_trim_at(content).is_some() {
            return true;
        }

        let is_last = idx == parts.len() - 1;
        if is_last {
            return trim::is_all_blank(content);
        }
        if !trim::is_all_blank(content) {
            return false;
        }

        if !parts[idx + 1].0.part_type.can_be_standalone() {
            return false;
        }

        idx += 2;
    }
}

fn split_delimiter_spec(body: &str) -> Option<(&str, &str)> {
    let mut tokens = body.split_whitespace();
    let start = tokens.next()?;
    let end = tokens.next()?;
    if tokens.next().is_some() {
        return None;
    }
    Some((start, end))
}

/// Parses `source` into a flat element sequence, honoring `options`.
pub(crate) fn parse<'tpl>(
    source: &'tpl str,
    options: &ParserOptions,
) -> Result<Vec<Element<'tpl>>, Error> {
    #[cfg(feature = "diagnostics")]
    tracing::debug!(target: "stache::parser", len = source.len(), "parsing template");

    let parts = scan_all(source, options, Delimiters::default())?;
    let elements = build_elements(source, &parts, options);

    #[cfg(feature = "diagnostics")]
    if let Err(err) = &elements {
        tracing::warn!(target: "stache::parser", %err, "parse failed");
    }

    elements
}

/// Parses `source` under a non-default starting delimiter pair. Used to
/// re-parse a lambda's returned string under the delimiters active at its
/// section's call site, rather than the document default.
pub(crate) fn parse_with_delimiters<'tpl>(
    source: &'tpl str,
    options: &ParserOptions,
    initial: Delimiters,
) -> Result<Vec<Element<'tpl>>, Error> {
    #[cfg(feature = "diagnostics")]
    tracing::trace!(target: "stache::parser", len = source.len(), open = initial.start(), close = initial.end(), "reparsing lambda output");

    let parts = scan_all(source, options, initial)?;
    build_elements(source, &parts, options)
}

/// Runs the scanner to completion, reacting to `{{=...=}}` tags as they are
/// seen (delimiter changes must take effect before the scanner looks for the
/// next tag). Returns each part alongside the delimiters that were active
/// when it was produced.
pub(crate) fn scan_all<'tpl>(
    source: &'tpl str,
    options: &ParserOptions,
    initial: Delimiters,
) -> Result<Vec<(TextPart<'tpl>, Delimiters)>, Error> {
    let mut scanner = Scanner::new(source);
    scanner.set_delimiters(initial);
    let mut out = Vec::new();

    while let Some(part) = scanner.next()? {
        let active = scanner.delimiters().clone();

        if part.part_type == PartType::Delimiters {
            if !options.allow_redefine_delimiters {
                return Err(Error::parse(
                    ErrorKind::InvalidDelimiters,
                    part.line,
                    part.column,
                ));
            }
            let (start, end) = split_delimiter_spec(part.content).ok_or_else(|| {
                Error::parse(ErrorKind::InvalidDelimiters, part.line, part.column)
            })?;
            let delimiters = Delimiters::new(start, end)
                .map_err(|_| Error::parse(ErrorKind::InvalidDelimiters, part.line, part.column))?;
            scanner.set_delimiters(delimiters);
        }

        out.push((part, active));
    }

    Ok(out)
}

pub(crate) fn build_elements<'tpl>(
    source: &'tpl str,
    parts: &[(TextPart<'tpl>, Delimiters)],
    options: &ParserOptions,
) -> Result<Vec<Element<'tpl>>, Error> {
    // Indentation captured for a standalone partial/parent tag.
    let mut indentation: Vec<Option<&'tpl str>> = vec![None; parts.len()];
    // Absolute keep-range for each StaticText part, after standalone trims.
    let mut head_start = vec![0usize; parts.len()];
    let mut tail_end: Vec<Option<usize>> = vec![None; parts.len()];

    let mut line_clean = true;

    for i in 0..parts.len() {
        let (part, _) = &parts[i];

        match part.part_type {
            PartType::StaticText => {
                let content = &part.content[head_start[i]..];
                line_clean = advance_line_clean(line_clean, content);
            }
            part_type => {
                if part_type.can_be_standalone() && line_clean && i > 0 {
                    let next = &parts[i + 1].0;
                    let after_ok = after_is_blank(parts, i + 1);

                    if after_ok {
                        let prev = &parts[i - 1].0;
                        let prev_content = &prev.content[head_start[i - 1]..];

                        // `None` means `prev_content` has no newline of its own but is
                        // entirely blank (guaranteed by `line_clean` being true here), so
                        // it is dropped in full rather than kept up to a newline.
                        let prev_keep = match trim::right_trim_at(prev_content) {
                            Some(idx) => head_start[i - 1] + idx + 1,
                            None => head_start[i - 1],
                        };

                        if matches!(part_type, PartType::Partial | PartType::Parent)
                            && options.preserve_line_breaks_and_indentation
                        {
                            let indent = &prev_content[(prev_keep - head_start[i - 1])..];
                            if !indent.is_empty() {
                                indentation[i] = Some(indent);
                            }
                        }

                        tail_end[i - 1] = Some(prev_keep);

                        head_start[i + 1] = match trim::left_trim_at(next.content) {
                            Some(idx) => idx,
                            None => next.content.len(),
                        };

                        line_clean = true;
                        continue;
                    }
                }

                if !part_type.can_be_standalone() {
                    line_clean = false;
                }
            }
        }
    }

    let mut elements = Vec::with_capacity(parts.len());
    let mut stack: Vec<OpenFrame<'tpl>> = Vec::new();

    for i in 0..parts.len() {
        let (part, delimiters) = &parts[i];

        match part.part_type {
            PartType::StaticText => {
                let start = head_start[i];
                let end = tail_end[i].unwrap_or(part.content.len());
                let text = if start <= end { &part.content[start..end] } else { "" };
                if !text.is_empty() {
                    elements.push(Element::StaticText(make_cow(options, text)));
                }
            }
            PartType::Comment | PartType::Delimiters => {}
            PartType::Interpolation => {
                let name = part.content.trim();
                if name.is_empty() {
                    return Err(Error::parse(
                        ErrorKind::InvalidIdentifier,
                        part.line,
                        part.column,
                    ));
                }
                elements.push(Element::Interpolation(Path::parse(name)));
            }
            PartType::UnescapedInterpolation => {
                let name = part.content.trim();
                if name.is_empty() {
                    return Err(Error::parse(
                        ErrorKind::InvalidIdentifier,
                        part.line,
                        part.column,
                    ));
                }
                elements.push(Element::UnescapedInterpolation(Path::parse(name)));
            }
            PartType::Section | PartType::InvertedSection => {
                let name = part.content.trim();
                if name.is_empty() {
                    return Err(Error::parse(
                        ErrorKind::InvalidIdentifier,
                        part.line,
                        part.column,
                    ));
                }
                let body_start = i + 1;
                let body_start_offset = parts
                    .get(body_start)
                    .map(|(p, _)| p.src_offset)
                    .unwrap_or(source.len());

                let index = elements.len();
                if part.part_type == PartType::Section {
                    elements.push(Element::Section(SectionMeta {
                        path: Path::parse(name),
                        children: 0,
                        inner_text: None,
                        delimiters: delimiters.clone(),
                    }));
                } else {
                    elements.push(Element::InvertedSection {
                        path: Path::parse(name),
                        children: 0,
                    });
                }

                stack.push(OpenFrame {
                    index,
                    name,
                    delimiters: delimiters.clone(),
                    body_start: body_start_offset,
                    capture_inner_text: options.lambdas.enabled()
                        && part.part_type == PartType::Section,
                });
            }
            PartType::Parent | PartType::Block => {
                let name = part.content.trim();
                if name.is_empty() {
                    return Err(Error::parse(
                        ErrorKind::InvalidIdentifier,
                        part.line,
                        part.column,
                    ));
                }
                let index = elements.len();
                if part.part_type == PartType::Parent {
                    elements.push(Element::Parent {
                        key: make_cow(options, name),
                        children: 0,
                        indentation: indentation[i].map(|s| make_cow(options, s)),
                    });
                } else {
                    elements.push(Element::Block {
                        key: make_cow(options, name),
                        children: 0,
                    });
                }

                stack.push(OpenFrame {
                    index,
                    name,
                    delimiters: delimiters.clone(),
                    body_start: 0,
                    capture_inner_text: false,
                });
            }
            PartType::Partial => {
                let name = part.content.trim();
                if name.is_empty() {
                    return Err(Error::parse(
                        ErrorKind::InvalidIdentifier,
                        part.line,
                        part.column,
                    ));
                }
                elements.push(Element::Partial {
                    key: make_cow(options, name),
                    indentation: indentation[i].map(|s| make_cow(options, s)),
                });
            }
            PartType::CloseSection => {
                let name = part.content.trim();
                let frame = stack.pop().ok_or_else(|| {
                    Error::parse(ErrorKind::UnexpectedCloseSection, part.line, part.column)
                })?;
                if frame.name.trim() != name {
                    return Err(Error::parse(
                        ErrorKind::ClosingTagMismatch(frame.name.trim().into()),
                        part.line,
                        part.column,
                    ));
                }

                let children = elements.len() - frame.index - 1;

                match &mut elements[frame.index] {
                    Element::Section(meta) => {
                        meta.children = children;
                        if frame.capture_inner_text {
                            meta.inner_text =
                                Some(make_cow(options, &source[frame.body_start..part.src_offset]));
                        }
                    }
                    Element::InvertedSection { children: c, .. } => *c = children,
                    Element::Parent { children: c, .. } => *c = children,
                    Element::Block { children: c, .. } => *c = children,
                    _ => unreachable!("open frames only ever reference section-like elements"),
                }
            }
        }
    }

    if !stack.is_empty() {
        let (part, _) = parts.last().expect("a parser error requires at least one part");
        return Err(Error::parse(
            ErrorKind::UnexpectedEof,
            part.line,
            part.column,
        ));
    }

    Ok(elements)
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse_default(source: &str) -> Vec<Element<'_>> {
        parse(source, &ParserOptions::default()).unwrap()
    }

    fn kinds(elements: &[Element<'_>]) -> Vec<&'static str> {
        elements
            .iter()
            .map(|e| match e {
                Element::StaticText(_) => "text",
                Element::Interpolation(_) => "interp",
                Element::UnescapedInterpolation(_) => "unescaped",
                Element::Section(_) => "section",
                Element::InvertedSection { .. } => "inverted",
                Element::Partial { .. } => "partial",
                Element::Parent { .. } => "parent",
                Element::Block { .. } => "block",
            })
            .collect()
    }

    #[test]
    fn plain_text() {
        let elements = parse_default("hello world");
        assert_eq!(kinds(&elements), vec!["text"]);
        match &elements[0] {
            Element::StaticText(s) => assert_eq!(s.as_ref(), "hello world"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn interpolation_between_text() {
        let elements = parse_default("Hi {{name}}!");
        assert_eq!(kinds(&elements), vec!["text", "interp", "text"]);
    }

    #[test]
    fn nested_sections_get_children_counts() {
        let elements = parse_default("{{#a}}{{#b}}x{{/b}}{{/a}}");
        assert_eq!(kinds(&elements), vec!["section", "section", "text"]);
        match &elements[0] {
            Element::Section(meta) => assert_eq!(meta.children, 2),
            _ => unreachable!(),
        }
        match &elements[1] {
            Element::Section(meta) => assert_eq!(meta.children, 1),
            _ => unreachable!(),
        }
    }

    #[test]
    fn standalone_section_tags_are_trimmed() {
        let elements = parse_default("{{#a}}\n  hi\n{{/a}}\n");
        assert_eq!(kinds(&elements), vec!["section", "text"]);
        match &elements[0] {
            Element::Section(meta) => assert_eq!(meta.children, 1),
            _ => unreachable!(),
        }
        match &elements[1] {
            Element::StaticText(s) => assert_eq!(s.as_ref(), "  hi\n"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn non_standalone_interpolation_survives() {
        let elements = parse_default("  {{x}}  \n");
        assert_eq!(kinds(&elements), vec!["text", "interp", "text"]);
    }

    #[test]
    fn mismatched_close_tag_errors() {
        let err = parse("{{#a}}{{/b}}", &ParserOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Parse {
                kind: ErrorKind::ClosingTagMismatch(_),
                ..
            }
        ));
    }

    #[test]
    fn unopened_close_tag_errors() {
        let err = parse("{{/a}}", &ParserOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Parse {
                kind: ErrorKind::UnexpectedCloseSection,
                ..
            }
        ));
    }

    #[test]
    fn unclosed_section_is_eof() {
        let err = parse("{{#a}}x", &ParserOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Parse {
                kind: ErrorKind::UnexpectedEof,
                ..
            }
        ));
    }

    #[test]
    fn delimiter_redefinition_takes_effect_immediately() {
        let elements = parse_default("{{=<% %>=}}<% x %>{{not a tag}}");
        assert_eq!(kinds(&elements), vec!["interp", "text"]);
        match &elements[0] {
            Element::Interpolation(path) => assert_eq!(path.to_string(), "x"),
            _ => unreachable!(),
        }
        match &elements[1] {
            Element::StaticText(s) => assert_eq!(s.as_ref(), "{{not a tag}}"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn disabled_delimiter_redefinition_errors() {
        let opts = ParserOptions::default().without_delimiter_redefinition();
        let err = parse("{{=<% %>=}}", &opts).unwrap_err();
        assert!(matches!(
            err,
            Error::Parse {
                kind: ErrorKind::InvalidDelimiters,
                ..
            }
        ));
    }

    #[test]
    fn standalone_partial_captures_indentation() {
        let elements = parse_default("  {{>partial}}\n");
        assert_eq!(kinds(&elements), vec!["partial"]);
        match &elements[0] {
            Element::Partial { indentation, .. } => {
                assert_eq!(indentation.as_ref().map(|s| s.as_ref()), Some("  "));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn inline_partial_has_no_indentation() {
        let elements = parse_default("a {{>partial}} b");
        match &elements[1] {
            Element::Partial { indentation, .. } => assert!(indentation.is_none()),
            _ => unreachable!(),
        }
    }

    #[test]
    fn lambdas_enabled_captures_inner_text() {
        let opts = ParserOptions::default().with_lambdas(10);
        let elements = parse("{{#a}}hello {{x}}{{/a}}", &opts).unwrap();
        match &elements[0] {
            Element::Section(meta) => {
                assert_eq!(meta.inner_text.as_deref(), Some("hello {{x}}"));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn inner_text_not_captured_by_default() {
        let elements = parse_default("{{#a}}hello{{/a}}");
        match &elements[0] {
            Element::Section(meta) => assert!(meta.inner_text.is_none()),
            _ => unreachable!(),
        }
    }
}
