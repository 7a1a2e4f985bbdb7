//! Streaming parse-and-render over an [`io::Read`] source, for templates too
//! large to hold as a single materialized [`crate::template::Template`].
//!
//! The driver reads the source in fixed-size chunks into a growing window,
//! scans the window for a safe place to cut — the end of a static-text part
//! that ends in a newline with no section currently open — and, once found,
//! parses and renders just that prefix before compacting it out of the
//! window. A batch's element array borrows from a copy of its slice of
//! source text held in an [`EpochArena`] rather than from the window itself,
//! since the window is mutated again on the very next iteration.
//!
//! Bytes read but not yet known to end on a tag boundary are never handed to
//! the scanner: the last `delimiters.max_open_len() - 1` bytes of an
//! in-progress window are always held back until more input arrives (or the
//! source is exhausted), so a tag opening marker split across two reads can
//! never be mistaken for plain text.

use std::fs;
use std::io;
use std::path::Path as FsPath;
use std::rc::Rc;

use crate::arena::EpochArena;
use crate::content::Content;
use crate::delimiters::Delimiters;
use crate::encoding::{Encoder, IoEncoder};
use crate::error::{Error, ErrorKind};
use crate::options::{ParserOptions, RenderOptions};
use crate::partials::Partials;
use crate::render::{self, RenderContext};
use crate::scanner::{PartType, TextPart};

/// Default read-buffer size: 4 KiB, large enough to amortize syscalls
/// without holding much more than one batch's worth of source in memory at
/// once.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

fn floor_char_boundary(bytes: &[u8], mut idx: usize) -> usize {
    if idx >= bytes.len() {
        return bytes.len();
    }
    while idx > 0 && (bytes[idx] & 0xC0) == 0x80 {
        idx -= 1;
    }
    idx
}

/// Where, within a freshly scanned prefix of the window, it is safe to cut
/// for a batch: the byte offset just past the last top-level static-text
/// part that ends in `\n`, and the delimiters in effect right after it.
struct Boundary {
    through: usize,
    next_delimiters: Delimiters,
}

fn find_boundary(parts: &[(TextPart<'_>, Delimiters)]) -> Option<Boundary> {
    let mut depth: i32 = 0;
    let mut best: Option<usize> = None;

    for (i, (part, _)) in parts.iter().enumerate() {
        match part.part_type {
            PartType::Section | PartType::InvertedSection | PartType::Parent | PartType::Block => {
                depth += 1;
            }
            PartType::CloseSection => depth -= 1,
            PartType::StaticText if depth == 0 && part.content.ends_with('\n') => {
                best = Some(i);
            }
            _ => {}
        }
    }

    let i = best?;
    let (part, _) = &parts[i];
    let through = part.src_offset + part.content.len();
    let next_delimiters = parts
        .get(i + 1)
        .map(|(_, d)| d.clone())
        .unwrap_or_else(|| parts[i].1.clone());

    Some(Boundary {
        through,
        next_delimiters,
    })
}

/// Reads `reader` in [`DEFAULT_CHUNK_SIZE`] chunks and renders it against
/// `content`, batch by batch, writing escaped/unescaped output straight to
/// `encoder` as each batch is parsed rather than materializing the whole
/// template's elements up front.
pub fn render_reader<R>(
    mut reader: R,
    content: &dyn Content,
    options: &ParserOptions,
    render_options: RenderOptions,
    partials: Option<&Partials<'_>>,
    encoder: &mut dyn Encoder,
) -> Result<(), Error>
where
    R: io::Read,
{
    let ctx = RenderContext::new(partials, render_options, options.clone());
    let arena = EpochArena::new();

    let mut window: Vec<u8> = Vec::new();
    let mut read_buf = vec![0u8; DEFAULT_CHUNK_SIZE];
    let mut delimiters = Delimiters::default();
    let mut true_eof = false;

    loop {
        if true_eof && window.is_empty() {
            return Ok(());
        }

        if !true_eof {
            let n = reader.read(&mut read_buf)?;
            if n == 0 {
                true_eof = true;
            } else {
                // A per-read chunk: copied into the window and dropped
                // immediately. The window, not this chunk, is what the
                // scanner and arena borrow from.
                let chunk: Rc<[u8]> = Rc::from(&read_buf[..n]);
                window.extend_from_slice(&chunk);
            }
        }

        let reserve = if true_eof {
            0
        } else {
            delimiters.max_open_len().saturating_sub(1)
        };
        let scan_len = floor_char_boundary(&window, window.len().saturating_sub(reserve));

        let window_str = std::str::from_utf8(&window[..scan_len]).map_err(|_| {
            Error::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                "template source is not valid UTF-8",
            ))
        })?;

        let parts = match crate::parser::scan_all(window_str, options, delimiters.clone()) {
            Ok(parts) => parts,
            Err(Error::Parse {
                kind: ErrorKind::UnexpectedEof,
                ..
            }) if !true_eof => continue,
            Err(e) => return Err(e),
        };

        let boundary = find_boundary(&parts);

        // `delimiters` holds what was active at the *start* of this window
        // scan; it must be captured before being advanced to whatever comes
        // into effect after the boundary, or re-scanning the flushed batch
        // below would use the wrong (next batch's) delimiters.
        let batch_delimiters = delimiters.clone();

        let through = match boundary {
            Some(b) => {
                delimiters = b.next_delimiters;
                b.through
            }
            None if true_eof => window_str.len(),
            None => continue,
        };

        if through > 0 {
            let batch_source = arena.alloc(&window_str[..through]);
            // Re-scan the copied slice directly, rather than remapping the
            // offsets already computed against `window_str`: simpler, and
            // the cost is one extra scan of a batch-sized (not
            // document-sized) slice.
            let batch_parts = crate::parser::scan_all(batch_source, options, batch_delimiters)?;
            let elements = crate::parser::build_elements(batch_source, &batch_parts, options)?;

            {
                let stack = render::Stack::root(&ctx, content);
                render::render_body(&elements, &stack, None, encoder)?;
            }

            arena.next_epoch();
        }

        window.drain(0..through);

        if through == 0 && true_eof {
            // Nothing left to flush and nothing more will arrive: whatever
            // remains is an unterminated tag or an unclosed section, which
            // `build_elements` above already surfaced as an error — this
            // branch is unreachable in practice, but guards against an
            // infinite loop if it somehow isn't.
            return Ok(());
        }
    }
}

/// Opens `path` and renders it the same way as [`render_reader`].
pub fn render_file<P>(
    path: P,
    content: &dyn Content,
    options: &ParserOptions,
    render_options: RenderOptions,
    partials: Option<&Partials<'_>>,
    encoder: &mut dyn Encoder,
) -> Result<(), Error>
where
    P: AsRef<FsPath>,
{
    let file = fs::File::open(path)?;
    render_reader(
        io::BufReader::new(file),
        content,
        options,
        render_options,
        partials,
        encoder,
    )
}

/// Convenience wrapper writing to any [`io::Write`] sink.
pub fn render_reader_to_writer<R, W>(
    reader: R,
    writer: &mut W,
    content: &dyn Content,
    options: &ParserOptions,
    render_options: RenderOptions,
    partials: Option<&Partials<'_>>,
) -> Result<(), Error>
where
    R: io::Read,
    W: io::Write,
{
    let mut encoder = IoEncoder::new(writer);
    render_reader(reader, content, options, render_options, partials, &mut encoder)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    fn render_str(source: &str, content: &dyn Content) -> String {
        let mut out = String::new();
        render_reader(
            source.as_bytes(),
            content,
            &ParserOptions::default(),
            RenderOptions::default(),
            None,
            &mut out,
        )
        .unwrap();
        out
    }

    #[test]
    fn renders_plain_text_across_chunk_boundaries() {
        let source = "line one\nline two\nline three\n".repeat(200);
        assert_eq!(render_str(&source, &()), source);
    }

    #[test]
    fn renders_interpolation() {
        let mut ctx = HashMap::new();
        ctx.insert("name", "world");
        assert_eq!(render_str("hello {{name}}!\n", &ctx), "hello world!\n");
    }

    #[test]
    fn section_never_straddles_a_batch() {
        let mut ctx = HashMap::new();
        ctx.insert("items", vec!["a".to_string(), "b".to_string()]);
        let source = "before\n{{#items}}<{{.}}>\n{{/items}}after";
        assert_eq!(render_str(source, &ctx), "before\n<a>\n<b>\nafter");
    }

    #[test]
    fn rejects_invalid_utf8() {
        let mut out = String::new();
        let bytes: &[u8] = &[b'a', 0xff, 0xfe];
        let err = render_reader(
            bytes,
            &(),
            &ParserOptions::default(),
            RenderOptions::default(),
            None,
            &mut out,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
