//! The trimmer.
//!
//! Pure, allocation-free functions that look at a single `static_text` slice
//! and decide the two candidate trim indices used by the standalone-line
//! machinery in the parser.

/// Bytes that count as "blank" on the *left* side of a line (the run that
/// must precede a newline for `left_trim_at` to fire): spaces, tabs, NUL, and
/// a lone carriage return.
#[inline]
fn is_left_blank(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | 0 | b'\r')
}

/// Bytes that count as "blank" on the *right* side of a line (the run that
/// must follow a newline for `right_trim_at` to fire): spaces and tabs only.
/// A lone `\r` is treated as ordinary whitespace for this purpose too, so it
/// is accepted here as well, but it never itself counts as the newline.
#[inline]
fn is_right_blank(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t')
}

/// Scan `content` for the index one past the first newline, provided
/// everything before that newline is blank. Returns `None` if a non-blank
/// byte is seen before any newline, or if there is no newline at all.
pub(crate) fn left_trim_at(content: &str) -> Option<usize> {
    let bytes = content.as_bytes();

    for (idx, &byte) in bytes.iter().enumerate() {
        if byte == b'\n' {
            return Some(idx + 1);
        }
        if !is_left_blank(byte) {
            return None;
        }
    }

    None
}

/// Scan `content` for the index of the last newline such that everything
/// after it (to the end of `content`) is blank. Returns `None` if there is
/// no such newline (including when there is no newline at all).
pub(crate) fn right_trim_at(content: &str) -> Option<usize> {
    let bytes = content.as_bytes();
    let mut candidate = None;

    for (idx, &byte) in bytes.iter().enumerate() {
        match byte {
            b'\n' => candidate = Some(idx),
            _ if is_right_blank(byte) => {}
            _ => candidate = None,
        }
    }

    candidate
}

/// `true` if every byte in `content` is blank (left-blank definition), i.e.
/// the part contains no newline and nothing but whitespace. Used for the
/// "start of input" / "end of input" edges of the standalone-line rule,
/// where there is no newline to anchor on.
pub(crate) fn is_all_blank(content: &str) -> bool {
    content.bytes().all(is_left_blank)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn left_trim_basic() {
        assert_eq!(left_trim_at("  \n rest"), Some(3));
        assert_eq!(left_trim_at("no newline"), None);
        assert_eq!(left_trim_at("x\nrest"), None);
        assert_eq!(left_trim_at("\n"), Some(1));
    }

    #[test]
    fn right_trim_basic() {
        assert_eq!(right_trim_at("before\n   "), Some(6));
        assert_eq!(right_trim_at("before\n  x"), None);
        assert_eq!(right_trim_at("no newline"), None);
        assert_eq!(right_trim_at("a\nb\n  "), Some(3));
    }

    #[test]
    fn all_blank() {
        assert!(is_all_blank(""));
        assert!(is_all_blank("   \t\r"));
        assert!(!is_all_blank("  x"));
    }

    #[test]
    fn idempotent_trimming() {
        // Trimming twice should equal trimming once.
        let content = "  \n   ";
        let first = right_trim_at(content).map(|i| &content[..=i]).unwrap_or(content);
        let second = right_trim_at(first).map(|i| &first[..=i]).unwrap_or(first);
        assert_eq!(first, second);
    }
}
