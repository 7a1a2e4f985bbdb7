//! Structured errors surfaced by the scanner, parser and renderer.

use std::io;
use thiserror::Error;

/// The kind of a fatal parse error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// End of input reached while a tag or a nested section was still open.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// A `{{/name}}` was found with no matching open section at this level.
    #[error("unexpected closing section tag")]
    UnexpectedCloseSection,

    /// A `{{/name}}` closed the wrong section.
    #[error("closing tag {0:?} does not match the currently open section")]
    ClosingTagMismatch(Box<str>),

    /// A `{{=...=}}` tag did not contain exactly two whitespace separated
    /// delimiter tokens, or delimiter redefinition is disabled.
    #[error("invalid delimiter redefinition tag")]
    InvalidDelimiters,

    /// A tag's body was not a single identifier or dotted path.
    #[error("invalid identifier in tag body")]
    InvalidIdentifier,

    /// The configured opening delimiter is empty or equal to the closing one.
    #[error("starting delimiter is invalid")]
    StartingDelimiterMismatch,

    /// The configured closing delimiter is empty or equal to the opening one.
    #[error("ending delimiter is invalid")]
    EndingDelimiterMismatch,
}

/// Error type returned by parsing, and (optionally) by rendering when a
/// context miss is configured to be fatal.
#[derive(Debug, Error)]
pub enum Error {
    /// Error with the IO (only possible when loading a template or partial
    /// from a file).
    #[error(transparent)]
    Io(#[from] io::Error),

    /// A fatal parse error, carrying the source position of the offending
    /// byte.
    #[error("{kind} at line {line}, column {column}")]
    Parse {
        kind: ErrorKind,
        line: u32,
        column: u32,
    },

    /// Partials are not allowed in the given context (`render.partial_misses`
    /// is configured to fail and no partials map was supplied at all).
    #[error("partials are not allowed in this context")]
    PartialsDisabled,

    /// The named partial/parent could not be found in the partials map, and
    /// `render.partial_misses` is configured to fail.
    #[error("partial {0:?} was not found")]
    PartialNotFound(Box<str>),

    /// `Template` always parses its whole source up front into a single
    /// owned element array; `OutputMode::Render` only applies to the
    /// streaming entry points, which parse and render a source in bounded
    /// batches instead.
    #[error("OutputMode::Render requires a streaming entry point, not Template")]
    StreamingModeNotSupported,

    /// `render.context_misses` is configured to fail and a path could not be
    /// resolved against the context stack.
    #[error("path {0:?} could not be resolved against the current context")]
    ContextMiss(Box<str>),

    /// A lambda invoked during rendering returned an error of its own.
    #[error("lambda invocation failed: {0}")]
    Lambda(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub(crate) fn parse(kind: ErrorKind, line: u32, column: u32) -> Self {
        Error::Parse { kind, line, column }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
