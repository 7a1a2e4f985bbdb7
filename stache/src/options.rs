//! Configuration surface. Plain structs with `Default` impls and
//! builder-style `with_*` methods.

/// How parsed nodes are handed to their consumer: held as a cacheable
/// element array, or streamed in batches to a renderer sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Return the full element array; callers may cache and re-render it.
    #[default]
    Cache,
    /// Stream parsed batches directly to a renderer sink, bounding memory.
    Render,
}

/// Whether lambdas (methods matching `fn(self?, LambdaContext)`) are looked
/// up at all, and if so, how deep a lambda may recurse into its own output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LambdaMode {
    Disabled,
    Enabled { max_recursion: u32 },
}

impl Default for LambdaMode {
    fn default() -> Self {
        LambdaMode::Disabled
    }
}

impl LambdaMode {
    pub fn enabled(&self) -> bool {
        matches!(self, LambdaMode::Enabled { .. })
    }

    pub fn max_recursion(&self) -> u32 {
        match self {
            LambdaMode::Enabled { max_recursion } => *max_recursion,
            LambdaMode::Disabled => 0,
        }
    }
}

/// Default recursion bound for lambda-returned templates.
pub const DEFAULT_MAX_RECURSION: u32 = 100;

/// What to do when a path fails to resolve against the context stack during
/// rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextMissPolicy {
    /// Render nothing (the Mustache spec's behavior).
    #[default]
    Empty,
    /// Abort rendering with `Error::ContextMiss` (useful in debug builds).
    Fail,
}

/// Options controlling the parser.
#[derive(Debug, Clone)]
pub struct ParserOptions {
    pub allow_redefine_delimiters: bool,
    pub preserve_line_breaks_and_indentation: bool,
    pub lambdas: LambdaMode,
    pub output: OutputMode,
    pub copy_strings: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            allow_redefine_delimiters: true,
            preserve_line_breaks_and_indentation: true,
            lambdas: LambdaMode::Disabled,
            output: OutputMode::Cache,
            copy_strings: false,
        }
    }
}

impl ParserOptions {
    pub fn with_lambdas(mut self, max_recursion: u32) -> Self {
        self.lambdas = LambdaMode::Enabled { max_recursion };
        self
    }

    pub fn with_copy_strings(mut self, copy: bool) -> Self {
        self.copy_strings = copy;
        self
    }

    pub fn without_standalone_trimming(mut self) -> Self {
        self.preserve_line_breaks_and_indentation = false;
        self
    }

    pub fn without_delimiter_redefinition(mut self) -> Self {
        self.allow_redefine_delimiters = false;
        self
    }
}

/// What to do when a `{{>partial}}` or `{{<parent}}` tag names a partial that
/// isn't in the supplied partials map, or when no partials map was supplied
/// at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartialMissPolicy {
    /// Render nothing (the Mustache spec's behavior).
    #[default]
    Empty,
    /// Abort rendering with `Error::PartialsDisabled` / `Error::PartialNotFound`.
    Fail,
}

/// Options controlling the renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub context_misses: ContextMissPolicy,
    pub partial_misses: PartialMissPolicy,
}

impl RenderOptions {
    pub fn failing_on_context_miss() -> Self {
        RenderOptions {
            context_misses: ContextMissPolicy::Fail,
            ..Default::default()
        }
    }

    pub fn failing_on_partial_miss() -> Self {
        RenderOptions {
            partial_misses: PartialMissPolicy::Fail,
            ..Default::default()
        }
    }
}
