//! # stache
//!
//! A runtime-loaded [**`{{ mustache }}`**](https://mustache.github.io/)
//! templating engine.
//!
//! **stache** parses templates at runtime and renders them against native
//! Rust data structures via a small, object-safe [`Content`] trait — derive
//! it for ordinary structs, or implement it by hand for anything else
//! (a dynamically typed value tree, a lookup adapter, a lambda).
//!
//! ```rust
//! use stache::{Template, Content};
//!
//! #[derive(Content)]
//! struct Post<'a> {
//!     title: &'a str,
//!     body: &'a str,
//! }
//!
//! let tpl = Template::new("<h1>{{title}}</h1><div>{{body}}</div>").unwrap();
//!
//! let rendered = tpl.render(&Post {
//!     title: "Hello stache",
//!     body: "Well, that was easy!",
//! });
//!
//! assert_eq!(rendered, "<h1>Hello stache</h1><div>Well, that was easy!</div>");
//! ```

mod arena;
mod content;
mod delimiters;
mod element;
mod encoding;
mod error;
mod lambda;
mod options;
mod parser;
mod partials;
mod path;
mod render;
mod scanner;
pub mod stream;
mod template;

#[cfg(feature = "json")]
mod value;

pub use content::Content;
pub use delimiters::Delimiters;
pub use encoding::{Encoder, IoEncoder};
pub use error::{Error, ErrorKind, Result};
pub use lambda::{Lambda, LambdaContext};
pub use options::{
    ContextMissPolicy, LambdaMode, OutputMode, ParserOptions, PartialMissPolicy, RenderOptions,
};
pub use partials::Partials;
pub use path::Segment;
pub use render::{Section, Stack};
pub use template::{Template, Templates};

#[cfg(feature = "json")]
pub use value::Value;

#[cfg(feature = "export_derive")]
pub use stache_derive::Content;
