//! Layered template compiler
//!
//! strata compiles a template, and every file it includes, into a [`Renderer`]: a small
//! program plus a table of compiled expressions that can be rendered any number of
//! times, from any number of threads.
//!
//! Templates share structure through blocks and definitions. A layout declares named
//! `block`s with default content; a page includes the layout and supplies `def`s that
//! replace (`override`), extend (`append`) or stand in for (`prepend`) those blocks.
//! Variables bound inside an included file stay inside it.
//!
//! ```rust
//! use serde_json::json;
//! use strata::{Compiler, MemoryLoader, Options};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let loader = MemoryLoader::new()
//!     .with("layout.html", "<title>{{#block title}}Site{{/block}}</title>")
//!     .with(
//!         "page.html",
//!         r#"{{#include "layout.html"}}{{#def title append}} | {{ page }}{{/def}}{{/include}}"#,
//!     );
//! let compiler = Compiler::new(Options::default()).with_loader(loader);
//! let renderer = compiler.compile("page.html").await.unwrap();
//! assert_eq!(
//!     renderer.render(&json!({"page": "About"})).unwrap(),
//!     "<title>Site | About</title>"
//! );
//! # }
//! ```

mod compiler;
pub mod error;
mod expression;
mod job;
mod loader;
pub mod path;
mod program;
pub mod runtime;
mod scope;

pub use compiler::{Compiler, DefaultParser, Options, TemplateParser, TemplateSet, compile_template};
pub use error::{CompileError, EvalError, ExpressionError, LoadError, RenderError};
pub use expression::{DefaultEngine, Evaluator, ExpressionEngine};
pub use loader::{FileLoader, Loader, MemoryLoader};
pub use program::{Op, Renderer};
pub use scope::Scope;
pub use strata_parser::{Definition, Mode, Node, ParseError};
