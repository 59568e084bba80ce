// MIT License
//
// Copyright (c) 2024 Jerome Johnson
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Template parser for strata
//!
//! This crate turns template source into the ordered node sequence consumed by the
//! `strata` compiler. It knows nothing about loading files or evaluating expressions:
//! expression sources are kept as plain strings for the compiler's expression engine.
//!
//! # Syntax
//!
//! - `{{ expr }}` - output the HTML escaped value of an expression
//! - `{{{ expr }}}` - output the raw value of an expression
//! - `{{do expr}}` - evaluate an expression and discard the result
//! - `{{var name = expr}}` - bind a variable in the current scope
//! - `{{#block name}}…{{/block}}` - a named region with default content
//! - `{{#def name [override|append|prepend]}}…{{/def}}` - content for a block
//! - `{{#include "file"}}…{{/include}}` - include a file, with `def` overrides inside
//! - `{{> file}}` - include a file without overrides
//! - `{{! comment }}`, `\{{` and `{{{{raw}}}}…{{{{/raw}}}}`
//!
//! # Example
//!
//! ```rust
//! use strata_parser::{parse, Node};
//!
//! let nodes = parse("Hello {{ name }}!").unwrap();
//! assert_eq!(nodes.len(), 3);
//! assert_eq!(nodes[0], Node::Text("Hello ".to_string()));
//! ```

pub mod ast;
pub mod error;
mod parser;
pub mod tag;
pub mod token;

pub use ast::{Definition, Mode, Node};
pub use error::{ParseError, Position, Result};
pub use parser::parse;
