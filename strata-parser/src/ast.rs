//! Parsed template nodes
//!
//! A template parses to an ordered `Vec<Node>`. Nodes are immutable once produced;
//! the compiler walks them in order and never rewrites them.

use std::fmt::Display;
use std::str::FromStr;

use crate::error::ParseError;

/// How a definition merges with the block it targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Replace the block's own content
    #[default]
    Override,
    /// Render the block's own content, then the definition
    Append,
    /// Render the definition in place of the block's content
    Prepend,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Override => "override",
            Mode::Append => "append",
            Mode::Prepend => "prepend",
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "override" => Ok(Mode::Override),
            "append" => Ok(Mode::Append),
            "prepend" => Ok(Mode::Prepend),
            other => Err(ParseError {
                message: format!("unknown mode {other}, expected override, append or prepend"),
                position: None,
            }),
        }
    }
}

/// A named body that targets a block of the same name
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub name: String,
    pub mode: Mode,
    pub nodes: Vec<Node>,
}

/// One parsed unit of a template
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, copied to the output unchanged
    Text(String),
    /// `{{#def name mode}}…{{/def}}`
    Definition(Definition),
    /// `{{#block name}}…{{/block}}`, the body is the default content
    Block { name: String, nodes: Vec<Node> },
    /// `{{#include "file"}}…{{/include}}` or `{{> file}}`
    Include {
        file: String,
        overrides: Vec<Definition>,
    },
    /// `{{ expr }}`, `{{{ expr }}}` or `{{do expr}}`
    Expression {
        source: String,
        buffered: bool,
        escape: bool,
    },
    /// `{{var name = expr}}`
    Var { name: String, source: String },
}

impl Node {
    /// Short tag naming the node kind, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Text(_) => "text",
            Node::Definition(_) => "def",
            Node::Block { .. } => "block",
            Node::Include { .. } => "include",
            Node::Expression { .. } => "expr",
            Node::Var { .. } => "var",
        }
    }
}
