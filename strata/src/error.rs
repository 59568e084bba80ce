//! Error types for compiling and rendering templates.
//!
//! [`CompileError`] is the single error a compile request can end with. It wraps the
//! collaborator failure ([`LoadError`], [`ParseError`] or [`ExpressionError`]) together
//! with the resolved path of the template being processed, or reports an include cycle.
//! [`RenderError`] is produced
//! by a [`Renderer`](crate::Renderer) when bindings are unusable or an expression fails.

use serde_json::Value;
use strata_parser::ParseError;
use thiserror::Error;

/// A template could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("template not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Malformed expression source, reported at compile time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset} in `{expression}`")]
pub struct ExpressionError {
    pub message: String,
    pub offset: usize,
    pub expression: String,
}

impl ExpressionError {
    pub fn new(message: impl Into<String>, offset: usize, expression: &str) -> Self {
        Self {
            message: message.into(),
            offset,
            expression: expression.to_string(),
        }
    }
}

/// An expression failed while rendering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("type error: {0}")]
    Type(String),
    #[error("arithmetic error: {0}")]
    Arithmetic(String),
    /// Raised by host supplied evaluators.
    #[error("{0}")]
    Custom(String),
}

impl EvalError {
    pub fn type_error(expected: &str, got: &Value) -> Self {
        EvalError::Type(format!("expected {expected}, got {}", type_name(got)))
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The reason a compile request produced no renderer.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to load template `{path}`: {source}")]
    Load {
        path: String,
        #[source]
        source: LoadError,
    },
    #[error("failed to parse template `{path}`: {source}")]
    Parse {
        path: String,
        #[source]
        source: ParseError,
    },
    #[error("invalid expression in template `{path}`: {source}")]
    Expression {
        path: String,
        #[source]
        source: ExpressionError,
    },
    /// `path` includes itself, directly or through `chain`
    #[error("template `{path}` includes itself via {}", .chain.join(" -> "))]
    Cycle { path: String, chain: Vec<String> },
}

impl CompileError {
    /// Resolved path of the template that was being processed
    pub fn path(&self) -> &str {
        match self {
            CompileError::Load { path, .. }
            | CompileError::Parse { path, .. }
            | CompileError::Expression { path, .. }
            | CompileError::Cycle { path, .. } => path,
        }
    }
}

/// A render call failed.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("bindings must be an object or null, got {0}")]
    Bindings(&'static str),
    #[error("no template named `{0}`")]
    UnknownTemplate(String),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

pub type Result<T, E = CompileError> = std::result::Result<T, E>;
