//! Expression engines.
//!
//! A template hands the source of every `{{ }}` expression and `{{var}}` binding to an
//! [`ExpressionEngine`] once, at compile time. The engine returns an [`Evaluator`] which
//! the rendered program calls every time it runs. [`DefaultEngine`] implements a small
//! JavaScript flavoured language; hosts can swap in their own.

mod eval;
mod lexer;
mod parser;

use serde_json::Value;

use crate::error::{EvalError, ExpressionError};
use crate::scope::Scope;

/// A compiled expression, evaluated against the bindings of a render call.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, scope: &Scope<'_>) -> Result<Value, EvalError>;
}

impl<F> Evaluator for F
where
    F: Fn(&Scope<'_>) -> Result<Value, EvalError> + Send + Sync,
{
    fn evaluate(&self, scope: &Scope<'_>) -> Result<Value, EvalError> {
        self(scope)
    }
}

/// Turns expression source into an [`Evaluator`].
pub trait ExpressionEngine: Send + Sync {
    fn compile(&self, source: &str) -> Result<Box<dyn Evaluator>, ExpressionError>;
}

/// The built-in expression language.
///
/// Supports literals, names, `.field` and `[key]` access, `!` and unary `-`, the
/// arithmetic, comparison and logical operators, and `cond ? a : b`. Names and fields
/// that are not bound evaluate to `null`.
///
/// ```rust
/// use serde_json::json;
/// use strata::{DefaultEngine, Evaluator, ExpressionEngine, Scope};
///
/// let evaluator = DefaultEngine.compile("items.length > 1 ? 'many' : 'one'").unwrap();
/// let mut scope = Scope::default();
/// scope.set("items", json!([1, 2]));
/// assert_eq!(evaluator.evaluate(&scope).unwrap(), json!("many"));
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultEngine;

impl Evaluator for parser::Expr {
    fn evaluate(&self, scope: &Scope<'_>) -> Result<Value, EvalError> {
        eval::evaluate(self, scope)
    }
}

impl ExpressionEngine for DefaultEngine {
    fn compile(&self, source: &str) -> Result<Box<dyn Evaluator>, ExpressionError> {
        Ok(Box::new(parser::parse(source.trim())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn functions_are_evaluators() {
        fn double(scope: &Scope<'_>) -> Result<Value, EvalError> {
            let n = scope.get("n").and_then(Value::as_i64).unwrap_or(0);
            Ok(json!(n * 2))
        }
        let mut scope = Scope::default();
        scope.set("n", json!(21));
        assert_eq!(double.evaluate(&scope).unwrap(), json!(42));
    }

    #[test]
    fn default_engine_compiles_once_and_evaluates_many() {
        let evaluator = DefaultEngine.compile(" greeting + ', ' + name ").unwrap();
        let mut scope = Scope::default();
        scope.set("greeting", json!("hi"));
        scope.set("name", json!("a"));
        assert_eq!(evaluator.evaluate(&scope).unwrap(), json!("hi, a"));
        scope.set("name", json!("b"));
        assert_eq!(evaluator.evaluate(&scope).unwrap(), json!("hi, b"));
    }

    #[test]
    fn default_engine_reports_offsets() {
        let Err(err) = DefaultEngine.compile("a +* b") else {
            panic!("expected an error");
        };
        assert_eq!(err.offset, 3);
        assert_eq!(err.expression, "a +* b");
    }
}
