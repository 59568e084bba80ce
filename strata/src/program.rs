//! The intermediate program a compile produces, and the interpreter that runs it.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{EvalError, RenderError, type_name};
use crate::expression::Evaluator;
use crate::runtime::{escape_html, to_output};
use crate::scope::Scope;

/// One operation of a compiled program.
///
/// Expressions are referenced by their index in the expression table of the compile
/// that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Append literal text to the output
    Text(String),
    /// Evaluate an expression and append its output, HTML escaped when `escape` is set
    Emit { index: usize, escape: bool },
    /// Evaluate an expression and discard the result
    Eval(usize),
    /// Evaluate an expression and bind the result in the current scope
    Assign { name: String, index: usize },
    /// Run the inner operations in a nested scope
    Scoped(Vec<Op>),
}

/// Merges runs of adjacent text and drops empty text, at every nesting level.
pub(crate) fn coalesce(ops: Vec<Op>) -> Vec<Op> {
    let mut merged: Vec<Op> = Vec::with_capacity(ops.len());
    for op in ops {
        match op {
            Op::Text(text) if text.is_empty() => (),
            Op::Text(text) => match merged.last_mut() {
                Some(Op::Text(previous)) => previous.push_str(&text),
                _ => merged.push(Op::Text(text)),
            },
            Op::Scoped(body) => merged.push(Op::Scoped(coalesce(body))),
            op => merged.push(op),
        }
    }
    merged
}

struct Program {
    ops: Vec<Op>,
    expressions: Vec<Box<dyn Evaluator>>,
}

impl Program {
    fn run(&self, ops: &[Op], scope: &mut Scope<'_>, out: &mut String) -> Result<(), EvalError> {
        for op in ops {
            match op {
                Op::Text(text) => out.push_str(text),
                Op::Emit { index, escape } => {
                    let value = self.expressions[*index].evaluate(scope)?;
                    let text = to_output(&value);
                    if *escape {
                        out.push_str(&escape_html(&text));
                    } else {
                        out.push_str(&text);
                    }
                }
                Op::Eval(index) => {
                    self.expressions[*index].evaluate(scope)?;
                }
                Op::Assign { name, index } => {
                    let value = self.expressions[*index].evaluate(scope)?;
                    scope.set(name.as_str(), value);
                }
                Op::Scoped(body) => {
                    let mut inner = scope.nested();
                    self.run(body, &mut inner, out)?;
                }
            }
        }
        Ok(())
    }
}

/// A compiled template, ready to render.
///
/// Cloning is cheap and clones share the program. A renderer holds no reference to the
/// compile that built it and can be used from many threads at once; each call gets its
/// own output buffer and top-level scope.
#[derive(Clone)]
pub struct Renderer {
    program: Arc<Program>,
}

impl Renderer {
    pub(crate) fn assemble(ops: Vec<Op>, expressions: Vec<Box<dyn Evaluator>>) -> Self {
        Renderer {
            program: Arc::new(Program {
                ops: coalesce(ops),
                expressions,
            }),
        }
    }

    /// Renders with `bindings` as the top-level scope.
    ///
    /// `bindings` must be a JSON object, or `null` for no bindings.
    pub fn render(&self, bindings: &Value) -> Result<String, RenderError> {
        let empty = Map::new();
        let bindings = match bindings {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => return Err(RenderError::Bindings(type_name(other))),
        };
        let mut scope = Scope::over(bindings);
        let mut out = String::new();
        self.program.run(&self.program.ops, &mut scope, &mut out)?;
        Ok(out)
    }

    /// Renders with no bindings
    pub fn render_default(&self) -> Result<String, RenderError> {
        self.render(&Value::Null)
    }

    /// The assembled operations
    pub fn ops(&self) -> &[Op] {
        &self.program.ops
    }

    pub fn expression_count(&self) -> usize {
        self.program.expressions.len()
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("ops", &self.program.ops)
            .field("expressions", &self.program.expressions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lookup(name: &'static str) -> Box<dyn Evaluator> {
        Box::new(move |scope: &Scope<'_>| -> Result<Value, EvalError> {
            Ok(scope.get(name).cloned().unwrap_or(Value::Null))
        })
    }

    fn constant(value: Value) -> Box<dyn Evaluator> {
        Box::new(move |_: &Scope<'_>| -> Result<Value, EvalError> { Ok(value.clone()) })
    }

    #[test]
    fn coalesce_merges_text_at_every_level() {
        let ops = vec![
            Op::Text("a".to_string()),
            Op::Text(String::new()),
            Op::Text("b".to_string()),
            Op::Scoped(vec![Op::Text("c".to_string()), Op::Text("d".to_string())]),
            Op::Eval(0),
            Op::Text("e".to_string()),
        ];
        assert_eq!(
            coalesce(ops),
            vec![
                Op::Text("ab".to_string()),
                Op::Scoped(vec![Op::Text("cd".to_string())]),
                Op::Eval(0),
                Op::Text("e".to_string()),
            ]
        );
    }

    #[test]
    fn scoped_assignments_do_not_leak() {
        let renderer = Renderer::assemble(
            vec![
                Op::Assign { name: "name".to_string(), index: 1 },
                Op::Scoped(vec![
                    Op::Assign { name: "name".to_string(), index: 2 },
                    Op::Emit { index: 0, escape: true },
                ]),
                Op::Emit { index: 0, escape: true },
            ],
            vec![lookup("name"), constant(json!("outer")), constant(json!("inner"))],
        );
        assert_eq!(renderer.render_default().unwrap(), "innerouter");
    }

    #[test]
    fn top_level_assignments_shadow_bindings_for_one_render() {
        let renderer = Renderer::assemble(
            vec![
                Op::Emit { index: 0, escape: false },
                Op::Assign { name: "name".to_string(), index: 1 },
                Op::Emit { index: 0, escape: false },
            ],
            vec![lookup("name"), constant(json!("set"))],
        );
        let bindings = json!({"name": "given"});
        assert_eq!(renderer.render(&bindings).unwrap(), "givenset");
        assert_eq!(renderer.render(&bindings).unwrap(), "givenset");
        assert_eq!(bindings, json!({"name": "given"}));
    }

    #[test]
    fn emit_escapes_on_request() {
        let renderer = Renderer::assemble(
            vec![
                Op::Emit { index: 0, escape: true },
                Op::Text("|".to_string()),
                Op::Emit { index: 0, escape: false },
            ],
            vec![lookup("html")],
        );
        assert_eq!(
            renderer.render(&json!({"html": "<b>"})).unwrap(),
            "&lt;b&gt;|<b>"
        );
    }

    #[test]
    fn bindings_must_be_an_object() {
        let renderer = Renderer::assemble(vec![Op::Text("x".to_string())], Vec::new());
        assert_eq!(renderer.render(&json!({})).unwrap(), "x");
        assert!(matches!(
            renderer.render(&json!([1])),
            Err(RenderError::Bindings("array"))
        ));
    }

    #[test]
    fn evaluator_failures_propagate() {
        let failing: Box<dyn Evaluator> = Box::new(|_: &Scope<'_>| -> Result<Value, EvalError> {
            Err(EvalError::Custom("boom".to_string()))
        });
        let renderer = Renderer::assemble(vec![Op::Eval(0)], vec![failing]);
        assert!(matches!(
            renderer.render_default(),
            Err(RenderError::Eval(EvalError::Custom(message))) if message == "boom"
        ));
    }
}
