use serde_json::{Number, Value};

use super::parser::{BinOp, Expr};
use crate::error::{EvalError, type_name};
use crate::runtime::to_output;
use crate::scope::Scope;

type Result<T> = std::result::Result<T, EvalError>;

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn require_number(value: &Value) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| EvalError::type_error("number", value))
}

fn number(result: f64) -> Result<Value> {
    if !result.is_finite() {
        return Err(EvalError::Arithmetic(format!("non-finite result {result}")));
    }
    if result.fract() == 0.0 && result.abs() < MAX_SAFE_INTEGER {
        return Ok(Value::from(result as i64));
    }
    Number::from_f64(result)
        .map(Value::Number)
        .ok_or_else(|| EvalError::Arithmetic(format!("non-finite result {result}")))
}

fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn compare(op: BinOp, left: &Value, right: &Value) -> Result<bool> {
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64().partial_cmp(&b.as_f64()),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => {
            return Err(EvalError::Type(format!(
                "cannot compare {} with {}",
                type_name(left),
                type_name(right)
            )));
        }
    };
    let Some(ordering) = ordering else {
        return Ok(false);
    };
    Ok(match op {
        BinOp::Lt => ordering.is_lt(),
        BinOp::LtEq => ordering.is_le(),
        BinOp::Gt => ordering.is_gt(),
        _ => ordering.is_ge(),
    })
}

fn arithmetic(op: BinOp, left: &Value, right: &Value) -> Result<Value> {
    if op == BinOp::Add {
        if let (Value::Number(a), Value::Number(b)) = (left, right) {
            return number(a.as_f64().unwrap_or(f64::NAN) + b.as_f64().unwrap_or(f64::NAN));
        }
        let mut text = to_output(left).into_owned();
        text.push_str(&to_output(right));
        return Ok(Value::String(text));
    }
    let a = require_number(left)?;
    let b = require_number(right)?;
    match op {
        BinOp::Sub => number(a - b),
        BinOp::Mul => number(a * b),
        BinOp::Div | BinOp::Rem if b == 0.0 => {
            Err(EvalError::Arithmetic("division by zero".to_string()))
        }
        BinOp::Div => number(a / b),
        _ => number(a % b),
    }
}

fn member(target: &Value, field: &str) -> Value {
    match target {
        Value::Object(map) => map.get(field).cloned().unwrap_or(Value::Null),
        Value::Array(items) if field == "length" => Value::from(items.len()),
        Value::String(s) if field == "length" => Value::from(s.chars().count()),
        _ => Value::Null,
    }
}

fn index(target: &Value, key: &Value) -> Value {
    match (target, key) {
        (Value::Array(items), Value::Number(n)) => n
            .as_u64()
            .and_then(|i| items.get(i as usize))
            .cloned()
            .unwrap_or(Value::Null),
        (_, Value::String(field)) => member(target, field),
        _ => Value::Null,
    }
}

pub(crate) fn evaluate(expr: &Expr, scope: &Scope<'_>) -> Result<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Name(name) => Ok(scope.get(name).cloned().unwrap_or(Value::Null)),
        Expr::Member(target, field) => Ok(member(&evaluate(target, scope)?, field)),
        Expr::Index(target, key) => {
            let target = evaluate(target, scope)?;
            Ok(index(&target, &evaluate(key, scope)?))
        }
        Expr::Not(inner) => Ok(Value::Bool(!truthy(&evaluate(inner, scope)?))),
        Expr::Neg(inner) => number(-require_number(&evaluate(inner, scope)?)?),
        Expr::Conditional {
            condition,
            then,
            otherwise,
        } => {
            if truthy(&evaluate(condition, scope)?) {
                evaluate(then, scope)
            } else {
                evaluate(otherwise, scope)
            }
        }
        Expr::Binary { left, op, right } => {
            let left = evaluate(left, scope)?;
            match op {
                BinOp::And if !truthy(&left) => return Ok(left),
                BinOp::Or if truthy(&left) => return Ok(left),
                BinOp::And | BinOp::Or => return evaluate(right, scope),
                _ => {}
            }
            let right = evaluate(right, scope)?;
            match op {
                BinOp::Eq => Ok(Value::Bool(equals(&left, &right))),
                BinOp::NotEq => Ok(Value::Bool(!equals(&left, &right))),
                BinOp::Lt | BinOp::LtEq | BinOp::Gt | BinOp::GtEq => {
                    compare(*op, &left, &right).map(Value::Bool)
                }
                _ => arithmetic(*op, &left, &right),
            }
        }
    }
}
