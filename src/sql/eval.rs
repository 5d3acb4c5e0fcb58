//! Row-level expression evaluation with SQL three-valued logic.

use std::cmp::Ordering;

use regex::Regex;

use super::command::{BinaryOp, Expr, UnaryOp};
use crate::db::Value;
use crate::error::{Result, SheetQlError};

/// The cells of one row, addressed by column name.
#[derive(Debug, Clone, Copy)]
pub struct RowScope<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> RowScope<'a> {
    pub fn new(columns: &'a [String], values: &'a [Value]) -> Self {
        Self { columns, values }
    }

    /// A scope with no columns, for constant expressions such as VALUES rows.
    pub fn empty() -> Self {
        Self {
            columns: &[],
            values: &[],
        }
    }

    fn get(&self, name: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .and_then(|i| self.values.get(i))
    }
}

/// Evaluates `expr` against one row.
pub fn evaluate(expr: &Expr, scope: RowScope<'_>) -> Result<Value> {
    match expr {
        Expr::Column(name) => scope
            .get(name)
            .cloned()
            .ok_or_else(|| SheetQlError::query(format!("Unknown column '{name}'"))),
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Unary { op, expr } => {
            let value = evaluate(expr, scope)?;
            match op {
                UnaryOp::Not => Ok(value.as_bool().map(|b| Value::Bool(!b)).unwrap_or_default()),
                UnaryOp::Neg => negate(value),
            }
        }
        Expr::Binary { left, op, right } => {
            let left = evaluate(left, scope)?;
            let right = evaluate(right, scope)?;
            binary(&left, *op, &right)
        }
        Expr::IsNull { expr, negated } => {
            let value = evaluate(expr, scope)?;
            Ok(Value::Bool(value.is_null() != *negated))
        }
        Expr::InList {
            expr,
            list,
            negated,
        } => {
            let value = evaluate(expr, scope)?;
            if value.is_null() {
                return Ok(Value::Null);
            }
            let mut saw_null = false;
            for item in list {
                match value.sql_cmp(&evaluate(item, scope)?) {
                    Some(Ordering::Equal) => return Ok(Value::Bool(!negated)),
                    None => saw_null = true,
                    Some(_) => {}
                }
            }
            if saw_null {
                Ok(Value::Null)
            } else {
                Ok(Value::Bool(*negated))
            }
        }
        Expr::Between {
            expr,
            low,
            high,
            negated,
        } => {
            let value = evaluate(expr, scope)?;
            let low = evaluate(low, scope)?;
            let high = evaluate(high, scope)?;
            let inside = and(
                value.sql_cmp(&low).map(|o| o != Ordering::Less),
                value.sql_cmp(&high).map(|o| o != Ordering::Greater),
            );
            Ok(truth(inside.map(|b| b != *negated)))
        }
        Expr::Like {
            expr,
            pattern,
            negated,
        } => {
            let value = evaluate(expr, scope)?;
            let pattern = evaluate(pattern, scope)?;
            if value.is_null() || pattern.is_null() {
                return Ok(Value::Null);
            }
            let regex = like_regex(&pattern.to_display_string())?;
            let matched = regex.is_match(&value.to_display_string());
            Ok(Value::Bool(matched != *negated))
        }
    }
}

/// True when the row satisfies the filter. NULL counts as not satisfied.
pub fn matches(filter: Option<&Expr>, scope: RowScope<'_>) -> Result<bool> {
    match filter {
        None => Ok(true),
        Some(expr) => Ok(evaluate(expr, scope)?.as_bool() == Some(true)),
    }
}

fn truth(value: Option<bool>) -> Value {
    value.map(Value::Bool).unwrap_or_default()
}

fn and(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

fn or(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

fn negate(value: Value) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Int(i) => Ok(i
            .checked_neg()
            .map(Value::Int)
            .unwrap_or(Value::Float(-(i as f64)))),
        Value::Float(f) => Ok(Value::Float(-f)),
        other => other
            .as_f64()
            .map(|f| Value::Float(-f))
            .ok_or_else(|| SheetQlError::query(format!("Cannot negate '{other}'"))),
    }
}

fn binary(left: &Value, op: BinaryOp, right: &Value) -> Result<Value> {
    let compare = |accept: fn(Ordering) -> bool| truth(left.sql_cmp(right).map(accept));

    match op {
        BinaryOp::And => Ok(truth(and(left.as_bool(), right.as_bool()))),
        BinaryOp::Or => Ok(truth(or(left.as_bool(), right.as_bool()))),
        BinaryOp::Eq => Ok(compare(|o| o == Ordering::Equal)),
        BinaryOp::NotEq => Ok(compare(|o| o != Ordering::Equal)),
        BinaryOp::Lt => Ok(compare(|o| o == Ordering::Less)),
        BinaryOp::LtEq => Ok(compare(|o| o != Ordering::Greater)),
        BinaryOp::Gt => Ok(compare(|o| o == Ordering::Greater)),
        BinaryOp::GtEq => Ok(compare(|o| o != Ordering::Less)),
        BinaryOp::Concat => {
            if left.is_null() || right.is_null() {
                Ok(Value::Null)
            } else {
                Ok(Value::String(format!("{left}{right}")))
            }
        }
        BinaryOp::Plus | BinaryOp::Minus | BinaryOp::Multiply | BinaryOp::Divide => {
            arithmetic(left, op, right)
        }
    }
}

fn arithmetic(left: &Value, op: BinaryOp, right: &Value) -> Result<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }

    // `+` on two pieces of text joins them.
    if let (BinaryOp::Plus, Value::String(a), Value::String(b)) = (op, left, right) {
        return Ok(Value::String(format!("{a}{b}")));
    }

    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        let exact = match op {
            BinaryOp::Plus => a.checked_add(*b),
            BinaryOp::Minus => a.checked_sub(*b),
            BinaryOp::Multiply => a.checked_mul(*b),
            _ => None,
        };
        if let Some(n) = exact {
            return Ok(Value::Int(n));
        }
    }

    let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
        return Err(SheetQlError::query(format!(
            "Cannot apply {} to '{left}' and '{right}'",
            symbol(op)
        )));
    };

    let result = match op {
        BinaryOp::Plus => a + b,
        BinaryOp::Minus => a - b,
        BinaryOp::Multiply => a * b,
        _ => {
            if b == 0.0 {
                return Err(SheetQlError::query("Division by zero"));
            }
            a / b
        }
    };
    Ok(Value::Float(result))
}

fn symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Plus => "+",
        BinaryOp::Minus => "-",
        BinaryOp::Multiply => "*",
        BinaryOp::Divide => "/",
        _ => "operator",
    }
}

/// Compiles a LIKE pattern: `%` is any run of characters, `_` any single one.
fn like_regex(pattern: &str) -> Result<Regex> {
    let mut source = String::from("(?is)^");
    for ch in pattern.chars() {
        match ch {
            '%' => source.push_str(".*"),
            '_' => source.push('.'),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
        }
    }
    source.push('$');
    Regex::new(&source)
        .map_err(|e| SheetQlError::query(format!("Invalid LIKE pattern '{pattern}': {e}")))
}
