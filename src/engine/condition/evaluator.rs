//! Condition expression evaluator
//!
//! Each group is reduced in four left-to-right passes: resolution, negation,
//! function calls, then a fold of `&&` / `||` with no precedence between
//! them. `a || b && c` therefore means `(a || b) && c`.

use super::functions::{unquote, Function};
use super::token::{Operator, Token, MAX_NESTING};
use crate::engine::error::ExpressionError;

/// Result of evaluating an expression or resolving a reference
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    /// Raw answer text, produced by `/value` references and literals
    Str(String),
    /// Comma-separated operands, used as function arguments
    List(Vec<Value>),
    Function(Function),
}

impl Value {
    /// Loose truthiness: empty strings are false, lists and functions are true
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Str(s) => !s.is_empty(),
            Value::List(_) | Value::Function(_) => true,
        }
    }

    /// Text form used for function arguments
    pub fn to_text(&self) -> String {
        match self {
            Value::Bool(b) => b.to_string(),
            Value::Str(s) => s.clone(),
            Value::List(items) => items
                .iter()
                .map(Value::to_text)
                .collect::<Vec<_>>()
                .join(","),
            Value::Function(f) => f.name().to_string(),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

/// Maps an identifier to its current value
pub trait Resolver {
    fn resolve(&mut self, reference: &str) -> Result<Value, ExpressionError>;
}

impl<F> Resolver for F
where
    F: FnMut(&str) -> Result<Value, ExpressionError>,
{
    fn resolve(&mut self, reference: &str) -> Result<Value, ExpressionError> {
        self(reference)
    }
}

/// Intermediate form between passes
#[derive(Debug)]
enum Operand {
    Value(Value),
    Literal(String),
    Operator(Operator),
}

impl Operand {
    fn into_value(self) -> Option<Value> {
        match self {
            Operand::Value(v) => Some(v),
            Operand::Literal(raw) => Some(Value::Str(unquote(&raw))),
            Operand::Operator(_) => None,
        }
    }
}

/// Evaluate a token tree. An empty tree evaluates to `true`.
pub fn evaluate<R>(tokens: &[Token], resolver: &mut R) -> Result<Value, ExpressionError>
where
    R: Resolver + ?Sized,
{
    evaluate_group(tokens, resolver, 0)
}

fn evaluate_group<R>(tokens: &[Token], resolver: &mut R, depth: usize) -> Result<Value, ExpressionError>
where
    R: Resolver + ?Sized,
{
    if depth > MAX_NESTING {
        return Err(ExpressionError::evaluation("nesting too deep"));
    }
    if tokens.is_empty() {
        return Ok(Value::Bool(true));
    }

    let resolved = resolve_pass(tokens, resolver, depth)?;
    let negated = not_pass(resolved)?;
    let called = call_pass(negated)?;
    combine_pass(called)
}

fn resolve_pass<R>(
    tokens: &[Token],
    resolver: &mut R,
    depth: usize,
) -> Result<Vec<Operand>, ExpressionError>
where
    R: Resolver + ?Sized,
{
    tokens
        .iter()
        .map(|token| {
            Ok(match token {
                Token::Group(inner) => Operand::Value(evaluate_group(inner, resolver, depth + 1)?),
                Token::Literal(raw) => Operand::Literal(raw.clone()),
                Token::Operator(op) => Operand::Operator(*op),
                Token::Identifier(name) => match Function::lookup(name) {
                    Some(function) => Operand::Value(Value::Function(function)),
                    None => Operand::Value(resolver.resolve(name)?),
                },
            })
        })
        .collect()
}

fn not_pass(operands: Vec<Operand>) -> Result<Vec<Operand>, ExpressionError> {
    let mut result = Vec::with_capacity(operands.len());
    let mut pending = 0usize;

    for operand in operands {
        match operand {
            Operand::Operator(Operator::Not) => pending += 1,
            other if pending == 0 => result.push(other),
            Operand::Value(Value::Function(f)) => {
                return Err(ExpressionError::evaluation(format!(
                    "cannot negate {}() directly, wrap the call in parentheses",
                    f.name()
                )))
            }
            Operand::Operator(op) => {
                return Err(ExpressionError::evaluation(format!(
                    "'!' followed by '{op}'"
                )))
            }
            other => {
                let truthy = other.into_value().is_some_and(|v| v.is_truthy());
                let negated = if pending % 2 == 1 { !truthy } else { truthy };
                result.push(Operand::Value(Value::Bool(negated)));
                pending = 0;
            }
        }
    }

    if pending > 0 {
        return Err(ExpressionError::evaluation("'!' without an operand"));
    }
    Ok(result)
}

fn call_pass(operands: Vec<Operand>) -> Result<Vec<Operand>, ExpressionError> {
    let mut result = Vec::with_capacity(operands.len());
    let mut iter = operands.into_iter();

    while let Some(operand) = iter.next() {
        let Operand::Value(Value::Function(function)) = operand else {
            result.push(operand);
            continue;
        };
        let args = match iter.next().and_then(Operand::into_value) {
            Some(Value::List(items)) => items,
            Some(single) => vec![single],
            None => {
                return Err(ExpressionError::evaluation(format!(
                    "{}() is missing its arguments",
                    function.name()
                )))
            }
        };
        result.push(Operand::Value(function.call(&args)?));
    }

    Ok(result)
}

fn combine_pass(operands: Vec<Operand>) -> Result<Value, ExpressionError> {
    let mut collection = Vec::new();
    let mut current: Option<Value> = None;
    let mut pending: Option<Operator> = None;

    for operand in operands {
        if let Operand::Operator(op) = operand {
            if current.is_none() || pending.is_some() {
                return Err(ExpressionError::evaluation(format!(
                    "'{op}' without a left operand"
                )));
            }
            pending = Some(op);
            continue;
        }

        let Some(value) = operand.into_value() else {
            continue;
        };
        current = Some(match (current.take(), pending.take()) {
            (None, _) => value,
            (Some(_), None) => {
                return Err(ExpressionError::evaluation(
                    "missing operator between operands",
                ))
            }
            (Some(left), Some(Operator::And)) => {
                Value::Bool(left.is_truthy() && value.is_truthy())
            }
            (Some(left), Some(Operator::Or)) => Value::Bool(left.is_truthy() || value.is_truthy()),
            (Some(left), Some(Operator::Comma)) => {
                collection.push(left);
                value
            }
            (Some(_), Some(Operator::Not)) => {
                return Err(ExpressionError::evaluation("unexpected '!'"))
            }
        });
    }

    if let Some(op) = pending {
        return Err(ExpressionError::evaluation(format!(
            "'{op}' without a right operand"
        )));
    }

    let last = current.unwrap_or(Value::Bool(true));
    if collection.is_empty() {
        Ok(last)
    } else {
        collection.push(last);
        Ok(Value::List(collection))
    }
}
