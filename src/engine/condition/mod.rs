// SPDX-License-Identifier: MIT

//! Condition expressions controlling item visibility
//!
//! Conditions are boolean expressions over item ids:
//! - `q1 && !q2`
//! - `(q3/yes || q4) && ^q5`
//! - `matches(q6/value, "^[0-9]+$")`

mod evaluator;
mod functions;
mod token;
mod tokenizer;

pub use evaluator::{evaluate, Resolver, Value};
pub use functions::{unquote, Function};
pub use token::{Operator, Token, TokenTree, MAX_NESTING};
pub use tokenizer::tokenize;

use crate::engine::error::ExpressionError;

/// Tokenize and evaluate in one step
pub fn evaluate_str<R>(expression: &str, resolver: &mut R) -> Result<Value, ExpressionError>
where
    R: Resolver + ?Sized,
{
    evaluate(&tokenize(expression)?, resolver)
}
