//! Condition expression tokenizer
//!
//! Splits a condition string into a nested token tree:
//! - `q1 && !q2`
//! - `(q1 || q2) && q3/yes`
//! - `matches(q4/value, "^[0-9]+$")`

use super::token::{Operator, Token, TokenTree, MAX_NESTING};
use crate::engine::error::ExpressionError;
use std::iter::Peekable;
use std::str::CharIndices;

/// Tokenize a condition expression. An empty string yields an empty tree.
pub fn tokenize(expression: &str) -> Result<TokenTree, ExpressionError> {
    let mut tokenizer = Tokenizer {
        input: expression,
        chars: expression.char_indices().peekable(),
        depth: 0,
    };
    tokenizer.group(None)
}

struct Tokenizer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    /// Groups currently open
    depth: usize,
}

impl<'a> Tokenizer<'a> {
    /// Read tokens until the end of input, or until the `)` closing the
    /// group opened at `opened_at`.
    fn group(&mut self, opened_at: Option<usize>) -> Result<TokenTree, ExpressionError> {
        let mut tokens = Vec::new();

        while let Some((offset, c)) = self.chars.next() {
            match c {
                c if c.is_whitespace() => {}
                '(' => {
                    if self.depth >= MAX_NESTING {
                        return Err(ExpressionError::syntax(offset, "nesting too deep"));
                    }
                    self.depth += 1;
                    let inner = self.group(Some(offset))?;
                    self.depth -= 1;
                    push_operand(&mut tokens, Token::Group(inner), offset)?;
                }
                ')' => {
                    if opened_at.is_none() {
                        return Err(ExpressionError::syntax(offset, "unmatched ')'"));
                    }
                    check_group_end(&tokens, offset)?;
                    return Ok(tokens);
                }
                '&' | '|' => {
                    if self.chars.next_if(|&(_, next)| next == c).is_none() {
                        return Err(ExpressionError::syntax(
                            offset,
                            format!("expected '{c}{c}'"),
                        ));
                    }
                    let op = if c == '&' { Operator::And } else { Operator::Or };
                    push_binary(&mut tokens, op, offset)?;
                }
                ',' => push_binary(&mut tokens, Operator::Comma, offset)?,
                '!' => {
                    if tokens.last().is_some_and(Token::is_operand) {
                        return Err(ExpressionError::syntax(
                            offset,
                            "'!' must precede an operand",
                        ));
                    }
                    tokens.push(Token::Operator(Operator::Not));
                }
                '"' => {
                    let literal = self.literal(offset)?;
                    push_operand(&mut tokens, Token::Literal(literal), offset)?;
                }
                _ => {
                    let identifier = self.identifier(offset);
                    push_operand(&mut tokens, Token::Identifier(identifier), offset)?;
                }
            }
        }

        if let Some(open) = opened_at {
            return Err(ExpressionError::syntax(open, "unmatched '('"));
        }
        check_group_end(&tokens, self.input.len())?;
        Ok(tokens)
    }

    /// Consume a string literal whose opening quote sits at `start`.
    fn literal(&mut self, start: usize) -> Result<String, ExpressionError> {
        while let Some((offset, c)) = self.chars.next() {
            match c {
                '\\' => {
                    if self.chars.next().is_none() {
                        break;
                    }
                }
                '"' => return Ok(self.input[start..=offset].to_string()),
                _ => {}
            }
        }
        Err(ExpressionError::syntax(start, "unterminated string literal"))
    }

    /// Consume an identifier whose first character sits at `start`.
    fn identifier(&mut self, start: usize) -> String {
        let mut end = self.input.len();
        while let Some(&(offset, c)) = self.chars.peek() {
            if c.is_whitespace() || is_reserved(c) {
                end = offset;
                break;
            }
            self.chars.next();
        }
        self.input[start..end].to_string()
    }
}

fn is_reserved(c: char) -> bool {
    matches!(c, '&' | '|' | '!' | '(' | ')' | ',' | '"')
}

fn push_operand(tokens: &mut TokenTree, token: Token, offset: usize) -> Result<(), ExpressionError> {
    match tokens.last() {
        None | Some(Token::Operator(_)) => {}
        // function call: `matches(...)`
        Some(Token::Identifier(_)) if matches!(token, Token::Group(_)) => {}
        Some(_) => {
            return Err(ExpressionError::syntax(
                offset,
                "missing operator between operands",
            ))
        }
    }
    tokens.push(token);
    Ok(())
}

fn push_binary(tokens: &mut TokenTree, op: Operator, offset: usize) -> Result<(), ExpressionError> {
    if !tokens.last().is_some_and(Token::is_operand) {
        return Err(ExpressionError::syntax(
            offset,
            format!("'{op}' without a left operand"),
        ));
    }
    tokens.push(Token::Operator(op));
    Ok(())
}

fn check_group_end(tokens: &TokenTree, offset: usize) -> Result<(), ExpressionError> {
    match tokens.last() {
        Some(Token::Operator(op)) => Err(ExpressionError::syntax(
            offset,
            format!("'{op}' without a right operand"),
        )),
        _ => Ok(()),
    }
}
