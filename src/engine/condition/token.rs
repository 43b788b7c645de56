// SPDX-License-Identifier: MIT

//! Token tree for condition expressions

/// Operator markers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// &&
    And,
    /// ||
    Or,
    /// !
    Not,
    /// , (function argument separator)
    Comma,
}

/// A single token; parenthesized groups nest in place
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Bare identifier, usually a reference to another item
    Identifier(String),
    /// Double-quoted string literal, quotes and escapes kept intact
    Literal(String),
    /// Operator marker
    Operator(Operator),
    /// Parenthesized group
    Group(Vec<Token>),
}

/// A tokenized expression
pub type TokenTree = Vec<Token>;

/// Deepest parenthesis nesting accepted in an expression
pub const MAX_NESTING: usize = 256;

impl Token {
    /// Anything that can stand where a value is expected
    pub fn is_operand(&self) -> bool {
        !matches!(self, Token::Operator(_))
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operator::And => write!(f, "&&"),
            Operator::Or => write!(f, "||"),
            Operator::Not => write!(f, "!"),
            Operator::Comma => write!(f, ","),
        }
    }
}
