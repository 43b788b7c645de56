// SPDX-License-Identifier: MIT

//! Typed error handling for vsaq-rs
//!
//! Three layers, innermost first:
//! - `ExpressionError` - malformed condition syntax or unresolvable references
//! - `ParseError` - structural problems in a questionnaire template
//! - `QuestionnaireError` - everything the questionnaire aggregate can report

use thiserror::Error;

/// Errors raised while tokenizing or evaluating a condition expression
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    /// Grammar violation found by the tokenizer
    #[error("Invalid expression at offset {offset}: {reason}")]
    Syntax { offset: usize, reason: String },

    /// A reference inside the conditions of `item` could not be resolved
    #[error("Invalid expression in conditions of '{item}': {reason}")]
    Reference { item: String, reason: String },

    /// Operands and operators do not line up during evaluation
    #[error("Invalid expression: {0}")]
    Evaluation(String),
}

impl ExpressionError {
    pub fn syntax(offset: usize, reason: impl Into<String>) -> Self {
        Self::Syntax {
            offset,
            reason: reason.into(),
        }
    }

    pub fn reference(item: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Reference {
            item: item.into(),
            reason: reason.into(),
        }
    }

    pub fn evaluation(reason: impl Into<String>) -> Self {
        Self::Evaluation(reason.into())
    }
}

/// Template structure errors, fatal to loading
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// No parser registered for the item type
    #[error("Unknown item type: {0}")]
    UnknownType(String),

    /// A mandatory field is absent
    #[error("Item '{item}' is missing mandatory field '{field}'")]
    MissingField { item: String, field: String },

    /// A field is present but holds an unusable value
    #[error("Item '{item}' has an invalid '{field}': {value}")]
    InvalidField {
        item: String,
        field: String,
        value: String,
    },

    /// Two items share the same id
    #[error("Duplicate item id: {0}")]
    DuplicateId(String),

    /// Children declared on an item type that cannot hold any
    #[error("Item '{item}' of type {item_type} cannot contain child items")]
    UnexpectedChildren { item: String, item_type: String },

    /// Child of the wrong type inside a choice group
    #[error("Item '{item}' of type {found} cannot appear in '{parent}', expected {expected}")]
    UnexpectedChild {
        parent: String,
        item: String,
        expected: String,
        found: String,
    },

    /// Moving an item would break the tree shape
    #[error("Cannot move item '{item}': {reason}")]
    InvalidMove { item: String, reason: String },
}

impl ParseError {
    pub fn missing_field(item: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            item: item.into(),
            field: field.into(),
        }
    }
}

/// Top-level error type for the questionnaire
#[derive(Debug, Error)]
pub enum QuestionnaireError {
    /// Conditions of an item failed to evaluate during a visibility pass
    #[error("Invalid conditions on item '{item}': {source}")]
    Condition {
        item: String,
        #[source]
        source: ExpressionError,
    },

    /// Expression errors raised outside a visibility pass
    #[error(transparent)]
    Expression(#[from] ExpressionError),

    /// Template loading errors
    #[error("Template error: {0}")]
    Parse(#[from] ParseError),

    /// Answer addressed to an id that is not in the questionnaire
    #[error("Item '{id}' not found")]
    UnknownItem { id: String },

    /// Answer addressed to an item that holds no value
    #[error("Item '{id}' does not hold an answer")]
    NotAnswerable { id: String },

    /// Answer addressed to a read-only item
    #[error("Item '{id}' is read-only")]
    ReadOnly { id: String },

    /// Value rejected by the item kind (e.g. "maybe" for a yes/no item)
    #[error("Invalid value {value:?} for item '{id}'")]
    InvalidValue { id: String, value: String },

    /// Configuration errors (invalid env vars, bad flags)
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl QuestionnaireError {
    pub fn condition(item: impl Into<String>, source: ExpressionError) -> Self {
        Self::Condition {
            item: item.into(),
            source,
        }
    }

    pub fn unknown_item(id: impl Into<String>) -> Self {
        Self::UnknownItem { id: id.into() }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
