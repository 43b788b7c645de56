// SPDX-License-Identifier: MIT

//! Template schema
//!
//! A template is either `{"questionnaire": [...]}` or a bare array of item
//! descriptors. Descriptors nest through `items`; groups list their
//! choices as single-entry `{id: text}` objects.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Top-level template document
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TemplateDocument {
    Wrapped { questionnaire: Vec<ItemDescriptor> },
    Bare(Vec<ItemDescriptor>),
}

impl TemplateDocument {
    pub fn items(&self) -> &[ItemDescriptor] {
        match self {
            TemplateDocument::Wrapped { questionnaire } => questionnaire,
            TemplateDocument::Bare(items) => items,
        }
    }
}

/// One item as written in a template
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDescriptor {
    /// Item kind, e.g. "block" or "radiogroup"
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub id: Option<String>,
    pub text: Option<String>,
    /// Condition expression
    pub cond: Option<String>,
    pub auth: Option<String>,
    pub class_name: Option<String>,
    /// Children of a block
    pub items: Option<Vec<ItemDescriptor>>,
    /// Choices of a group
    pub choices: Option<Vec<BTreeMap<String, String>>>,
    /// Append a "none of the above" choice to a group
    #[serde(default)]
    pub default_choice: bool,
    /// Tip clarification label; present means the tip takes an answer
    pub clarification: Option<Value>,
    /// Everything else (`required`, `placeholder`, `warn`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
