// SPDX-License-Identifier: MIT

//! Questionnaire items
//!
//! Every item shares the same shape (id, conditions, visibility). Items that
//! carry an answer additionally hold an [`Answer`], which implements the
//! [`ValueItem`] capability.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::tree::ItemIndex;

/// Stored value of a checked check/radio item
pub const CHECKED: &str = "checked";
/// Stored values of a yes/no item
pub const YES: &str = "yes";
pub const NO: &str = "no";
/// Marker class that hides an item regardless of its conditions
pub const INVISIBLE_CLASS: &str = "vsaq-invisible";

/// Item kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Block,
    Line,
    Box,
    Check,
    Radio,
    YesNo,
    CheckGroup,
    RadioGroup,
    Upload,
    Tip,
    Info,
    Spacer,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Block => "block",
            ItemType::Line => "line",
            ItemType::Box => "box",
            ItemType::Check => "check",
            ItemType::Radio => "radio",
            ItemType::YesNo => "yesno",
            ItemType::CheckGroup => "checkgroup",
            ItemType::RadioGroup => "radiogroup",
            ItemType::Upload => "upload",
            ItemType::Tip => "tip",
            ItemType::Info => "info",
            ItemType::Spacer => "spacer",
        }
    }

    /// Block and both group kinds own children
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            ItemType::Block | ItemType::CheckGroup | ItemType::RadioGroup
        )
    }

    /// The only child kind a group accepts
    pub fn choice_type(&self) -> Option<ItemType> {
        match self {
            ItemType::CheckGroup => Some(ItemType::Check),
            ItemType::RadioGroup => Some(ItemType::Radio),
            _ => None,
        }
    }

    /// Free-text inputs whose changes are debounced
    pub fn is_high_frequency(&self) -> bool {
        matches!(self, ItemType::Line | ItemType::Box | ItemType::Tip)
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access restriction from the template's `auth` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Auth {
    /// Only shown in admin mode
    Admin,
    /// Never editable
    Readonly,
}

/// Answer-holding capability
pub trait ValueItem {
    /// Current value in its string encoding
    fn value(&self) -> String;

    /// Apply a value; returns false when the value is invalid for this kind
    fn set_value(&mut self, value: &str) -> bool;

    fn is_answered(&self) -> bool;

    /// Truth value of a reference to this item. `reference` is the full
    /// reference text, so yes/no items can tell `/yes` from `/no`.
    fn is_checked(&self, reference: &str) -> bool;
}

/// Stored answer of a value item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// line, box, upload, tip clarification
    Text(String),
    /// check, radio
    Choice(bool),
    /// yesno; `None` until answered
    YesNo(Option<bool>),
}

impl ValueItem for Answer {
    fn value(&self) -> String {
        match self {
            Answer::Text(text) => text.clone(),
            Answer::Choice(true) => CHECKED.to_string(),
            Answer::Choice(false) | Answer::YesNo(None) => String::new(),
            Answer::YesNo(Some(true)) => YES.to_string(),
            Answer::YesNo(Some(false)) => NO.to_string(),
        }
    }

    fn set_value(&mut self, value: &str) -> bool {
        match self {
            Answer::Text(text) => {
                *text = value.to_string();
                true
            }
            Answer::Choice(checked) => match value {
                CHECKED => {
                    *checked = true;
                    true
                }
                "" => {
                    *checked = false;
                    true
                }
                _ => false,
            },
            Answer::YesNo(answer) => match value {
                YES => {
                    *answer = Some(true);
                    true
                }
                NO => {
                    *answer = Some(false);
                    true
                }
                "" => {
                    *answer = None;
                    true
                }
                _ => false,
            },
        }
    }

    fn is_answered(&self) -> bool {
        match self {
            Answer::Text(text) => !text.is_empty(),
            Answer::Choice(checked) => *checked,
            Answer::YesNo(answer) => answer.is_some(),
        }
    }

    fn is_checked(&self, reference: &str) -> bool {
        match self {
            Answer::YesNo(answer) => {
                if reference.ends_with("/yes") {
                    *answer == Some(true)
                } else if reference.ends_with("/no") {
                    *answer == Some(false)
                } else {
                    answer.is_some()
                }
            }
            other => other.is_answered(),
        }
    }
}

/// A node in the questionnaire tree
#[derive(Debug, Clone)]
pub struct Item {
    pub id: String,
    pub item_type: ItemType,
    /// Condition expression; empty means always visible
    pub conditions: String,
    pub text: String,
    pub auth: Option<Auth>,
    pub class_name: String,
    /// Template fields only renderers care about
    pub extra: Map<String, Value>,
    pub(crate) parent: Option<ItemIndex>,
    pub(crate) children: Vec<ItemIndex>,
    pub(crate) answer: Option<Answer>,
    /// The appended "none of the above" choice of a group
    pub(crate) synthetic: bool,
    /// Outcome of this item's own gating and conditions
    pub(crate) own_visible: bool,
    /// Last display state applied, used to detect transitions
    pub(crate) displayed: bool,
    pub(crate) readonly: bool,
}

impl Item {
    pub fn new(id: impl Into<String>, item_type: ItemType) -> Self {
        let answer = match item_type {
            ItemType::Line | ItemType::Box | ItemType::Upload => Some(Answer::Text(String::new())),
            ItemType::Check | ItemType::Radio => Some(Answer::Choice(false)),
            ItemType::YesNo => Some(Answer::YesNo(None)),
            _ => None,
        };
        Self {
            id: id.into(),
            item_type,
            conditions: String::new(),
            text: String::new(),
            auth: None,
            class_name: String::new(),
            extra: Map::new(),
            parent: None,
            children: Vec::new(),
            answer,
            synthetic: false,
            own_visible: true,
            displayed: true,
            readonly: false,
        }
    }

    pub fn with_conditions(mut self, conditions: impl Into<String>) -> Self {
        self.conditions = conditions.into();
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Give a tip a clarification text field
    pub fn with_clarification(mut self) -> Self {
        self.answer = Some(Answer::Text(String::new()));
        self
    }

    pub(crate) fn synthetic(mut self) -> Self {
        self.synthetic = true;
        self
    }

    pub fn parent(&self) -> Option<ItemIndex> {
        self.parent
    }

    pub fn children(&self) -> &[ItemIndex] {
        &self.children
    }

    pub fn value_item(&self) -> Option<&dyn ValueItem> {
        self.answer.as_ref().map(|a| a as &dyn ValueItem)
    }

    pub(crate) fn value_item_mut(&mut self) -> Option<&mut Answer> {
        self.answer.as_mut()
    }

    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Last applied display state
    pub fn is_displayed(&self) -> bool {
        self.displayed
    }

    pub fn is_admin_only(&self) -> bool {
        self.auth == Some(Auth::Admin)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.class_name.split_whitespace().any(|c| c == class)
    }

    pub fn is_checked_choice(&self) -> bool {
        matches!(self.answer, Some(Answer::Choice(true)))
    }
}
