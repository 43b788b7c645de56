// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use super::types::ItemDescriptor;
use crate::engine::error::ParseError;
use crate::vsaq::questionnaire::item::{Auth, Item, ItemType};

/// Builds one item (without children) from its descriptor and resolved id
pub type ItemParser = Arc<dyn Fn(&ItemDescriptor, &str) -> Result<Item, ParseError> + Send + Sync>;

const BUILTIN_TYPES: [ItemType; 12] = [
    ItemType::Block,
    ItemType::Line,
    ItemType::Box,
    ItemType::Check,
    ItemType::Radio,
    ItemType::YesNo,
    ItemType::CheckGroup,
    ItemType::RadioGroup,
    ItemType::Upload,
    ItemType::Tip,
    ItemType::Info,
    ItemType::Spacer,
];

/// Maps template type strings to item parsers. Each loader owns its own
/// registry, so custom kinds never leak between loaders.
#[derive(Clone)]
pub struct ParserRegistry {
    parsers: HashMap<String, ItemParser>,
}

impl ParserRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// A registry that knows every built-in item kind
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for item_type in BUILTIN_TYPES {
            registry.register(
                item_type.as_str(),
                Arc::new(move |descriptor: &ItemDescriptor, id: &str| {
                    parse_common(descriptor, id, item_type)
                }),
            );
        }
        registry
    }

    /// Register (or replace) the parser for `type_name`
    pub fn register(&mut self, type_name: &str, parser: ItemParser) {
        self.parsers.insert(type_name.to_string(), parser);
    }

    pub fn get(&self, type_name: &str) -> Option<ItemParser> {
        self.parsers.get(type_name).cloned()
    }

    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.parsers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("types", &self.type_names())
            .finish()
    }
}

/// Fields every item kind shares
pub fn parse_common(
    descriptor: &ItemDescriptor,
    id: &str,
    item_type: ItemType,
) -> Result<Item, ParseError> {
    let mut item = Item::new(id, item_type);
    item.conditions = descriptor.cond.clone().unwrap_or_default();
    item.text = descriptor.text.clone().unwrap_or_default();
    item.class_name = descriptor.class_name.clone().unwrap_or_default();
    item.auth = match descriptor.auth.as_deref() {
        None | Some("") => None,
        Some("admin") => Some(Auth::Admin),
        Some("readonly") => Some(Auth::Readonly),
        Some(other) => {
            return Err(ParseError::InvalidField {
                item: id.to_string(),
                field: "auth".to_string(),
                value: other.to_string(),
            })
        }
    };
    item.extra = descriptor.extra.clone();

    if let Some(label) = &descriptor.clarification {
        item.extra.insert("clarification".to_string(), label.clone());
        if item_type == ItemType::Tip {
            item = item.with_clarification();
        }
    }
    Ok(item)
}
