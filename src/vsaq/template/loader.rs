// SPDX-License-Identifier: MIT

//! Template loader - JSON/YAML template parsing
//!
//! Builds an [`ItemTree`] depth-first from a template document. Item kinds
//! are resolved through the loader's own [`ParserRegistry`].

use std::fs;
use std::path::Path;
use uuid::Uuid;

use super::registry::ParserRegistry;
use super::types::{ItemDescriptor, TemplateDocument};
use crate::engine::error::{ParseError, QuestionnaireError};
use crate::vsaq::questionnaire::item::Item;
use crate::vsaq::questionnaire::tree::{ItemIndex, ItemTree};

/// Label of the synthetic choice appended by `defaultChoice`
pub const DEFAULT_CHOICE_TEXT: &str = "None of the above";

/// On-disk template encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFormat {
    Json,
    Yaml,
}

impl TemplateFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(TemplateFormat::Json),
            Some("yaml") | Some("yml") => Some(TemplateFormat::Yaml),
            _ => None,
        }
    }
}

/// Loads questionnaire templates into item trees
#[derive(Debug, Clone, Default)]
pub struct TemplateLoader {
    registry: ParserRegistry,
}

impl TemplateLoader {
    pub fn new() -> Self {
        Self::with_registry(ParserRegistry::with_defaults())
    }

    pub fn with_registry(registry: ParserRegistry) -> Self {
        Self { registry }
    }

    pub fn registry_mut(&mut self) -> &mut ParserRegistry {
        &mut self.registry
    }

    /// Load a template file; the extension selects JSON or YAML
    pub fn load_template<P: AsRef<Path>>(&self, path: P) -> Result<ItemTree, QuestionnaireError> {
        let path = path.as_ref();
        let format = TemplateFormat::from_path(path).ok_or_else(|| {
            QuestionnaireError::config(format!("unsupported template file: {}", path.display()))
        })?;
        let content = fs::read_to_string(path)?;
        log::debug!("Parsing template {}", path.display());
        self.parse(&content, format)
    }

    pub fn parse(&self, content: &str, format: TemplateFormat) -> Result<ItemTree, QuestionnaireError> {
        match format {
            TemplateFormat::Json => self.parse_json(content),
            TemplateFormat::Yaml => self.parse_yaml(content),
        }
    }

    pub fn parse_json(&self, content: &str) -> Result<ItemTree, QuestionnaireError> {
        let document: TemplateDocument = serde_json::from_str(content)?;
        Ok(self.build(&document)?)
    }

    pub fn parse_yaml(&self, content: &str) -> Result<ItemTree, QuestionnaireError> {
        let document: TemplateDocument = serde_yaml::from_str(content)?;
        Ok(self.build(&document)?)
    }

    /// Build the item tree for an already decoded document
    pub fn build(&self, document: &TemplateDocument) -> Result<ItemTree, ParseError> {
        let mut tree = ItemTree::new();
        for descriptor in document.items() {
            self.build_item(&mut tree, descriptor, None)?;
        }
        Ok(tree)
    }

    fn build_item(
        &self,
        tree: &mut ItemTree,
        descriptor: &ItemDescriptor,
        parent: Option<ItemIndex>,
    ) -> Result<ItemIndex, ParseError> {
        let id = match descriptor.id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => generate_id(),
        };
        let type_name = descriptor
            .item_type
            .as_deref()
            .ok_or_else(|| ParseError::missing_field(&id, "type"))?;
        let parser = self
            .registry
            .get(type_name)
            .ok_or_else(|| ParseError::UnknownType(type_name.to_string()))?;

        let item = parser(descriptor, &id)?;
        let item_type = item.item_type;
        let index = tree.insert(item, parent)?;

        if let Some(choice_type) = item_type.choice_type() {
            if descriptor.choices.is_none() && descriptor.items.is_none() {
                return Err(ParseError::missing_field(&id, "choices"));
            }
            for choice in descriptor.choices.iter().flatten() {
                let mut entries = choice.iter();
                let (choice_id, text) = match (entries.next(), entries.next()) {
                    (Some(entry), None) => entry,
                    _ => {
                        return Err(ParseError::InvalidField {
                            item: id,
                            field: "choices".to_string(),
                            value: format!("expected one id per choice, found {}", choice.len()),
                        })
                    }
                };
                tree.insert(Item::new(choice_id, choice_type).with_text(text), Some(index))?;
            }
            if descriptor.default_choice {
                let none = Item::new(format!("{}_none", id), choice_type)
                    .with_text(DEFAULT_CHOICE_TEXT)
                    .synthetic();
                tree.insert(none, Some(index))?;
            }
        }

        for child in descriptor.items.iter().flatten() {
            self.build_item(tree, child, Some(index))?;
        }
        Ok(index)
    }
}

fn generate_id() -> String {
    format!("vsaq-item-{}", Uuid::new_v4().simple())
}
