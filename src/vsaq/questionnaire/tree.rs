// SPDX-License-Identifier: MIT

//! Item arena
//!
//! Ownership flows from containers to children through index lists; the
//! parent link is a plain index used for lookups only.

use std::collections::HashMap;

use super::item::{Item, ItemType};
use crate::engine::error::ParseError;

/// Position of an item in its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemIndex(usize);

/// The items of one questionnaire instance plus the id registry
#[derive(Debug, Clone, Default)]
pub struct ItemTree {
    items: Vec<Item>,
    registry: HashMap<String, ItemIndex>,
    roots: Vec<ItemIndex>,
}

impl ItemTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `item` as the last child of `parent` (or as a root).
    pub fn insert(&mut self, mut item: Item, parent: Option<ItemIndex>) -> Result<ItemIndex, ParseError> {
        if self.registry.contains_key(&item.id) {
            return Err(ParseError::DuplicateId(item.id));
        }
        if let Some(p) = parent {
            let container = &self.items[p.0];
            if !container.item_type.is_container() {
                return Err(ParseError::UnexpectedChildren {
                    item: container.id.clone(),
                    item_type: container.item_type.to_string(),
                });
            }
            if let Some(expected) = container.item_type.choice_type() {
                if item.item_type != expected {
                    return Err(ParseError::UnexpectedChild {
                        parent: container.id.clone(),
                        item: item.id,
                        expected: expected.to_string(),
                        found: item.item_type.to_string(),
                    });
                }
            }
        }

        let index = ItemIndex(self.items.len());
        item.parent = parent;
        item.children.clear();
        self.registry.insert(item.id.clone(), index);
        self.items.push(item);
        match parent {
            Some(p) => self.items[p.0].children.push(index),
            None => self.roots.push(index),
        }
        Ok(index)
    }

    /// Move an item (with its subtree) to `position` under `new_parent`.
    pub fn move_item(
        &mut self,
        index: ItemIndex,
        new_parent: Option<ItemIndex>,
        position: usize,
    ) -> Result<(), ParseError> {
        let invalid = |reason: &str| ParseError::InvalidMove {
            item: self.items[index.0].id.clone(),
            reason: reason.to_string(),
        };

        if let Some(p) = new_parent {
            if self.ancestors_inclusive(p).any(|a| a == index) {
                return Err(invalid("target is inside the moved item"));
            }
            let container = &self.items[p.0];
            if !container.item_type.is_container() {
                return Err(invalid("target cannot contain items"));
            }
            if container
                .item_type
                .choice_type()
                .is_some_and(|t| t != self.items[index.0].item_type)
            {
                return Err(invalid("target group holds a different choice kind"));
            }
        }

        let siblings = self.siblings_mut(self.items[index.0].parent);
        siblings.retain(|&i| i != index);

        let siblings = self.siblings_mut(new_parent);
        let position = position.min(siblings.len());
        siblings.insert(position, index);
        self.items[index.0].parent = new_parent;
        Ok(())
    }

    fn siblings_mut(&mut self, parent: Option<ItemIndex>) -> &mut Vec<ItemIndex> {
        match parent {
            Some(p) => &mut self.items[p.0].children,
            None => &mut self.roots,
        }
    }

    pub fn get(&self, index: ItemIndex) -> &Item {
        &self.items[index.0]
    }

    pub fn get_mut(&mut self, index: ItemIndex) -> &mut Item {
        &mut self.items[index.0]
    }

    pub fn lookup(&self, id: &str) -> Option<ItemIndex> {
        self.registry.get(id).copied()
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.lookup(id).map(|i| self.get(i))
    }

    pub fn roots(&self) -> &[ItemIndex] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Depth-first, parents before children, siblings in order
    pub fn document_order(&self) -> Vec<ItemIndex> {
        let mut order = Vec::with_capacity(self.items.len());
        let mut stack: Vec<ItemIndex> = self.roots.iter().rev().copied().collect();
        while let Some(index) = stack.pop() {
            order.push(index);
            stack.extend(self.items[index.0].children.iter().rev().copied());
        }
        order
    }

    /// The item itself followed by each enclosing container
    pub fn ancestors_inclusive(&self, index: ItemIndex) -> impl Iterator<Item = ItemIndex> + '_ {
        std::iter::successors(Some(index), move |i| self.items[i.0].parent)
    }

    /// Effective visibility: own flag and every ancestor's own flag
    pub fn is_visible(&self, index: ItemIndex) -> bool {
        self.ancestors_inclusive(index)
            .all(|i| self.items[i.0].own_visible)
    }

    /// For groups: whether any real (non-synthetic) choice is selected
    pub fn group_selected(&self, index: ItemIndex) -> bool {
        self.items[index.0]
            .children
            .iter()
            .map(|&c| &self.items[c.0])
            .any(|c| !c.synthetic && c.is_checked_choice())
    }

    /// Radio items sharing the container of `index`, excluding itself
    pub fn radio_siblings(&self, index: ItemIndex) -> Vec<ItemIndex> {
        let siblings = match self.items[index.0].parent {
            Some(p) => &self.items[p.0].children,
            None => &self.roots,
        };
        siblings
            .iter()
            .copied()
            .filter(|&s| s != index && self.items[s.0].item_type == ItemType::Radio)
            .collect()
    }
}
