// SPDX-License-Identifier: MIT

//! The questionnaire aggregate: item tree, answer map, display mode and
//! subscribers, with the answer-change protocol on top.

use std::collections::BTreeMap;
use tokio::sync::mpsc;

use super::events::QuestionnaireEvent;
use super::item::{ItemType, ValueItem, CHECKED};
use super::resolver::evaluate_conditions;
use super::tree::ItemTree;
use super::visibility::{propagate, DisplayMode};
use crate::engine::error::QuestionnaireError;

/// Flat id -> value map
pub type AnswerMap = BTreeMap<String, String>;

#[derive(Debug, Default)]
pub struct Questionnaire {
    tree: ItemTree,
    answers: AnswerMap,
    mode: DisplayMode,
    subscribers: Vec<mpsc::UnboundedSender<QuestionnaireEvent>>,
    passes: u64,
    deferred_failure: Option<QuestionnaireError>,
}

impl Questionnaire {
    /// Create an empty questionnaire; call [`Questionnaire::load`] to give it items
    pub fn new(mode: DisplayMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Create a questionnaire from a tree and run the initial pass
    pub fn from_tree(tree: ItemTree, mode: DisplayMode) -> Result<Self, QuestionnaireError> {
        let mut questionnaire = Self::new(mode);
        questionnaire.load(tree)?;
        Ok(questionnaire)
    }

    /// Replace all items wholesale. The initial visibility pass runs on the
    /// new tree first; if it fails the current items and answers stay.
    pub fn load(&mut self, mut tree: ItemTree) -> Result<(), QuestionnaireError> {
        log::info!("Loading questionnaire with {} items", tree.len());
        let events = propagate(&mut tree, self.mode)?;

        self.tree = tree;
        self.answers.clear();
        self.deferred_failure = None;
        self.passes += 1;
        for event in events {
            self.emit(event);
        }
        Ok(())
    }

    /// Receive SHOWN / HIDDEN / CHANGED signals from now on
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<QuestionnaireEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: QuestionnaireEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn tree(&self) -> &ItemTree {
        &self.tree
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: DisplayMode) -> Result<(), QuestionnaireError> {
        self.mode = mode;
        self.update_visibility()
    }

    /// Number of visibility passes run so far
    pub fn propagation_count(&self) -> u64 {
        self.passes
    }

    /// Recompute visibility of every item and emit transitions
    pub fn update_visibility(&mut self) -> Result<(), QuestionnaireError> {
        self.passes += 1;
        let events = propagate(&mut self.tree, self.mode)?;
        for event in events {
            self.emit(event);
        }
        Ok(())
    }

    /// Whether the conditions of `id` currently hold, ignoring gating
    pub fn evaluate_conditions(&self, id: &str) -> Result<bool, QuestionnaireError> {
        let index = self
            .tree
            .lookup(id)
            .ok_or_else(|| QuestionnaireError::unknown_item(id))?;
        evaluate_conditions(&self.tree, index).map_err(|e| QuestionnaireError::condition(id, e))
    }

    /// Effective visibility after the last pass
    pub fn is_visible(&self, id: &str) -> Result<bool, QuestionnaireError> {
        let index = self
            .tree
            .lookup(id)
            .ok_or_else(|| QuestionnaireError::unknown_item(id))?;
        Ok(self.tree.is_visible(index))
    }

    pub fn visible_ids(&self) -> Vec<String> {
        self.ids_where(true)
    }

    pub fn hidden_ids(&self) -> Vec<String> {
        self.ids_where(false)
    }

    fn ids_where(&self, visible: bool) -> Vec<String> {
        self.tree
            .document_order()
            .into_iter()
            .filter(|&i| self.tree.is_visible(i) == visible)
            .map(|i| self.tree.get(i).id.clone())
            .collect()
    }

    /// Current value of a value item
    pub fn value(&self, id: &str) -> Result<String, QuestionnaireError> {
        let item = self
            .tree
            .item(id)
            .ok_or_else(|| QuestionnaireError::unknown_item(id))?;
        item.value_item()
            .map(|v| v.value())
            .ok_or_else(|| QuestionnaireError::NotAnswerable { id: id.to_string() })
    }

    /// The live answer map
    pub fn values(&self) -> &AnswerMap {
        &self.answers
    }

    /// Apply a user answer without running a visibility pass. Returns the
    /// kind of the changed item so callers can pick a propagation policy.
    pub fn set_value(&mut self, id: &str, value: &str) -> Result<ItemType, QuestionnaireError> {
        let index = self
            .tree
            .lookup(id)
            .ok_or_else(|| QuestionnaireError::unknown_item(id))?;
        if self.tree.get(index).is_readonly() {
            return Err(QuestionnaireError::ReadOnly { id: id.to_string() });
        }
        self.apply_value(id, value)
    }

    /// Apply a user answer and propagate visibility immediately
    pub fn answer(&mut self, id: &str, value: &str) -> Result<(), QuestionnaireError> {
        self.set_value(id, value)?;
        self.update_visibility()
    }

    fn apply_value(&mut self, id: &str, value: &str) -> Result<ItemType, QuestionnaireError> {
        let index = self
            .tree
            .lookup(id)
            .ok_or_else(|| QuestionnaireError::unknown_item(id))?;
        let item_type = self.tree.get(index).item_type;

        let mut changes = AnswerMap::new();
        {
            let item = self.tree.get_mut(index);
            let answer = item
                .value_item_mut()
                .ok_or_else(|| QuestionnaireError::NotAnswerable { id: id.to_string() })?;
            let previous = answer.value();
            if !answer.set_value(value) {
                return Err(QuestionnaireError::InvalidValue {
                    id: id.to_string(),
                    value: value.to_string(),
                });
            }
            if previous != value {
                changes.insert(id.to_string(), value.to_string());
            }
        }
        self.answers.insert(id.to_string(), value.to_string());

        if item_type == ItemType::Radio && value == CHECKED {
            for sibling in self.tree.radio_siblings(index) {
                let item = self.tree.get_mut(sibling);
                let was_checked = item.is_checked_choice();
                if let Some(answer) = item.value_item_mut() {
                    answer.set_value("");
                }
                if was_checked {
                    let sibling_id = item.id.clone();
                    self.answers.insert(sibling_id.clone(), String::new());
                    changes.insert(sibling_id, String::new());
                }
            }
        }

        if !changes.is_empty() {
            self.emit(QuestionnaireEvent::Changed {
                id: id.to_string(),
                values: changes,
            });
        }
        Ok(item_type)
    }

    /// Import an answer map. Unknown ids and invalid values are logged and
    /// skipped; one visibility pass runs at the end.
    pub fn set_values<'a, I>(&mut self, values: I) -> Result<(), QuestionnaireError>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (id, value) in values {
            match self.apply_value(id, value) {
                Ok(_) => {}
                Err(QuestionnaireError::UnknownItem { .. }) => {
                    log::warn!("Ignoring answer for unknown item '{}'", id);
                }
                Err(e @ QuestionnaireError::InvalidValue { .. })
                | Err(e @ QuestionnaireError::NotAnswerable { .. }) => {
                    log::warn!("Ignoring answer: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
        self.update_visibility()
    }

    pub(crate) fn record_deferred_failure(&mut self, error: QuestionnaireError) {
        self.deferred_failure = Some(error);
    }

    /// Failure of the last deferred (debounced) pass, if any
    pub fn take_deferred_failure(&mut self) -> Option<QuestionnaireError> {
        self.deferred_failure.take()
    }
}
