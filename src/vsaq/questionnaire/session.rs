// SPDX-License-Identifier: MIT

//! Async front for a questionnaire that applies the propagation policy:
//! free-text changes are debounced, discrete choices propagate at once.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::debounce::Debouncer;
use super::instance::{AnswerMap, Questionnaire};
use super::tree::ItemTree;
use crate::engine::error::QuestionnaireError;

pub struct Session {
    questionnaire: Arc<Mutex<Questionnaire>>,
    debouncer: Debouncer,
}

impl Session {
    pub fn new(questionnaire: Questionnaire, delay: Duration) -> Self {
        Self {
            questionnaire: Arc::new(Mutex::new(questionnaire)),
            debouncer: Debouncer::new(delay),
        }
    }

    /// Shared handle to the underlying questionnaire
    pub fn questionnaire(&self) -> Arc<Mutex<Questionnaire>> {
        Arc::clone(&self.questionnaire)
    }

    /// Delay applied to free-text changes
    pub fn debounce(&self) -> Duration {
        self.debouncer.delay()
    }

    /// Whether a debounced pass is waiting to run
    pub fn has_pending_pass(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Apply a user answer and propagate according to the item kind
    pub async fn answer(&mut self, id: &str, value: &str) -> Result<(), QuestionnaireError> {
        let mut questionnaire = self.questionnaire.lock().await;
        let item_type = questionnaire.set_value(id, value)?;

        if item_type.is_high_frequency() {
            drop(questionnaire);
            log::debug!("Deferring visibility pass after change to '{}'", id);
            let shared = Arc::clone(&self.questionnaire);
            self.debouncer.schedule(async move {
                let mut questionnaire = shared.lock().await;
                if let Err(e) = questionnaire.update_visibility() {
                    log::error!("Deferred visibility pass failed: {}", e);
                    questionnaire.record_deferred_failure(e);
                }
            });
            return Ok(());
        }

        // the synchronous pass below covers any pending free-text change
        self.debouncer.cancel();
        questionnaire.update_visibility()
    }

    /// Run a pending debounced pass right away
    pub async fn flush(&mut self) -> Result<(), QuestionnaireError> {
        if !self.debouncer.cancel() {
            return Ok(());
        }
        self.questionnaire.lock().await.update_visibility()
    }

    /// Import answers, dropping any pending pass first
    pub async fn set_values(&mut self, values: &AnswerMap) -> Result<(), QuestionnaireError> {
        self.debouncer.cancel();
        self.questionnaire.lock().await.set_values(values)
    }

    pub async fn values(&self) -> AnswerMap {
        self.questionnaire.lock().await.values().clone()
    }

    /// Swap in a new template; a pending pass against the old items is dropped
    pub async fn reset(&mut self, tree: ItemTree) -> Result<(), QuestionnaireError> {
        self.debouncer.cancel();
        self.questionnaire.lock().await.load(tree)
    }

    /// Failure of the last debounced pass, if any
    pub async fn take_deferred_failure(&self) -> Option<QuestionnaireError> {
        self.questionnaire.lock().await.take_deferred_failure()
    }
}
