//! Signals emitted to rendering and persistence collaborators

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionnaireEvent {
    /// Item became visible
    Shown { id: String },
    /// Item became hidden
    Hidden { id: String },
    /// Answer changed; `values` holds every id whose value changed with it
    Changed {
        id: String,
        values: BTreeMap<String, String>,
    },
}

impl QuestionnaireEvent {
    pub fn id(&self) -> &str {
        match self {
            QuestionnaireEvent::Shown { id }
            | QuestionnaireEvent::Hidden { id }
            | QuestionnaireEvent::Changed { id, .. } => id,
        }
    }
}
