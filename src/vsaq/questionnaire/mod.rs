// SPDX-License-Identifier: MIT

//! Questionnaire model and visibility engine
//!
//! Items live in an [`ItemTree`]; a [`Questionnaire`] owns one tree plus
//! the answer map and re-evaluates every item's conditions after each
//! answer change. [`Session`] adds the debounced propagation policy.

pub mod debounce;
pub mod events;
pub mod instance;
pub mod item;
pub mod resolver;
pub mod session;
pub mod tree;
pub mod visibility;

pub use debounce::{Debouncer, DEFAULT_DEBOUNCE};
pub use events::QuestionnaireEvent;
pub use instance::{AnswerMap, Questionnaire};
pub use item::{Answer, Auth, Item, ItemType, ValueItem};
pub use resolver::{evaluate_conditions, evaluate_conditions_cached, ConditionCache, ConditionResolver};
pub use session::Session;
pub use tree::{ItemIndex, ItemTree};
pub use visibility::{propagate, DisplayMode};
