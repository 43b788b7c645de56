// SPDX-License-Identifier: MIT

//! Visibility propagation over the whole item tree

use serde::{Deserialize, Serialize};

use super::events::QuestionnaireEvent;
use super::item::{Auth, INVISIBLE_CLASS};
use super::resolver::{evaluate_conditions_cached, ConditionCache};
use super::tree::ItemTree;
use crate::engine::error::QuestionnaireError;

/// Global display switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMode {
    /// Show items marked `auth: admin`
    #[serde(default)]
    pub admin: bool,
    /// Make every value item read-only
    #[serde(default)]
    pub readonly: bool,
    /// Ignore all conditions and show everything
    #[serde(default)]
    pub unrolled: bool,
}

/// Recompute visibility and read-only state for every item.
///
/// Own flags are settled first in document order, then effective
/// visibility is compared with the last applied state and one event is
/// returned per transition. The first failing condition aborts the pass.
pub fn propagate(
    tree: &mut ItemTree,
    mode: DisplayMode,
) -> Result<Vec<QuestionnaireEvent>, QuestionnaireError> {
    let order = tree.document_order();
    let mut cache = ConditionCache::new();

    for &index in &order {
        let item = tree.get(index);
        let own_visible = if (item.is_admin_only() && !mode.admin) || item.has_class(INVISIBLE_CLASS)
        {
            false
        } else {
            mode.unrolled
                || evaluate_conditions_cached(tree, index, &mut cache)
                    .map_err(|source| QuestionnaireError::condition(&item.id, source))?
        };

        let item = tree.get_mut(index);
        item.own_visible = own_visible;
        if item.value_item().is_some() {
            item.readonly = mode.readonly || item.auth == Some(Auth::Readonly);
        }
    }

    let mut events = Vec::new();
    for &index in &order {
        let visible = tree.is_visible(index);
        let item = tree.get_mut(index);
        if item.displayed != visible {
            item.displayed = visible;
            let id = item.id.clone();
            events.push(if visible {
                QuestionnaireEvent::Shown { id }
            } else {
                QuestionnaireEvent::Hidden { id }
            });
        }
    }

    log::debug!(
        "Visibility pass over {} items: {} transitions",
        order.len(),
        events.len()
    );
    Ok(events)
}
