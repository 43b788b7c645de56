//! Resolution of item references inside condition expressions
//!
//! A reference names another item, optionally decorated:
//! - `q1` - truth value of q1, false while q1 is hidden
//! - `q1/yes`, `q1/no` - which answer a yes/no item holds
//! - `q1/value` - the raw answer text
//! - `^q1` - whether q1 is currently displayed

use super::item::ItemType;
use super::tree::{ItemIndex, ItemTree};
use std::collections::HashMap;

use crate::engine::condition::{evaluate_str, Resolver, Value};
use crate::engine::error::ExpressionError;

/// Identifier that always resolves to false
pub const FALSE_CONSTANT: &str = "false";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suffix {
    Yes,
    No,
    Value,
}

/// A reference split into its parts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference<'a> {
    pub id: &'a str,
    pub visibility: bool,
    pub suffix: Option<Suffix>,
}

impl<'a> Reference<'a> {
    pub fn parse(reference: &'a str) -> Self {
        let (visibility, rest) = match reference.strip_prefix('^') {
            Some(rest) => (true, rest),
            None => (false, reference),
        };
        let suffixes = [("/yes", Suffix::Yes), ("/no", Suffix::No), ("/value", Suffix::Value)];
        for (text, suffix) in suffixes {
            if let Some(id) = rest.strip_suffix(text) {
                return Self {
                    id,
                    visibility,
                    suffix: Some(suffix),
                };
            }
        }
        Self {
            id: rest,
            visibility,
            suffix: None,
        }
    }
}

/// Condition outcomes already settled during one visibility pass
pub type ConditionCache = HashMap<ItemIndex, bool>;

/// Resolves references for the conditions of one item
pub struct ConditionResolver<'a> {
    tree: &'a ItemTree,
    /// Items whose conditions are being evaluated, outermost first
    chain: Vec<ItemIndex>,
    cache: &'a mut ConditionCache,
    /// Set once the current evaluation has read a `^` marker
    reads_display: bool,
}

impl<'a> ConditionResolver<'a> {
    pub fn new(tree: &'a ItemTree, item: ItemIndex, cache: &'a mut ConditionCache) -> Self {
        Self {
            tree,
            chain: vec![item],
            cache,
            reads_display: false,
        }
    }

    fn dependent(&self) -> &str {
        self.chain
            .last()
            .map(|&i| self.tree.get(i).id.as_str())
            .unwrap_or_default()
    }

    /// Whether `index` and all its ancestors have conditions that hold
    fn chain_holds(&mut self, index: ItemIndex) -> Result<bool, ExpressionError> {
        let tree = self.tree;
        for ancestor in tree.ancestors_inclusive(index) {
            let item = tree.get(ancestor);
            if item.conditions.trim().is_empty() {
                continue;
            }
            if self.chain.contains(&ancestor) {
                return Err(ExpressionError::reference(
                    self.dependent(),
                    format!("circular condition through '{}'", item.id),
                ));
            }
            if !self.conditions_hold(ancestor)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Own conditions of `index`, memoized unless they read display state
    fn conditions_hold(&mut self, index: ItemIndex) -> Result<bool, ExpressionError> {
        if let Some(&holds) = self.cache.get(&index) {
            return Ok(holds);
        }

        let tree = self.tree;
        let outer = std::mem::take(&mut self.reads_display);
        self.chain.push(index);
        let result = evaluate_str(&tree.get(index).conditions, self).map(|v| v.is_truthy());
        self.chain.pop();
        let reads_display = std::mem::replace(&mut self.reads_display, outer);
        self.reads_display |= reads_display;

        let holds = result?;
        // display state changes as the pass advances
        if !reads_display {
            self.cache.insert(index, holds);
        }
        Ok(holds)
    }
}

impl Resolver for ConditionResolver<'_> {
    fn resolve(&mut self, reference: &str) -> Result<Value, ExpressionError> {
        if reference == FALSE_CONSTANT {
            return Ok(Value::Bool(false));
        }

        let parsed = Reference::parse(reference);
        let Some(index) = self.tree.lookup(parsed.id) else {
            return Err(ExpressionError::reference(
                self.dependent(),
                format!("unknown item '{}'", parsed.id),
            ));
        };
        let target = self.tree.get(index);

        if parsed.suffix == Some(Suffix::Value) {
            if let Some(value) = target.value_item() {
                return Ok(Value::Str(value.value()));
            }
        }

        if parsed.visibility {
            self.reads_display = true;
            return Ok(Value::Bool(self.tree.is_visible(index)));
        }

        if !self.chain_holds(index)? {
            return Ok(Value::Bool(false));
        }

        if let Some(value) = target.value_item() {
            return Ok(Value::Bool(value.is_checked(reference)));
        }

        if matches!(target.item_type, ItemType::CheckGroup | ItemType::RadioGroup) {
            return Ok(Value::Bool(self.tree.group_selected(index)));
        }

        Err(ExpressionError::reference(
            self.dependent(),
            format!(
                "item '{}' of type {} has no value to test",
                target.id, target.item_type
            ),
        ))
    }
}

/// Evaluate the conditions of `index` against the current tree state
pub fn evaluate_conditions(tree: &ItemTree, index: ItemIndex) -> Result<bool, ExpressionError> {
    evaluate_conditions_cached(tree, index, &mut ConditionCache::new())
}

/// Like [`evaluate_conditions`], reusing outcomes settled earlier in the
/// same pass. The cache must be dropped once answers change.
pub fn evaluate_conditions_cached(
    tree: &ItemTree,
    index: ItemIndex,
    cache: &mut ConditionCache,
) -> Result<bool, ExpressionError> {
    let mut resolver = ConditionResolver::new(tree, index, cache);
    Ok(evaluate_str(&tree.get(index).conditions, &mut resolver)?.is_truthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vsaq::questionnaire::item::{Answer, Item, ValueItem};

    struct Fixture {
        tree: ItemTree,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                tree: ItemTree::new(),
            }
        }

        fn add(&mut self, item: Item, parent: Option<&str>) -> ItemIndex {
            let parent = parent.map(|p| self.tree.lookup(p).unwrap());
            self.tree.insert(item, parent).unwrap()
        }

        fn answer(&mut self, id: &str, value: &str) {
            let index = self.tree.lookup(id).unwrap();
            assert!(self
                .tree
                .get_mut(index)
                .value_item_mut()
                .unwrap()
                .set_value(value));
        }

        fn eval(&self, id: &str, conditions: &str) -> Result<bool, ExpressionError> {
            let mut tree = self.tree.clone();
            let index = tree.lookup(id).unwrap();
            tree.get_mut(index).conditions = conditions.to_string();
            evaluate_conditions(&tree, index)
        }
    }

    #[test]
    fn test_reference_parsing() {
        assert_eq!(
            Reference::parse("^q1"),
            Reference {
                id: "q1",
                visibility: true,
                suffix: None
            }
        );
        assert_eq!(Reference::parse("q1/yes").suffix, Some(Suffix::Yes));
        assert_eq!(Reference::parse("q1/no").id, "q1");
        assert_eq!(Reference::parse("q1/value").suffix, Some(Suffix::Value));
        assert_eq!(Reference::parse("q1/other").id, "q1/other");
    }

    #[test]
    fn test_radio_references() {
        let mut f = Fixture::new();
        f.add(Item::new("group", ItemType::RadioGroup), None);
        f.add(Item::new("radio1", ItemType::Radio), Some("group"));
        f.add(Item::new("radio2", ItemType::Radio), Some("group"));
        f.add(Item::new("target", ItemType::Info), None);
        f.answer("radio1", "checked");

        assert!(f.eval("target", "radio1_id_missing").is_err());
        assert_eq!(f.eval("target", "radio1"), Ok(true));
        assert_eq!(f.eval("target", "radio2"), Ok(false));
        assert_eq!(f.eval("target", "!radio2"), Ok(true));
        assert_eq!(f.eval("target", "group"), Ok(true));
    }

    #[test]
    fn test_hidden_container_makes_reference_false() {
        let mut f = Fixture::new();
        f.add(Item::new("gate", ItemType::Check), None);
        f.add(
            Item::new("section", ItemType::Block).with_conditions("gate"),
            None,
        );
        f.add(Item::new("y", ItemType::Line), Some("section"));
        f.add(Item::new("x", ItemType::Info), None);
        f.answer("y", "some answer");

        assert_eq!(f.eval("x", "y"), Ok(false));
        f.answer("gate", "checked");
        assert_eq!(f.eval("x", "y"), Ok(true));
    }

    #[test]
    fn test_own_conditions_gate_reference() {
        let mut f = Fixture::new();
        f.add(Item::new("a", ItemType::Check), None);
        f.add(Item::new("b", ItemType::Check).with_conditions("a"), None);
        f.add(Item::new("x", ItemType::Info), None);
        f.answer("b", "checked");

        assert_eq!(f.eval("x", "b"), Ok(false));
        f.answer("a", "checked");
        assert_eq!(f.eval("x", "b"), Ok(true));
    }

    #[test]
    fn test_value_suffix_returns_text() {
        let mut f = Fixture::new();
        f.add(Item::new("name", ItemType::Line), None);
        f.add(Item::new("x", ItemType::Info), None);

        assert_eq!(f.eval("x", "name/value"), Ok(false));
        f.answer("name", "Acme Corp");
        assert_eq!(f.eval("x", "name/value"), Ok(true));
        assert_eq!(f.eval("x", r#"contains(name/value, "Acme")"#), Ok(true));
        assert_eq!(f.eval("x", r#"matches(name/value, "corp$", "i")"#), Ok(true));
    }

    #[test]
    fn test_yes_no_suffixes() {
        let mut f = Fixture::new();
        f.add(Item::new("q", ItemType::YesNo), None);
        f.add(Item::new("x", ItemType::Info), None);

        assert_eq!(f.eval("x", "q/yes || q/no"), Ok(false));
        f.answer("q", "no");
        assert_eq!(f.eval("x", "q/yes"), Ok(false));
        assert_eq!(f.eval("x", "q/no"), Ok(true));
        assert_eq!(f.eval("x", "q"), Ok(true));
    }

    #[test]
    fn test_visibility_marker_reads_display_state() {
        let mut f = Fixture::new();
        let gate = f.add(Item::new("gate", ItemType::Info), None);
        f.add(Item::new("x", ItemType::Info), None);

        assert_eq!(f.eval("x", "^gate"), Ok(true));
        f.tree.get_mut(gate).own_visible = false;
        assert_eq!(f.eval("x", "^gate"), Ok(false));
        assert_eq!(f.eval("x", "!^gate"), Ok(true));
    }

    #[test]
    fn test_false_constant() {
        let mut f = Fixture::new();
        f.add(Item::new("x", ItemType::Info), None);
        assert_eq!(f.eval("x", "false"), Ok(false));
        assert_eq!(f.eval("x", "!false"), Ok(true));
    }

    #[test]
    fn test_unknown_reference_names_dependent() {
        let mut f = Fixture::new();
        f.add(Item::new("x", ItemType::Info), None);
        assert_eq!(
            f.eval("x", "nope"),
            Err(ExpressionError::reference("x", "unknown item 'nope'"))
        );
    }

    #[test]
    fn test_non_answerable_reference_fails() {
        let mut f = Fixture::new();
        f.add(Item::new("info", ItemType::Info), None);
        f.add(Item::new("x", ItemType::Info), None);
        assert!(matches!(
            f.eval("x", "info"),
            Err(ExpressionError::Reference { .. })
        ));
    }

    #[test]
    fn test_circular_conditions_detected() {
        let mut f = Fixture::new();
        f.add(Item::new("a", ItemType::Check).with_conditions("b"), None);
        f.add(Item::new("b", ItemType::Check).with_conditions("a"), None);
        assert!(matches!(
            evaluate_conditions(&f.tree, f.tree.lookup("a").unwrap()),
            Err(ExpressionError::Reference { .. })
        ));
    }

    #[test]
    fn test_synthetic_choice_does_not_select_group() {
        let mut f = Fixture::new();
        f.add(Item::new("group", ItemType::CheckGroup), None);
        f.add(Item::new("c1", ItemType::Check), Some("group"));
        let none = f.add(Item::new("group_none", ItemType::Check).synthetic(), Some("group"));
        f.add(Item::new("x", ItemType::Info), None);
        f.tree.get_mut(none).answer = Some(Answer::Choice(true));

        assert_eq!(f.eval("x", "group"), Ok(false));
        assert_eq!(f.eval("x", "group_none"), Ok(true));
    }

    #[test]
    fn test_shared_ancestors_evaluated_once() {
        let mut f = Fixture::new();
        f.add(Item::new("c0", ItemType::Check), None);
        f.add(Item::new("c1", ItemType::Check).with_conditions("c0"), None);
        for n in 2..40 {
            let conditions = format!("c{} && c{}", n - 1, n - 2);
            f.add(Item::new(format!("c{n}"), ItemType::Check).with_conditions(conditions), None);
        }
        f.add(Item::new("x", ItemType::Info), None);
        for n in 0..40 {
            f.answer(&format!("c{n}"), "checked");
        }

        let mut cache = ConditionCache::new();
        let x = f.tree.lookup("x").unwrap();
        f.tree.get_mut(x).conditions = "c39".to_string();
        assert_eq!(evaluate_conditions_cached(&f.tree, x, &mut cache), Ok(true));
        assert_eq!(cache.len(), 39);
        assert_eq!(cache.get(&f.tree.lookup("c20").unwrap()), Some(&true));
    }

    #[test]
    fn test_display_dependent_outcomes_not_cached() {
        let mut f = Fixture::new();
        let gate = f.add(Item::new("gate", ItemType::Info), None);
        f.add(Item::new("b", ItemType::Check).with_conditions("^gate"), None);
        f.add(Item::new("a", ItemType::Check).with_conditions("b"), None);
        let x = f.add(Item::new("x", ItemType::Info).with_conditions("a"), None);
        f.answer("a", "checked");
        f.answer("b", "checked");

        let mut cache = ConditionCache::new();
        assert_eq!(evaluate_conditions_cached(&f.tree, x, &mut cache), Ok(true));
        assert!(cache.is_empty());

        f.tree.get_mut(gate).own_visible = false;
        assert_eq!(evaluate_conditions_cached(&f.tree, x, &mut cache), Ok(false));
    }

    #[test]
    fn test_cycle_found_despite_cache() {
        let mut f = Fixture::new();
        f.add(Item::new("a", ItemType::Check).with_conditions("b"), None);
        f.add(Item::new("b", ItemType::Check).with_conditions("a"), None);
        let mut cache = ConditionCache::new();
        for id in ["a", "b"] {
            let index = f.tree.lookup(id).unwrap();
            assert!(matches!(
                evaluate_conditions_cached(&f.tree, index, &mut cache),
                Err(ExpressionError::Reference { .. })
            ));
        }
        assert!(cache.is_empty());
    }
}
