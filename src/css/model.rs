#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use crate::dom::selector::Selector;

/// One `property: value` pair inside a rule or inline style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// lowercase property name
    pub property:  String,
    /// declared value, trimmed, `!important` stripped
    pub value:     String,
    /// whether the declaration carried `!important`
    pub important: bool,
}

/// One author style rule.
#[derive(Debug, Clone)]
pub struct StyleRule {
    /// the rule's selector text, whitespace-normalized, as authored
    pub selector_text: String,
    /// parsed selectors; empty when the text is outside the supported
    /// subset, in which case the rule never matches an element but its
    /// `selector_text` still participates in existence checks
    pub selectors:     Vec<Selector>,
    /// declarations in source order
    pub declarations:  Vec<Declaration>,
}

/// One parsed `<style>` element.
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    /// rules in source order
    pub rules: Vec<StyleRule>,
}

impl Stylesheet {
    /// The declared value of `property` in the first rule whose selector
    /// text matches, searching rules in source order.
    pub fn declared_value(&self, selector_text: &str, property: &str) -> Option<&str> {
        let property = property.to_ascii_lowercase();
        self.rules
            .iter()
            .filter(|rule| rule.selector_text == selector_text)
            .flat_map(|rule| rule.declarations.iter())
            .find(|d| d.property == property)
            .map(|d| d.value.as_str())
    }

    /// True when any rule has the given selector text.
    pub fn has_selector(&self, selector_text: &str) -> bool {
        self.rules.iter().any(|r| r.selector_text == selector_text)
    }
}
