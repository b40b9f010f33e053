#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use crate::{
    css::normalize_value,
    rules::{Rule, param},
    sandbox::Sandbox,
};

/// `computedStyle`: the cascaded value of a style property equals the
/// expected string exactly.
pub fn computed_style(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let selector = param!(rule, selector);
    let property = param!(rule, property);
    let Some(expected) = rule.expected_text() else {
        return Some(crate::rules::missing_param(&rule.kind, "expected"));
    };
    let node = match sandbox.query_first(selector) {
        Err(message) => return Some(message),
        Ok(None) => {
            return Some(format!(
                "Element matching selector '{selector}' was not found for the style check."
            ));
        }
        Ok(Some(node)) => node,
    };
    let actual = sandbox.computed_style(node, property).unwrap_or_default();
    if actual != expected {
        return Some(format!(
            "Style '{property}' of element '{selector}' has the value '{actual}', expected '{expected}'."
        ));
    }
    None
}

/// `styleRuleExists`: some author rule carries the given selector text.
/// When a stylesheet could not be parsed, falls back to "the selector
/// matches at least one live element", a documented approximation.
pub fn style_rule_exists(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let selector = param!(rule, selector);
    let mut found = sandbox.style_selector_exists(selector);
    if !found && sandbox.sheets_failed() {
        found = sandbox
            .query_all(selector)
            .map(|matches| !matches.is_empty())
            .unwrap_or(false);
    }
    if !found {
        return Some(format!("No CSS rule for selector '{selector}' was found."));
    }
    None
}

/// `styleRuleProperty`: reads the property through the cascade; with an
/// expected value, exact equality; without one, the property must be set to
/// something non-initial and non-empty.
pub fn style_rule_property(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let selector = param!(rule, selector);
    let property = param!(rule, property);
    let node = match sandbox.query_first(selector) {
        Err(message) => return Some(message),
        Ok(None) => {
            return Some(format!(
                "Element matching selector '{selector}' was not found for the CSS rule check."
            ));
        }
        Ok(Some(node)) => node,
    };
    let actual = sandbox.computed_style(node, property).unwrap_or_default();

    if let Some(expected) = rule.expected_text() {
        if actual != expected {
            return Some(format!(
                "CSS property '{property}' for selector '{selector}' has the value '{actual}', expected '{expected}'."
            ));
        }
        return None;
    }

    if actual.is_empty() || actual == "initial" {
        return Some(format!(
            "CSS property '{property}' for selector '{selector}' is not set."
        ));
    }
    None
}

/// `cssPropertyExists`: the property is declared for the selector in some
/// author rule, value unchecked. Falls back to a raw-source scan when a
/// stylesheet could not be parsed.
pub fn css_property_exists(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let selector = param!(rule, selector);
    let property = param!(rule, property);
    let mut found = sandbox.declared_style_value(selector, property).is_some();
    if !found && sandbox.sheets_failed() {
        found = raw_block_has_property(&sandbox.style_source_text(), selector, property);
    }
    if !found {
        return Some(format!(
            "CSS property '{property}' for selector '{selector}' was not found in the stylesheet."
        ));
    }
    None
}

/// `cssPropertyCheck`: the property must be declared for the selector, and,
/// when an expected value is given, the cascaded value must match after
/// normalization (zero lengths, hex and named colors as `rgb()`, gradient
/// containment for backgrounds, the reset-border special cases).
pub fn css_property_check(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let selector = param!(rule, selector);
    let property = param!(rule, property);

    let mut declared = sandbox.declared_style_value(selector, property).is_some();
    if !declared && sandbox.sheets_failed() {
        declared = raw_block_has_property(&sandbox.style_source_text(), selector, property);
    }
    if !declared {
        return Some(format!(
            "CSS property '{property}' for selector '{selector}' was not found in the stylesheet. \
             Add this property to your CSS code."
        ));
    }

    let Some(expected) = rule.expected_text() else {
        return None;
    };

    let Ok(Some(node)) = sandbox.query_first(selector) else {
        return None;
    };
    let computed = sandbox.computed_style(node, property).unwrap_or_default();

    if matches!(property, "background" | "background-image") {
        if expected.to_ascii_lowercase().contains("gradient")
            && !computed.to_ascii_lowercase().contains("gradient")
        {
            return Some(format!(
                "CSS property '{property}' was found, but the value '{computed}' does not contain \
                 a gradient. A gradient was expected."
            ));
        }
        return None;
    }

    let normalized_expected = normalize_value(&expected, Some(property), Some(&expected));
    let normalized_computed = normalize_value(&computed, Some(property), Some(&expected));

    if normalized_computed != normalized_expected {
        let zero_match = (normalized_expected == "0px" && matches!(expected.as_str(), "0" | "0px"))
            || (normalized_computed == "0px" && matches!(expected.as_str(), "0" | "0px"));
        if !zero_match {
            return Some(format!(
                "CSS property '{property}' was found, but has the value '{computed}', expected '{expected}'."
            ));
        }
    }
    None
}

/// Last-resort scan of raw stylesheet text: does any block whose selector
/// line mentions `selector` declare `property`? Only consulted when the
/// stylesheet failed to parse.
fn raw_block_has_property(css: &str, selector: &str, property: &str) -> bool {
    let mut rest = css;
    while let Some(open) = rest.find('{') {
        let prelude = &rest[..open];
        let Some(close) = rest[open..].find('}') else {
            return false;
        };
        let block = &rest[open + 1..open + close];
        if prelude.contains(selector.trim()) {
            let has = block.split(';').any(|decl| {
                decl.split_once(':')
                    .is_some_and(|(p, _)| p.trim().eq_ignore_ascii_case(property))
            });
            if has {
                return true;
            }
        }
        rest = &rest[open + close + 1..];
    }
    false
}
