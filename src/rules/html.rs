#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use crate::{
    dom::tree::NodeId,
    rules::{Rule, missing_param, param},
    sandbox::Sandbox,
};

/// Resolves the rule's selector to its first match, mapping selector
/// problems to a diagnostic.
fn first_match(sandbox: &Sandbox, selector: &str) -> Result<Option<NodeId>, String> {
    sandbox.query_first(selector)
}

/// `elementExists`: the selector matches at least one element.
pub fn element_exists(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let selector = param!(rule, selector);
    match first_match(sandbox, selector) {
        Err(message) => Some(message),
        Ok(None) => Some(format!(
            "Element matching selector '{selector}' was not found."
        )),
        Ok(Some(_)) => None,
    }
}

/// `elementNotExists`: the selector matches nothing.
pub fn element_not_exists(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let selector = param!(rule, selector);
    match first_match(sandbox, selector) {
        Err(message) => Some(message),
        Ok(Some(_)) => Some(format!(
            "Element matching selector '{selector}' should not exist, but was found."
        )),
        Ok(None) => None,
    }
}

/// `elementText`: trimmed subtree text equals the expected string.
pub fn element_text(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let selector = param!(rule, selector);
    let Some(expected) = rule.expected_text() else {
        return Some(missing_param(&rule.kind, "expected"));
    };
    let node = match first_match(sandbox, selector) {
        Err(message) => return Some(message),
        Ok(None) => {
            return Some(format!(
                "Element matching selector '{selector}' was not found for the text check."
            ));
        }
        Ok(Some(node)) => node,
    };
    let actual = sandbox.text_content(node).trim().to_string();
    if actual != expected {
        return Some(format!(
            "Text of '{selector}' ('{actual}') does not match the expected text ('{expected}')."
        ));
    }
    None
}

/// `elementMatches`: subtree text (or markup, per `property`) matches a
/// JavaScript regular expression.
pub fn element_matches(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let selector = param!(rule, selector);
    let pattern = param!(rule, pattern);
    let node = match first_match(sandbox, selector) {
        Err(message) => return Some(message),
        Ok(None) => {
            return Some(format!(
                "Element matching selector '{selector}' was not found for the pattern check."
            ));
        }
        Ok(Some(node)) => node,
    };
    let content = if rule.property.as_deref() == Some("innerHTML") {
        sandbox.inner_html(node)
    } else {
        sandbox.text_content(node)
    };
    let flags = rule.flags.as_deref().unwrap_or("");
    match sandbox.regex_test(pattern, flags, &content) {
        Err(error) => Some(format!("Error evaluating pattern '{pattern}': {error}")),
        Ok(false) => Some(format!(
            "Content of element '{selector}' does not match the pattern '{pattern}'."
        )),
        Ok(true) => None,
    }
}

/// `elementHasClass`: the element's class list contains the class.
pub fn element_has_class(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let selector = param!(rule, selector);
    let class_name = param!(rule, class_name);
    let node = match first_match(sandbox, selector) {
        Err(message) => return Some(message),
        Ok(None) => {
            return Some(format!(
                "Element matching selector '{selector}' was not found for the class check."
            ));
        }
        Ok(Some(node)) => node,
    };
    if !sandbox.has_class(node, class_name) {
        return Some(format!(
            "Element '{selector}' does not have the class '{class_name}'."
        ));
    }
    None
}

/// `elementAttribute`: exact string equality on an attribute value.
pub fn element_attribute(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let selector = param!(rule, selector);
    let attribute = param!(rule, attribute);
    let Some(expected) = rule.expected_text() else {
        return Some(missing_param(&rule.kind, "expected"));
    };
    let node = match first_match(sandbox, selector) {
        Err(message) => return Some(message),
        Ok(None) => {
            return Some(format!(
                "Element matching selector '{selector}' was not found for the attribute check."
            ));
        }
        Ok(Some(node)) => node,
    };
    let actual = sandbox.attr(node, attribute);
    if actual.as_deref() != Some(expected.as_str()) {
        return Some(format!(
            "Attribute '{attribute}' of element '{selector}' has the value '{}', expected '{expected}'.",
            actual.as_deref().unwrap_or("null")
        ));
    }
    None
}

/// `elementHasAttribute`: the attribute is present, any value.
pub fn element_has_attribute(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let selector = param!(rule, selector);
    let attribute = param!(rule, attribute);
    let node = match first_match(sandbox, selector) {
        Err(message) => return Some(message),
        Ok(None) => {
            return Some(format!(
                "Element matching selector '{selector}' was not found for the attribute check."
            ));
        }
        Ok(Some(node)) => node,
    };
    if !sandbox.has_attr(node, attribute) {
        return Some(format!(
            "Element '{selector}' is missing the attribute '{attribute}'."
        ));
    }
    None
}

/// `elementCount`: the selector matches exactly the expected number of
/// elements.
pub fn element_count(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let selector = param!(rule, selector);
    let Some(expected) = rule.expected_int() else {
        return Some(missing_param(&rule.kind, "expected"));
    };
    let found = match sandbox.query_all(selector) {
        Err(message) => return Some(message),
        Ok(matches) => matches.len() as i64,
    };
    if found != expected {
        return Some(format!(
            "Found {found} elements matching selector '{selector}', expected {expected}."
        ));
    }
    None
}

/// `hasDoctype`: the document declares a doctype, optionally a specific one.
pub fn has_doctype(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let Some(actual) = sandbox.doctype() else {
        return Some("The document must include a DOCTYPE declaration.".to_string());
    };
    if let Some(expected) = rule.expected_text()
        && !actual.eq_ignore_ascii_case(&expected)
    {
        return Some(format!(
            "Expected DOCTYPE '{expected}', but found '{actual}'."
        ));
    }
    None
}

/// `elementInnerHTML`: trimmed serialized markup equals the expected string.
pub fn element_inner_html(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let selector = param!(rule, selector);
    let Some(expected) = rule.expected_text() else {
        return Some(missing_param(&rule.kind, "expected"));
    };
    let node = match first_match(sandbox, selector) {
        Err(message) => return Some(message),
        Ok(None) => {
            return Some(format!(
                "Element matching selector '{selector}' was not found for the innerHTML check."
            ));
        }
        Ok(Some(node)) => node,
    };
    let actual = sandbox.inner_html(node).trim().to_string();
    if actual != expected {
        return Some(format!(
            "innerHTML of element '{selector}' ('{actual}') does not match the expected markup ('{expected}')."
        ));
    }
    None
}

/// `elementContainsText`: subtree text contains the given substring.
pub fn element_contains_text(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let selector = param!(rule, selector);
    let text = param!(rule, text);
    let node = match first_match(sandbox, selector) {
        Err(message) => return Some(message),
        Ok(None) => {
            return Some(format!(
                "Element matching selector '{selector}' was not found for the text check."
            ));
        }
        Ok(Some(node)) => node,
    };
    if !sandbox.text_content(node).contains(text) {
        return Some(format!(
            "Element '{selector}' does not contain the expected text '{text}'."
        ));
    }
    None
}

/// `elementAttributeContains`: an attribute value contains the given
/// substring.
pub fn element_attribute_contains(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let selector = param!(rule, selector);
    let attribute = param!(rule, attribute);
    let expected_substring = param!(rule, expected_substring);
    let node = match first_match(sandbox, selector) {
        Err(message) => return Some(message),
        Ok(None) => {
            return Some(format!(
                "Element matching selector '{selector}' was not found for the attribute check."
            ));
        }
        Ok(Some(node)) => node,
    };
    let value = sandbox.attr(node, attribute);
    if !value.is_some_and(|v| v.contains(expected_substring)) {
        return Some(format!(
            "Attribute '{attribute}' of element '{selector}' does not contain '{expected_substring}'."
        ));
    }
    None
}
