#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use crate::{
    rules::{Rule, missing_param, param, value_text},
    sandbox::Sandbox,
};

/// `jsGlobalDefined`: the name resolves on the sandbox global.
pub fn js_global_defined(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let name = param!(rule, name);
    if !sandbox.global_defined(name) {
        return Some(format!(
            "Global variable or function '{name}' is not defined."
        ));
    }
    None
}

/// `jsFunctionDefined`: the name resolves to a function.
pub fn js_function_defined(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let name = param!(rule, name);
    if !sandbox.global_is_function(name) {
        return Some(format!("Function '{name}' is not defined."));
    }
    None
}

/// `jsExpression`: an arbitrary expression evaluated in sandbox scope; with
/// an expected value, strict equality, otherwise truthiness.
pub fn js_expression(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let expression = param!(rule, expression);
    let result = match sandbox.eval_expression(expression) {
        Ok(value) => value,
        Err(error) => {
            return Some(format!(
                "Error evaluating expression '{expression}': {error}"
            ));
        }
    };

    if let Some(expected) = &rule.expected {
        if !sandbox.strict_equals_json(&result, expected) {
            let actual = sandbox.display_value(&result);
            return Some(format!(
                "Expression '{expression}' returned '{actual}', expected '{}'.",
                value_text(expected)
            ));
        }
        return None;
    }

    if !result.to_boolean() {
        return Some(format!("Expression '{expression}' returned a falsy value."));
    }
    None
}

/// `jsFunctionReturns`: invoke a named global function with the given
/// arguments and compare the return value. Exceptions become a failure
/// message, never an engine error.
pub fn js_function_returns(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let function_name = param!(rule, function_name);
    if !sandbox.global_is_function(function_name) {
        return Some(format!(
            "Function '{function_name}' was not found or is not a function."
        ));
    }

    let args = rule.args.clone().unwrap_or_default();
    let result = match sandbox.call_global(function_name, &args) {
        Ok(value) => value,
        Err(error) => {
            return Some(format!(
                "Error calling function '{function_name}': {error}"
            ));
        }
    };

    match &rule.expected {
        Some(expected) => {
            if !sandbox.strict_equals_json(&result, expected) {
                let actual = sandbox.display_value(&result);
                return Some(format!(
                    "Function '{function_name}' returned '{actual}', expected '{}'.",
                    value_text(expected)
                ));
            }
            None
        }
        None => {
            if !result.is_undefined() {
                let actual = sandbox.display_value(&result);
                return Some(format!(
                    "Function '{function_name}' returned '{actual}', expected 'undefined'."
                ));
            }
            None
        }
    }
}

/// `jsConsoleContains`: substring match against the intercepted console log
/// at the given level (default `log`).
pub fn js_console_contains(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let message = param!(rule, message);
    let level = rule.console_type.as_deref().unwrap_or("log");
    if !sandbox.console_contains(level, message) {
        return Some(format!(
            "Message '{message}' was not found in the console output (level: {level})."
        ));
    }
    None
}

/// `eventListenerAttached`: some recorded registration matches the event
/// type. Intentionally coarse: the lookup is not scoped to the selector's
/// element, and stored rule sets rely on that looseness.
pub fn event_listener_attached(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let selector = param!(rule, selector);
    let event_type = param!(rule, event_type);
    if !sandbox.listener_attached(event_type) {
        return Some(format!(
            "No '{event_type}' event listener was found for selector '{selector}'."
        ));
    }
    None
}

/// `eventDispatchChangesDom`: snapshot the body, synthetically dispatch the
/// event at the selected element, re-snapshot, and require the change (or
/// lack of one) the rule asked for; optionally check a post-dispatch
/// condition expression.
pub fn event_dispatch_changes_dom(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let selector = param!(rule, selector);
    let event_type = param!(rule, event_type);
    let node = match sandbox.query_first(selector) {
        Err(message) => return Some(message),
        Ok(None) => {
            return Some(format!(
                "Element matching selector '{selector}' was not found for the event dispatch."
            ));
        }
        Ok(Some(node)) => node,
    };

    let before = sandbox.body_snapshot();
    if let Err(error) = sandbox.dispatch_event(node, event_type) {
        return Some(format!("Error dispatching event '{event_type}': {error}"));
    }
    let after = sandbox.body_snapshot();

    let expect_change = rule.expect_change.unwrap_or(false);
    if expect_change && before == after {
        return Some(format!(
            "The DOM did not change after the '{event_type}' event on '{selector}', but changes \
             were expected."
        ));
    }
    if !expect_change && before != after {
        return Some(format!(
            "The DOM changed after the '{event_type}' event on '{selector}', although no changes \
             were expected."
        ));
    }

    if let Some(condition) = rule.condition.as_deref() {
        match sandbox.eval_expression(condition) {
            Err(error) => {
                return Some(format!("Error dispatching event '{event_type}': {error}"));
            }
            Ok(value) if !value.to_boolean() => {
                return Some(format!(
                    "Condition '{condition}' was not met after the '{event_type}' event on \
                     '{selector}'."
                ));
            }
            Ok(_) => {}
        }
    }
    None
}

/// `codeCheck`: the raw submitted script contains the given source
/// fragment.
pub fn code_check(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let code = param!(rule, code);
    if !sandbox.raw_js().contains(code) {
        return Some(format!("The JavaScript source does not contain '{code}'."));
    }
    None
}

/// `arrayLengthCheck`: a global array exists and holds at least the
/// expected number of items.
pub fn array_length_check(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let array = param!(rule, array);
    let Some(minimum) = rule.expected_int() else {
        return Some(missing_param(&rule.kind, "expected"));
    };
    if !sandbox.global_defined(array) {
        return Some(format!("Array '{array}' was not found."));
    }
    let is_array = sandbox
        .eval_expression(&format!("Array.isArray({array})"))
        .map(|value| value.to_boolean())
        .unwrap_or(false);
    if !is_array {
        return Some(format!("'{array}' is not an array."));
    }
    let length = sandbox
        .eval_expression(&format!("{array}.length"))
        .ok()
        .and_then(|value| value.as_number())
        .unwrap_or(0.0) as i64;
    if length < minimum {
        return Some(format!(
            "Array '{array}' has {length} items, expected at least {minimum}."
        ));
    }
    None
}
