#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Metadata describing every registered rule type: category, title,
//! per-parameter shape, and a worked example. This is what the authoring
//! UI's Rule Builder renders, and what author-time parameter validation
//! checks a rule configuration against. The evaluators accept exactly the
//! field shapes this schema can produce.

use serde_json::{Value, json};

/// The complete schema, keyed by rule type.
pub fn schema() -> Value {
    json!({
        "elementExists": {
            "category": "HTML",
            "title": "Element exists",
            "description": "The selector matches at least one element.",
            "parameters": {
                "selector": { "type": "string", "required": true, "title": "CSS selector", "placeholder": "h1, .my-class, #my-id" }
            },
            "example": { "type": "elementExists", "selector": "h1" }
        },
        "elementNotExists": {
            "category": "HTML",
            "title": "Element does not exist",
            "description": "The selector matches nothing.",
            "parameters": {
                "selector": { "type": "string", "required": true, "title": "CSS selector", "placeholder": ".deprecated-class" }
            },
            "example": { "type": "elementNotExists", "selector": ".old-style" }
        },
        "elementText": {
            "category": "HTML",
            "title": "Element text",
            "description": "The element's trimmed text equals the expected string.",
            "parameters": {
                "selector": { "type": "string", "required": true, "title": "CSS selector", "placeholder": "h1, .title" },
                "expected": { "type": "string", "required": true, "title": "Expected text", "placeholder": "Welcome!" }
            },
            "example": { "type": "elementText", "selector": "h1", "expected": "Welcome!" }
        },
        "elementMatches": {
            "category": "HTML",
            "title": "Element content matches a pattern",
            "description": "The element's content matches a regular expression.",
            "parameters": {
                "selector": { "type": "string", "required": true, "title": "CSS selector", "placeholder": "p, .content" },
                "pattern": { "type": "string", "required": true, "title": "Regular expression", "placeholder": "\\d{2}-\\d{2}-\\d{4}" },
                "flags": { "type": "string", "required": false, "title": "Pattern flags", "placeholder": "i" },
                "property": { "type": "select", "required": false, "title": "Content to check", "options": ["textContent", "innerHTML"], "default": "textContent" }
            },
            "example": { "type": "elementMatches", "selector": ".date", "pattern": "\\d{2}\\.\\d{2}\\.\\d{4}", "flags": "g" }
        },
        "elementHasClass": {
            "category": "HTML",
            "title": "Element has a class",
            "description": "The element's class list contains the class.",
            "parameters": {
                "selector": { "type": "string", "required": true, "title": "CSS selector", "placeholder": "button" },
                "className": { "type": "string", "required": true, "title": "Class name", "placeholder": "btn-primary" }
            },
            "example": { "type": "elementHasClass", "selector": "button", "className": "btn-primary" }
        },
        "elementAttribute": {
            "category": "HTML",
            "title": "Attribute value",
            "description": "The attribute's value equals the expected string exactly.",
            "parameters": {
                "selector": { "type": "string", "required": true, "title": "CSS selector", "placeholder": "img" },
                "attribute": { "type": "string", "required": true, "title": "Attribute name", "placeholder": "alt" },
                "expected": { "type": "string", "required": true, "title": "Expected value", "placeholder": "My photo" }
            },
            "example": { "type": "elementAttribute", "selector": "img", "attribute": "alt", "expected": "My photo" }
        },
        "elementHasAttribute": {
            "category": "HTML",
            "title": "Attribute is present",
            "description": "The element carries the attribute, any value.",
            "parameters": {
                "selector": { "type": "string", "required": true, "title": "CSS selector", "placeholder": "img" },
                "attribute": { "type": "string", "required": true, "title": "Attribute name", "placeholder": "src" }
            },
            "example": { "type": "elementHasAttribute", "selector": "img", "attribute": "src" }
        },
        "elementCount": {
            "category": "HTML",
            "title": "Element count",
            "description": "The selector matches exactly the expected number of elements.",
            "parameters": {
                "selector": { "type": "string", "required": true, "title": "CSS selector", "placeholder": "li" },
                "expected": { "type": "number", "required": true, "title": "Expected count", "min": 0, "placeholder": "3" }
            },
            "example": { "type": "elementCount", "selector": "li", "expected": 3 }
        },
        "hasDoctype": {
            "category": "HTML",
            "title": "Document declares a doctype",
            "description": "The document starts with a DOCTYPE declaration, optionally a specific one.",
            "parameters": {
                "expected": { "type": "string", "required": false, "title": "Expected doctype", "placeholder": "html" }
            },
            "example": { "type": "hasDoctype", "expected": "html" }
        },
        "elementInnerHTML": {
            "category": "HTML",
            "title": "Element markup",
            "description": "The element's trimmed serialized markup equals the expected string.",
            "parameters": {
                "selector": { "type": "string", "required": true, "title": "CSS selector", "placeholder": "#result" },
                "expected": { "type": "string", "required": true, "title": "Expected markup", "placeholder": "<b>done</b>" }
            },
            "example": { "type": "elementInnerHTML", "selector": "#result", "expected": "<b>done</b>" }
        },
        "elementContainsText": {
            "category": "HTML",
            "title": "Element contains text",
            "description": "The element's text contains the given substring.",
            "parameters": {
                "selector": { "type": "string", "required": true, "title": "CSS selector", "placeholder": "p" },
                "text": { "type": "string", "required": true, "title": "Substring", "placeholder": "hello" }
            },
            "example": { "type": "elementContainsText", "selector": "p", "text": "hello" }
        },
        "elementAttributeContains": {
            "category": "HTML",
            "title": "Attribute contains",
            "description": "The attribute's value contains the given substring.",
            "parameters": {
                "selector": { "type": "string", "required": true, "title": "CSS selector", "placeholder": "a" },
                "attribute": { "type": "string", "required": true, "title": "Attribute name", "placeholder": "href" },
                "expectedSubstring": { "type": "string", "required": true, "title": "Substring", "placeholder": "https://" }
            },
            "example": { "type": "elementAttributeContains", "selector": "a", "attribute": "href", "expectedSubstring": "https://" }
        },
        "computedStyle": {
            "category": "CSS",
            "title": "Computed style",
            "description": "The resolved value of a style property equals the expected string.",
            "parameters": {
                "selector": { "type": "string", "required": true, "title": "CSS selector", "placeholder": "h1" },
                "property": { "type": "string", "required": true, "title": "Style property", "placeholder": "color" },
                "expected": { "type": "string", "required": true, "title": "Expected value", "placeholder": "red" }
            },
            "example": { "type": "computedStyle", "selector": "h1", "property": "color", "expected": "red" }
        },
        "styleRuleExists": {
            "category": "CSS",
            "title": "Style rule exists",
            "description": "Some author rule uses the given selector.",
            "parameters": {
                "selector": { "type": "string", "required": true, "title": "Rule selector", "placeholder": ".btn" }
            },
            "example": { "type": "styleRuleExists", "selector": ".btn" }
        },
        "styleRuleProperty": {
            "category": "CSS",
            "title": "Style property is set",
            "description": "The property resolves to the expected value, or to anything non-initial when no value is given.",
            "parameters": {
                "selector": { "type": "string", "required": true, "title": "CSS selector", "placeholder": ".btn" },
                "property": { "type": "string", "required": true, "title": "Style property", "placeholder": "background-color" },
                "expected": { "type": "string", "required": false, "title": "Expected value", "placeholder": "blue" }
            },
            "example": { "type": "styleRuleProperty", "selector": ".btn", "property": "background-color" }
        },
        "cssPropertyExists": {
            "category": "CSS",
            "title": "Property declared for selector",
            "description": "The stylesheet declares the property inside a rule with the given selector.",
            "parameters": {
                "selector": { "type": "string", "required": true, "title": "Rule selector", "placeholder": ".card" },
                "property": { "type": "string", "required": true, "title": "Property name", "placeholder": "border-radius" }
            },
            "example": { "type": "cssPropertyExists", "selector": ".card", "property": "border-radius" }
        },
        "cssPropertyCheck": {
            "category": "CSS",
            "title": "Property declared and valued",
            "description": "The property is declared for the selector and, when given, its value matches after normalization (colors, zero lengths, gradients).",
            "parameters": {
                "selector": { "type": "string", "required": true, "title": "Rule selector", "placeholder": ".card" },
                "property": { "type": "string", "required": true, "title": "Property name", "placeholder": "background-color" },
                "expected": { "type": "string", "required": false, "title": "Expected value", "placeholder": "#007bff" }
            },
            "example": { "type": "cssPropertyCheck", "selector": ".card", "property": "background-color", "expected": "#007bff" }
        },
        "jsGlobalDefined": {
            "category": "JavaScript",
            "title": "Global is defined",
            "description": "The name resolves on the page's global scope after scripts run.",
            "parameters": {
                "name": { "type": "string", "required": true, "title": "Global name", "placeholder": "calculateSum" }
            },
            "example": { "type": "jsGlobalDefined", "name": "calculateSum" }
        },
        "jsFunctionDefined": {
            "category": "JavaScript",
            "title": "Function is defined",
            "description": "The name resolves to a function.",
            "parameters": {
                "name": { "type": "string", "required": true, "title": "Function name", "placeholder": "greetUser" }
            },
            "example": { "type": "jsFunctionDefined", "name": "greetUser" }
        },
        "jsExpression": {
            "category": "JavaScript",
            "title": "Expression",
            "description": "An expression evaluated on the page; strict-equal to the expected value, or truthy when none is given.",
            "parameters": {
                "expression": { "type": "string", "required": true, "title": "Expression", "placeholder": "typeof greetUser === 'function'" },
                "expected": { "type": "any", "required": false, "title": "Expected value", "placeholder": "true" }
            },
            "example": { "type": "jsExpression", "expression": "typeof greetUser === 'function'", "expected": true }
        },
        "jsFunctionReturns": {
            "category": "JavaScript",
            "title": "Function return value",
            "description": "Calling the named function with the given arguments returns the expected value.",
            "parameters": {
                "functionName": { "type": "string", "required": true, "title": "Function name", "placeholder": "add" },
                "args": { "type": "array", "required": false, "title": "Arguments", "placeholder": "[2, 3]" },
                "expected": { "type": "any", "required": true, "title": "Expected return value", "placeholder": "5" }
            },
            "example": { "type": "jsFunctionReturns", "functionName": "add", "args": [2, 3], "expected": 5 }
        },
        "jsConsoleContains": {
            "category": "JavaScript",
            "title": "Console output contains",
            "description": "The captured console output contains the substring at the given level.",
            "parameters": {
                "message": { "type": "string", "required": true, "title": "Substring", "placeholder": "Page loaded" },
                "consoleType": { "type": "select", "required": false, "title": "Console level", "options": ["log", "info", "warn", "error"], "default": "log" }
            },
            "example": { "type": "jsConsoleContains", "message": "Page loaded", "consoleType": "log" }
        },
        "eventListenerAttached": {
            "category": "JavaScript",
            "title": "Event listener attached",
            "description": "A listener for the event type was registered while scripts ran.",
            "parameters": {
                "selector": { "type": "string", "required": true, "title": "CSS selector", "placeholder": "button" },
                "eventType": { "type": "string", "required": true, "title": "Event type", "placeholder": "click" }
            },
            "example": { "type": "eventListenerAttached", "selector": "button", "eventType": "click" }
        },
        "eventDispatchChangesDom": {
            "category": "JavaScript",
            "title": "Event changes the page",
            "description": "Dispatching the event at the element changes (or preserves) the body markup, with an optional condition afterwards.",
            "parameters": {
                "selector": { "type": "string", "required": true, "title": "CSS selector", "placeholder": "#magic-button" },
                "eventType": { "type": "string", "required": true, "title": "Event type", "placeholder": "click" },
                "expectChange": { "type": "boolean", "required": false, "title": "Expect a change", "default": true },
                "condition": { "type": "string", "required": false, "title": "Condition after dispatch", "placeholder": "document.querySelector('#out').textContent !== ''" }
            },
            "example": { "type": "eventDispatchChangesDom", "selector": "#magic-button", "eventType": "click", "expectChange": true }
        },
        "codeCheck": {
            "category": "JavaScript",
            "title": "Source contains",
            "description": "The submitted script's source contains the fragment.",
            "parameters": {
                "code": { "type": "string", "required": true, "title": "Source fragment", "placeholder": "addEventListener" }
            },
            "example": { "type": "codeCheck", "code": "addEventListener" }
        },
        "arrayLengthCheck": {
            "category": "JavaScript",
            "title": "Array length",
            "description": "A global array exists and holds at least the expected number of items.",
            "parameters": {
                "array": { "type": "string", "required": true, "title": "Array name", "placeholder": "magicMessages" },
                "expected": { "type": "number", "required": true, "title": "Minimum length", "min": 0, "placeholder": "3" }
            },
            "example": { "type": "arrayLengthCheck", "array": "magicMessages", "expected": 3 }
        },
        "allOf": {
            "category": "Logic",
            "title": "All of",
            "description": "Every sub-rule must pass.",
            "parameters": {
                "rules": { "type": "rules", "required": true, "title": "Sub-rules" }
            },
            "example": { "type": "allOf", "rules": [ { "type": "elementExists", "selector": "h1" } ] }
        },
        "anyOf": {
            "category": "Logic",
            "title": "Any of",
            "description": "At least one sub-rule must pass.",
            "parameters": {
                "rules": { "type": "rules", "required": true, "title": "Sub-rules" }
            },
            "example": { "type": "anyOf", "rules": [ { "type": "elementExists", "selector": "h1" } ] }
        },
        "not": {
            "category": "Logic",
            "title": "Not",
            "description": "Passes exactly when the sub-rule fails.",
            "parameters": {
                "rule": { "type": "rule", "required": true, "title": "Sub-rule" }
            },
            "example": { "type": "not", "rule": { "type": "elementExists", "selector": ".old" } }
        },
        "countAtLeast": {
            "category": "Logic",
            "title": "Count at least",
            "description": "At least the minimum number of sub-rules must pass.",
            "parameters": {
                "minimum": { "type": "number", "required": true, "title": "Minimum passing", "min": 0 },
                "rules": { "type": "rules", "required": true, "title": "Sub-rules" }
            },
            "example": { "type": "countAtLeast", "minimum": 2, "rules": [ { "type": "elementExists", "selector": "h1" }, { "type": "elementExists", "selector": "p" } ] }
        }
    })
}

/// The schema entry for one rule type.
pub fn rule_schema(kind: &str) -> Option<Value> {
    schema().get(kind).cloned()
}

/// The rule categories, in presentation order.
pub fn categories() -> Vec<String> {
    vec![
        "HTML".to_string(),
        "CSS".to_string(),
        "JavaScript".to_string(),
        "Logic".to_string(),
    ]
}

/// Author-time validation of one rule configuration against the schema:
/// unknown types and missing required parameters come back as messages.
/// This is advisory tooling for the Rule Builder; the engine itself never
/// rejects a rule set, it reports problems per rule at evaluation time.
pub fn validate_rule(rule: &Value) -> Vec<String> {
    let mut problems = Vec::new();
    let Some(kind) = rule.get("type").and_then(Value::as_str) else {
        problems.push("Rule is missing the 'type' discriminator.".to_string());
        return problems;
    };
    let Some(entry) = rule_schema(kind) else {
        problems.push(format!("Unknown validation rule type: '{kind}'."));
        return problems;
    };
    if let Some(parameters) = entry.get("parameters").and_then(Value::as_object) {
        for (name, spec) in parameters {
            let required = spec
                .get("required")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if required && rule.get(name).is_none() {
                problems.push(format!(
                    "Rule '{kind}' is missing the required parameter '{name}'."
                ));
            }
        }
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::registry;

    #[test]
    fn schema_and_registry_cover_the_same_types() {
        let schema = schema();
        let schema_types: Vec<&str> = schema
            .as_object()
            .expect("schema should be an object")
            .keys()
            .map(String::as_str)
            .collect();
        let mut registered = registry::known_types();
        for kind in &schema_types {
            assert!(
                registered.contains(kind),
                "schema entry '{kind}' has no evaluator"
            );
        }
        registered.retain(|kind| !schema_types.contains(kind));
        assert!(
            registered.is_empty(),
            "evaluators missing schema entries: {registered:?}"
        );
    }

    #[test]
    fn examples_deserialize_into_rules() {
        let schema = schema();
        for (kind, entry) in schema.as_object().expect("schema should be an object") {
            let example = entry.get("example").expect("every entry has an example");
            let rule: crate::rules::Rule = serde_json::from_value(example.clone())
                .unwrap_or_else(|e| panic!("example for '{kind}' should deserialize: {e}"));
            assert_eq!(&rule.kind, kind);
        }
    }

    #[test]
    fn validation_reports_missing_required_parameters() {
        let problems = validate_rule(&serde_json::json!({ "type": "elementText", "selector": "h1" }));
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("'expected'"));

        let problems = validate_rule(&serde_json::json!({ "type": "doesNotExist" }));
        assert!(problems[0].contains("Unknown validation rule type"));

        assert!(validate_rule(
            &serde_json::json!({ "type": "elementText", "selector": "h1", "expected": "Hi" })
        )
        .is_empty());
    }
}
