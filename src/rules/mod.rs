#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Style rule evaluators.
pub mod css;
/// Structural (markup) rule evaluators.
pub mod html;
/// Script-runtime rule evaluators.
pub mod js;
/// Boolean composition rule evaluators.
pub mod logic;
/// The closed dispatch table from rule type to evaluator.
pub mod registry;
/// Rule Builder metadata and author-time parameter validation.
pub mod schema;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use registry::evaluate_rule;

/// One declarative assertion about a submission, as stored per lesson step.
///
/// Rules are loose JSON objects discriminated by `type`; every other field
/// is optional and only meaningful to the evaluators that read it. Unknown
/// extra fields are tolerated, and an unknown `type` is preserved so the
/// engine can report it instead of failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Rule {
    /// the discriminator, e.g. `elementExists`
    #[serde(rename = "type")]
    pub kind:               String,
    /// CSS selector for element-oriented rules
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector:           Option<String>,
    /// expected value; string, number, or boolean depending on the rule
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected:           Option<Value>,
    /// style property name, or `textContent`/`innerHTML` for `elementMatches`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property:           Option<String>,
    /// attribute name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute:          Option<String>,
    /// class name for `elementHasClass`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name:         Option<String>,
    /// regular expression pattern
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern:            Option<String>,
    /// regular expression flags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags:              Option<String>,
    /// substring for `elementContainsText`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text:               Option<String>,
    /// substring for `elementAttributeContains`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_substring: Option<String>,
    /// global name for `jsGlobalDefined`/`jsFunctionDefined`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name:               Option<String>,
    /// expression source for `jsExpression`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression:         Option<String>,
    /// function name for `jsFunctionReturns`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name:      Option<String>,
    /// invocation arguments for `jsFunctionReturns`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args:               Option<Vec<Value>>,
    /// substring for `jsConsoleContains`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message:            Option<String>,
    /// console level for `jsConsoleContains`, defaults to `log`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub console_type:       Option<String>,
    /// event type for the listener and dispatch rules
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type:         Option<String>,
    /// whether `eventDispatchChangesDom` expects the DOM to change
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expect_change:      Option<bool>,
    /// post-dispatch condition expression
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition:          Option<String>,
    /// source substring for `codeCheck`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code:               Option<String>,
    /// global array name for `arrayLengthCheck`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array:              Option<String>,
    /// sub-rules for `allOf`/`anyOf`/`countAtLeast`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules:              Option<Vec<Rule>>,
    /// the negated sub-rule for `not`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule:               Option<Box<Rule>>,
    /// pass threshold for `countAtLeast`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum:            Option<usize>,
}

impl Rule {
    /// A bare rule of the given type; the tests and doc examples fill in
    /// fields from here.
    pub fn of_kind(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            ..Self::default()
        }
    }

    /// The expected value rendered as display text.
    pub(crate) fn expected_text(&self) -> Option<String> {
        self.expected.as_ref().map(value_text)
    }

    /// The expected value as an integer; authors sometimes write `3.0`.
    pub(crate) fn expected_int(&self) -> Option<i64> {
        self.expected
            .as_ref()
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
    }
}

/// Diagnostic for a rule missing one of its required parameters. The
/// parameter is reported under its serialized (camelCase) name, which is
/// what the author typed.
pub(crate) fn missing_param(kind: &str, field: &str) -> String {
    format!(
        "Rule '{kind}' is missing the required parameter '{}'.",
        camel_case(field)
    )
}

/// Converts a snake_case field identifier to its serialized camelCase name.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for c in field.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.push(c.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Renders a JSON value the way template interpolation would: strings bare,
/// integral numbers without a decimal point.
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => {
                let f = n.as_f64().unwrap_or(0.0);
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    format!("{}", f as i64)
                } else {
                    f.to_string()
                }
            }
        },
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Pulls a required string parameter out of a rule field, or returns the
/// missing-parameter diagnostic for the evaluator to surface.
macro_rules! param {
    ($rule:expr, $field:ident) => {
        match $rule.$field.as_deref() {
            Some(value) => value,
            None => return Some($crate::rules::missing_param(&$rule.kind, stringify!($field))),
        }
    };
}
pub(crate) use param;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_deserialize_from_stored_json() {
        let rule: Rule = serde_json::from_str(
            r#"{"type":"elementAttribute","selector":"img","attribute":"alt","expected":"Test image"}"#,
        )
        .expect("rule should deserialize");
        assert_eq!(rule.kind, "elementAttribute");
        assert_eq!(rule.attribute.as_deref(), Some("alt"));
        assert_eq!(rule.expected_text().as_deref(), Some("Test image"));
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let rule: Rule = serde_json::from_str(
            r#"{"type":"elementExists","selector":"h1","comment":"authored note"}"#,
        )
        .expect("rule should deserialize");
        assert_eq!(rule.kind, "elementExists");
    }

    #[test]
    fn nested_rules_deserialize() {
        let rule: Rule = serde_json::from_str(
            r#"{"type":"allOf","rules":[{"type":"elementExists","selector":"h1"},
                {"type":"not","rule":{"type":"elementExists","selector":".old"}}]}"#,
        )
        .expect("rule should deserialize");
        let rules = rule.rules.expect("sub-rules should parse");
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].rule.as_ref().unwrap().kind, "elementExists");
    }

    #[test]
    fn value_text_renders_like_interpolation() {
        assert_eq!(value_text(&serde_json::json!("hi")), "hi");
        assert_eq!(value_text(&serde_json::json!(5)), "5");
        assert_eq!(value_text(&serde_json::json!(5.0)), "5");
        assert_eq!(value_text(&serde_json::json!(2.5)), "2.5");
        assert_eq!(value_text(&serde_json::json!(true)), "true");
        assert_eq!(value_text(&serde_json::json!(null)), "null");
    }

    #[test]
    fn missing_params_report_serialized_names() {
        assert!(missing_param("elementHasClass", "class_name").contains("'className'"));
    }
}
