#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use crate::{
    rules::{Rule, css, html, js, logic},
    sandbox::Sandbox,
};

/// Signature every rule evaluator shares: `None` is a pass, `Some` carries
/// the learner-facing failure message.
pub type EvalFn = fn(&mut Sandbox, &Rule) -> Option<String>;

/// The closed dispatch table from `type` discriminator to evaluator.
///
/// Adding a rule type means adding a row here and a matching entry in
/// [`crate::rules::schema`]; a test keeps the two in sync.
pub const REGISTRY: &[(&str, EvalFn)] = &[
    // structural
    ("elementExists", html::element_exists),
    ("elementNotExists", html::element_not_exists),
    ("elementText", html::element_text),
    ("elementMatches", html::element_matches),
    ("elementHasClass", html::element_has_class),
    ("elementAttribute", html::element_attribute),
    ("elementHasAttribute", html::element_has_attribute),
    ("elementCount", html::element_count),
    ("hasDoctype", html::has_doctype),
    ("elementInnerHTML", html::element_inner_html),
    ("elementContainsText", html::element_contains_text),
    ("elementAttributeContains", html::element_attribute_contains),
    // style
    ("computedStyle", css::computed_style),
    ("styleRuleExists", css::style_rule_exists),
    ("styleRuleProperty", css::style_rule_property),
    ("cssPropertyExists", css::css_property_exists),
    ("cssPropertyCheck", css::css_property_check),
    // script runtime
    ("jsGlobalDefined", js::js_global_defined),
    ("jsFunctionDefined", js::js_function_defined),
    ("jsExpression", js::js_expression),
    ("jsFunctionReturns", js::js_function_returns),
    ("jsConsoleContains", js::js_console_contains),
    ("eventListenerAttached", js::event_listener_attached),
    ("eventDispatchChangesDom", js::event_dispatch_changes_dom),
    ("codeCheck", js::code_check),
    ("arrayLengthCheck", js::array_length_check),
    // composition
    ("allOf", logic::all_of),
    ("anyOf", logic::any_of),
    ("not", logic::not),
    ("countAtLeast", logic::count_at_least),
];

/// Looks an evaluator up by its discriminator.
pub fn lookup(kind: &str) -> Option<EvalFn> {
    REGISTRY
        .iter()
        .find(|(name, _)| *name == kind)
        .map(|(_, f)| *f)
}

/// Every registered rule type, in registry order.
pub fn known_types() -> Vec<&'static str> {
    REGISTRY.iter().map(|(name, _)| *name).collect()
}

/// Evaluates one rule against the sandbox. An unrecognized type produces a
/// diagnostic string, never an error: one misauthored rule must not take
/// down the rest of the step's feedback.
pub fn evaluate_rule(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    match lookup(&rule.kind) {
        Some(evaluate) => evaluate(sandbox, rule),
        None => Some(format!("Unknown validation rule type: '{}'.", rule.kind)),
    }
}
