#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use itertools::Itertools;

use crate::{
    rules::{Rule, missing_param, registry},
    sandbox::Sandbox,
};

/// `allOf`: every sub-rule must pass; the failure message aggregates every
/// failing sub-message, not just the first.
pub fn all_of(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let Some(rules) = rule.rules.as_ref() else {
        return Some(missing_param(&rule.kind, "rules"));
    };
    let errors: Vec<String> = rules
        .iter()
        .filter_map(|sub| registry::evaluate_rule(sandbox, sub))
        .collect();
    if !errors.is_empty() {
        return Some(format!(
            "Not all requirements were met: {}",
            errors.iter().join("; ")
        ));
    }
    None
}

/// `anyOf`: at least one sub-rule must pass; sub-messages are aggregated
/// only when none do.
pub fn any_of(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let Some(rules) = rule.rules.as_ref() else {
        return Some(missing_param(&rule.kind, "rules"));
    };
    let mut errors = Vec::new();
    let mut any_passed = false;
    for sub in rules {
        match registry::evaluate_rule(sandbox, sub) {
            Some(error) => errors.push(error),
            None => any_passed = true,
        }
    }
    if !any_passed {
        return Some(format!(
            "None of the requirements were met: {}",
            errors.iter().join("; ")
        ));
    }
    None
}

/// `not`: passes exactly when the sub-rule fails. The sub-rule's own
/// message is not surfaced; the learner asked for the inverse, so the
/// interesting fact is that the sub-rule passed.
pub fn not(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let Some(sub) = rule.rule.as_deref() else {
        return Some(missing_param(&rule.kind, "rule"));
    };
    if registry::evaluate_rule(sandbox, sub).is_none() {
        return Some("The requirement should not have been met, but it was.".to_string());
    }
    None
}

/// `countAtLeast`: at least `minimum` sub-rules must pass. A minimum of
/// zero always passes; a minimum above the sub-rule count can never pass.
pub fn count_at_least(sandbox: &mut Sandbox, rule: &Rule) -> Option<String> {
    let Some(rules) = rule.rules.as_ref() else {
        return Some(missing_param(&rule.kind, "rules"));
    };
    let Some(minimum) = rule.minimum else {
        return Some(missing_param(&rule.kind, "minimum"));
    };
    let passed = rules
        .iter()
        .filter(|sub| registry::evaluate_rule(sandbox, sub).is_none())
        .count();
    if passed < minimum {
        return Some(format!(
            "Only {passed} of the required minimum of {minimum} requirements were met."
        ));
    }
    None
}
