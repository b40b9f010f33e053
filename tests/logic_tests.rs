use serde_json::json;
use stepcheck::{
    page::{ScriptBridge, compose_document},
    rules::{Rule, registry},
    sandbox::{Sandbox, SandboxLimits},
};

fn fixture() -> Sandbox {
    let wrapped = ScriptBridge::new("").wrapped();
    let document = compose_document("<h1>Hi</h1><button>Go</button>", "", &wrapped);
    Sandbox::create(&document, "", "https://sandbox.invalid/", &SandboxLimits::default())
        .expect("fixture sandbox should build")
}

fn check(sandbox: &mut Sandbox, rule: serde_json::Value) -> Option<String> {
    let rule: Rule = serde_json::from_value(rule).expect("rule should deserialize");
    registry::evaluate_rule(sandbox, &rule)
}

fn exists(selector: &str) -> serde_json::Value {
    json!({"type": "elementExists", "selector": selector})
}

#[test]
fn all_of_passes_when_every_sub_rule_passes() {
    let mut sb = fixture();
    assert_eq!(
        check(&mut sb, json!({"type": "allOf", "rules": [exists("h1"), exists("button")]})),
        None
    );
}

#[test]
fn all_of_aggregates_every_failing_sub_message() {
    let mut sb = fixture();
    let error = check(
        &mut sb,
        json!({"type": "allOf", "rules": [exists(".missing-a"), exists("h1"), exists(".missing-b")]}),
    )
    .expect("failing sub-rules should fail the conjunction");
    assert!(error.contains("Not all requirements were met"));
    assert!(error.contains("'.missing-a'"));
    assert!(error.contains("'.missing-b'"));
}

#[test]
fn any_of_passes_with_one_passing_sub_rule() {
    let mut sb = fixture();
    assert_eq!(
        check(&mut sb, json!({"type": "anyOf", "rules": [exists(".missing"), exists("h1")]})),
        None
    );
}

#[test]
fn any_of_fails_only_when_all_fail() {
    let mut sb = fixture();
    let error = check(
        &mut sb,
        json!({"type": "anyOf", "rules": [exists(".missing-a"), exists(".missing-b")]}),
    )
    .expect("all-failing disjunction should fail");
    assert!(error.contains("None of the requirements were met"));
    assert!(error.contains("'.missing-a'"));
    assert!(error.contains("'.missing-b'"));
}

#[test]
fn not_inverts_and_hides_the_sub_message() {
    let mut sb = fixture();
    assert_eq!(check(&mut sb, json!({"type": "not", "rule": exists(".missing")})), None);

    let error = check(&mut sb, json!({"type": "not", "rule": exists("h1")}))
        .expect("a passing sub-rule should fail the negation");
    assert!(error.contains("should not have been met"));
    assert!(!error.contains("h1"));
}

#[test]
fn all_of_any_of_duality() {
    let mut sb = fixture();
    // allOf fails iff any sub-rule fails
    assert!(check(&mut sb, json!({"type": "allOf", "rules": [exists("h1"), exists(".x")]})).is_some());
    // anyOf fails iff every sub-rule fails
    assert!(check(&mut sb, json!({"type": "anyOf", "rules": [exists("h1"), exists(".x")]})).is_none());
    // not passes iff the sub-rule fails
    assert!(check(&mut sb, json!({"type": "not", "rule": exists(".x")})).is_none());
}

#[test]
fn count_at_least_thresholds() {
    let mut sb = fixture();
    let rules = json!([exists("h1"), exists("button"), exists(".missing")]);
    assert_eq!(
        check(&mut sb, json!({"type": "countAtLeast", "minimum": 2, "rules": rules.clone()})),
        None
    );
    let error = check(&mut sb, json!({"type": "countAtLeast", "minimum": 3, "rules": rules}))
        .expect("two of three should not satisfy a minimum of three");
    assert!(error.contains("Only 2"));
    assert!(error.contains("minimum of 3"));
}

#[test]
fn count_at_least_boundaries() {
    let mut sb = fixture();
    // minimum zero always passes, even over failing sub-rules
    assert_eq!(
        check(
            &mut sb,
            json!({"type": "countAtLeast", "minimum": 0, "rules": [exists(".missing")]})
        ),
        None
    );
    // a minimum above the sub-rule count can never pass
    assert!(
        check(
            &mut sb,
            json!({"type": "countAtLeast", "minimum": 3, "rules": [exists("h1"), exists("button")]})
        )
        .is_some()
    );
}

#[test]
fn compositions_nest() {
    let mut sb = fixture();
    assert_eq!(
        check(
            &mut sb,
            json!({
                "type": "allOf",
                "rules": [
                    {"type": "anyOf", "rules": [exists(".missing"), exists("h1")]},
                    {"type": "not", "rule": exists(".missing")},
                    {"type": "countAtLeast", "minimum": 1, "rules": [exists("button")]}
                ]
            })
        ),
        None
    );
}

#[test]
fn unknown_sub_rules_fail_their_branch_without_aborting() {
    let mut sb = fixture();
    // inside `not`, the unknown sub-rule counts as a failure, so the
    // negation passes
    assert_eq!(
        check(&mut sb, json!({"type": "not", "rule": {"type": "doesNotExist"}})),
        None
    );
    let error = check(
        &mut sb,
        json!({"type": "allOf", "rules": [{"type": "doesNotExist"}, exists("h1")]}),
    )
    .expect("unknown sub-rule should fail the conjunction");
    assert!(error.contains("Unknown validation rule type"));
}
