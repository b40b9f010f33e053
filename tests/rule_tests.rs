use serde_json::json;
use stepcheck::{
    page::{ScriptBridge, compose_document},
    rules::{Rule, registry},
    sandbox::{Sandbox, SandboxLimits},
};

const HTML: &str = r#"
  <div class="container">
    <h1 id="title">Welcome to My Site</h1>
    <p class="intro">This is a test paragraph.</p>
    <ul>
      <li>Item 1</li>
      <li>Item 2</li>
      <li>Item 3</li>
    </ul>
    <img src="test.jpg" alt="Test image" class="responsive">
    <button id="click-btn" class="btn btn-primary">Click me</button>
  </div>
"#;

const CSS: &str = r#"
  .container { max-width: 1200px; margin: 0 auto; }
  .btn-primary { background-color: #007bff; color: white; }
  .responsive { max-width: 100%; height: auto; }
"#;

const JS: &str = r#"
  function greetUser(name) {
    return "Hello, " + name + "!";
  }

  function boom() {
    throw new Error("nope");
  }

  var magicMessages = ["a", "b", "c"];

  console.log("Page loaded successfully");

  var button = document.getElementById('click-btn');
  if (button) {
    button.addEventListener('click', function () {
      this.textContent = 'Clicked!';
    });
  }
"#;

fn fixture() -> Sandbox {
    let wrapped = ScriptBridge::new(JS).wrapped();
    let document = compose_document(HTML, CSS, &wrapped);
    Sandbox::create(&document, JS, "https://sandbox.invalid/", &SandboxLimits::default())
        .expect("fixture sandbox should build")
}

fn check(sandbox: &mut Sandbox, rule: serde_json::Value) -> Option<String> {
    let rule: Rule = serde_json::from_value(rule).expect("rule should deserialize");
    registry::evaluate_rule(sandbox, &rule)
}

#[test]
fn element_exists() {
    let mut sb = fixture();
    assert_eq!(check(&mut sb, json!({"type": "elementExists", "selector": "h1"})), None);
    let error = check(&mut sb, json!({"type": "elementExists", "selector": ".nonexistent"}))
        .expect("missing element should fail");
    assert!(error.contains("'.nonexistent'"));
}

#[test]
fn element_not_exists() {
    let mut sb = fixture();
    assert_eq!(
        check(&mut sb, json!({"type": "elementNotExists", "selector": ".nonexistent"})),
        None
    );
    assert!(
        check(&mut sb, json!({"type": "elementNotExists", "selector": "h1"}))
            .expect("present element should fail")
            .contains("should not exist")
    );
}

#[test]
fn element_text_exact_match() {
    let mut sb = fixture();
    assert_eq!(
        check(
            &mut sb,
            json!({"type": "elementText", "selector": "h1", "expected": "Welcome to My Site"})
        ),
        None
    );
    let error = check(
        &mut sb,
        json!({"type": "elementText", "selector": "h1", "expected": "Wrong text"}),
    )
    .expect("wrong text should fail");
    assert!(error.contains("'Welcome to My Site'"));
    assert!(error.contains("'Wrong text'"));
}

#[test]
fn element_matches_pattern() {
    let mut sb = fixture();
    assert_eq!(
        check(
            &mut sb,
            json!({"type": "elementMatches", "selector": ".intro", "pattern": "test\\s+paragraph"})
        ),
        None
    );
    assert!(
        check(
            &mut sb,
            json!({"type": "elementMatches", "selector": ".intro", "pattern": "TEST", "flags": ""})
        )
        .is_some()
    );
    // case-insensitive flag flips the outcome
    assert_eq!(
        check(
            &mut sb,
            json!({"type": "elementMatches", "selector": ".intro", "pattern": "TEST", "flags": "i"})
        ),
        None
    );
    // an invalid pattern is a diagnostic, not a crash
    assert!(
        check(
            &mut sb,
            json!({"type": "elementMatches", "selector": ".intro", "pattern": "("})
        )
        .expect("invalid pattern should produce a message")
        .contains("Error evaluating pattern")
    );
}

#[test]
fn element_class_and_attributes() {
    let mut sb = fixture();
    assert_eq!(
        check(
            &mut sb,
            json!({"type": "elementHasClass", "selector": "button", "className": "btn-primary"})
        ),
        None
    );
    assert!(
        check(
            &mut sb,
            json!({"type": "elementHasClass", "selector": "button", "className": "missing"})
        )
        .is_some()
    );
    assert_eq!(
        check(
            &mut sb,
            json!({"type": "elementAttribute", "selector": "img", "attribute": "alt", "expected": "Test image"})
        ),
        None
    );
    let error = check(
        &mut sb,
        json!({"type": "elementAttribute", "selector": "img", "attribute": "alt", "expected": "Other"}),
    )
    .expect("wrong attribute value should fail");
    assert!(error.contains("'Test image'"));
    assert_eq!(
        check(
            &mut sb,
            json!({"type": "elementHasAttribute", "selector": "img", "attribute": "src"})
        ),
        None
    );
    assert_eq!(
        check(
            &mut sb,
            json!({"type": "elementAttributeContains", "selector": "img", "attribute": "src", "expectedSubstring": ".jpg"})
        ),
        None
    );
}

#[test]
fn element_count_reports_found_and_expected() {
    let mut sb = fixture();
    assert_eq!(
        check(&mut sb, json!({"type": "elementCount", "selector": "li", "expected": 3})),
        None
    );
    let error = check(&mut sb, json!({"type": "elementCount", "selector": "li", "expected": 4}))
        .expect("wrong count should fail");
    assert!(error.contains("Found 3"));
    assert!(error.contains("expected 4"));
}

#[test]
fn element_contains_text() {
    let mut sb = fixture();
    assert_eq!(
        check(
            &mut sb,
            json!({"type": "elementContainsText", "selector": ".intro", "text": "test paragraph"})
        ),
        None
    );
    assert!(
        check(
            &mut sb,
            json!({"type": "elementContainsText", "selector": ".intro", "text": "absent"})
        )
        .is_some()
    );
}

#[test]
fn doctype_detection() {
    // fragments are wrapped without a doctype
    let mut fragment = fixture();
    assert!(check(&mut fragment, json!({"type": "hasDoctype"})).is_some());
    drop(fragment);

    let full = "<!DOCTYPE html><html><head></head><body><p>x</p></body></html>";
    let document = compose_document(full, "", &ScriptBridge::new("").wrapped());
    let mut sb = Sandbox::create(&document, "", "https://sandbox.invalid/", &SandboxLimits::default())
        .expect("sandbox should build");
    assert_eq!(check(&mut sb, json!({"type": "hasDoctype"})), None);
    assert_eq!(check(&mut sb, json!({"type": "hasDoctype", "expected": "HTML"})), None);
    assert!(check(&mut sb, json!({"type": "hasDoctype", "expected": "xhtml"})).is_some());
}

#[test]
fn computed_style_rules() {
    let mut sb = fixture();
    assert_eq!(
        check(
            &mut sb,
            json!({"type": "computedStyle", "selector": ".container", "property": "max-width", "expected": "1200px"})
        ),
        None
    );
    let error = check(
        &mut sb,
        json!({"type": "computedStyle", "selector": ".container", "property": "max-width", "expected": "900px"}),
    )
    .expect("wrong style should fail");
    assert!(error.contains("'1200px'"));
    assert!(error.contains("'900px'"));
}

#[test]
fn style_rule_existence_and_property() {
    let mut sb = fixture();
    assert_eq!(
        check(&mut sb, json!({"type": "styleRuleExists", "selector": ".btn-primary"})),
        None
    );
    assert!(
        check(&mut sb, json!({"type": "styleRuleExists", "selector": ".ghost"})).is_some()
    );
    // with an expected value
    assert_eq!(
        check(
            &mut sb,
            json!({"type": "styleRuleProperty", "selector": ".btn-primary", "property": "color", "expected": "white"})
        ),
        None
    );
    // without one: merely set
    assert_eq!(
        check(
            &mut sb,
            json!({"type": "styleRuleProperty", "selector": ".btn-primary", "property": "background-color"})
        ),
        None
    );
    assert!(
        check(
            &mut sb,
            json!({"type": "styleRuleProperty", "selector": ".btn-primary", "property": "border-radius"})
        )
        .expect("unset property should fail")
        .contains("is not set")
    );
}

#[test]
fn css_property_rules_normalize_values() {
    let mut sb = fixture();
    assert_eq!(
        check(
            &mut sb,
            json!({"type": "cssPropertyExists", "selector": ".btn-primary", "property": "background-color"})
        ),
        None
    );
    assert!(
        check(
            &mut sb,
            json!({"type": "cssPropertyExists", "selector": ".btn-primary", "property": "border"})
        )
        .is_some()
    );
    // hex and named colors compare equal through normalization
    assert_eq!(
        check(
            &mut sb,
            json!({"type": "cssPropertyCheck", "selector": ".btn-primary", "property": "background-color", "expected": "#007bff"})
        ),
        None
    );
    assert_eq!(
        check(
            &mut sb,
            json!({"type": "cssPropertyCheck", "selector": ".btn-primary", "property": "color", "expected": "WHITE"})
        ),
        None
    );
    assert!(
        check(
            &mut sb,
            json!({"type": "cssPropertyCheck", "selector": ".btn-primary", "property": "background-color", "expected": "red"})
        )
        .is_some()
    );
}

#[test]
fn js_globals_and_functions() {
    let mut sb = fixture();
    assert_eq!(check(&mut sb, json!({"type": "jsGlobalDefined", "name": "greetUser"})), None);
    assert!(
        check(&mut sb, json!({"type": "jsGlobalDefined", "name": "missingThing"})).is_some()
    );
    assert_eq!(check(&mut sb, json!({"type": "jsFunctionDefined", "name": "greetUser"})), None);
    assert!(
        check(&mut sb, json!({"type": "jsFunctionDefined", "name": "magicMessages"})).is_some()
    );
}

#[test]
fn js_function_returns() {
    let mut sb = fixture();
    assert_eq!(
        check(
            &mut sb,
            json!({"type": "jsFunctionReturns", "functionName": "greetUser", "args": ["World"], "expected": "Hello, World!"})
        ),
        None
    );
    let error = check(
        &mut sb,
        json!({"type": "jsFunctionReturns", "functionName": "greetUser", "args": ["World"], "expected": "Goodbye"}),
    )
    .expect("wrong return should fail");
    assert!(error.contains("'Hello, World!'"));
    // exceptions become a message, never a crash
    assert!(
        check(
            &mut sb,
            json!({"type": "jsFunctionReturns", "functionName": "boom", "args": [], "expected": 1})
        )
        .expect("throwing function should fail")
        .contains("Error calling function 'boom'")
    );
    assert!(
        check(
            &mut sb,
            json!({"type": "jsFunctionReturns", "functionName": "missing", "expected": 1})
        )
        .expect("missing function should fail")
        .contains("not a function")
    );
}

#[test]
fn js_expression() {
    let mut sb = fixture();
    assert_eq!(
        check(
            &mut sb,
            json!({"type": "jsExpression", "expression": "typeof greetUser === 'function'", "expected": true})
        ),
        None
    );
    assert_eq!(
        check(&mut sb, json!({"type": "jsExpression", "expression": "1 + 1"})),
        None
    );
    assert!(
        check(&mut sb, json!({"type": "jsExpression", "expression": "0"}))
            .expect("falsy expression should fail")
            .contains("falsy")
    );
    assert!(
        check(&mut sb, json!({"type": "jsExpression", "expression": "nope.nope"}))
            .expect("throwing expression should fail")
            .contains("Error evaluating expression")
    );
}

#[test]
fn js_console_contains() {
    let mut sb = fixture();
    assert_eq!(
        check(
            &mut sb,
            json!({"type": "jsConsoleContains", "message": "Page loaded successfully"})
        ),
        None
    );
    let error = check(
        &mut sb,
        json!({"type": "jsConsoleContains", "message": "Page loaded", "consoleType": "warn"}),
    )
    .expect("wrong level should fail");
    assert!(error.contains("level: warn"));
}

#[test]
fn event_listener_attached_is_coarse_by_event_type() {
    let mut sb = fixture();
    assert_eq!(
        check(
            &mut sb,
            json!({"type": "eventListenerAttached", "selector": "button", "eventType": "click"})
        ),
        None
    );
    assert!(
        check(
            &mut sb,
            json!({"type": "eventListenerAttached", "selector": "button", "eventType": "mouseover"})
        )
        .expect("unregistered event type should fail")
        .contains("'mouseover'")
    );
}

#[test]
fn event_dispatch_changes_dom() {
    let mut sb = fixture();
    assert_eq!(
        check(
            &mut sb,
            json!({
                "type": "eventDispatchChangesDom",
                "selector": "#click-btn",
                "eventType": "click",
                "expectChange": true,
                "condition": "document.getElementById('click-btn').textContent === 'Clicked!'"
            })
        ),
        None
    );
    drop(sb);

    // an element with no handlers: no change expected, and expecting one fails
    let mut sb = fixture();
    assert_eq!(
        check(
            &mut sb,
            json!({"type": "eventDispatchChangesDom", "selector": "h1", "eventType": "click", "expectChange": false})
        ),
        None
    );
    assert!(
        check(
            &mut sb,
            json!({"type": "eventDispatchChangesDom", "selector": "h1", "eventType": "click", "expectChange": true})
        )
        .expect("no change should fail the expectation")
        .contains("did not change")
    );
}

#[test]
fn code_check_and_array_length() {
    let mut sb = fixture();
    assert_eq!(check(&mut sb, json!({"type": "codeCheck", "code": "addEventListener"})), None);
    assert!(check(&mut sb, json!({"type": "codeCheck", "code": "fetch("})).is_some());
    assert_eq!(
        check(&mut sb, json!({"type": "arrayLengthCheck", "array": "magicMessages", "expected": 3})),
        None
    );
    let error = check(
        &mut sb,
        json!({"type": "arrayLengthCheck", "array": "magicMessages", "expected": 5}),
    )
    .expect("short array should fail");
    assert!(error.contains("has 3 items"));
    assert!(
        check(&mut sb, json!({"type": "arrayLengthCheck", "array": "greetUser", "expected": 1}))
            .expect("non-array should fail")
            .contains("is not an array")
    );
}

#[test]
fn unknown_rule_types_produce_a_message_and_never_panic() {
    let mut sb = fixture();
    let error = check(&mut sb, json!({"type": "doesNotExist"}))
        .expect("unknown type should produce a message");
    assert!(error.contains("Unknown validation rule type: 'doesNotExist'"));
}

#[test]
fn missing_parameters_produce_a_message_and_never_panic() {
    let mut sb = fixture();
    let error = check(&mut sb, json!({"type": "elementExists"}))
        .expect("missing selector should produce a message");
    assert!(error.contains("'selector'"));
    let error = check(&mut sb, json!({"type": "elementText", "selector": "h1"}))
        .expect("missing expected should produce a message");
    assert!(error.contains("'expected'"));
}
