use stepcheck::page::{ScriptBridge, compose_document};

#[test]
fn fragment_submissions_become_a_full_document() {
    let wrapped = ScriptBridge::new("function greet() { return 'hi'; }").wrapped();
    let document = compose_document("<h1>Hi</h1>", "h1 { color: red; }", &wrapped);

    assert!(document.starts_with("<html><head><style>h1 { color: red; }</style></head>"));
    assert!(document.contains("<body><h1>Hi</h1><script>"));
    assert!(document.contains("if (typeof greet !== 'undefined') window.greet = greet;"));
    assert!(document.ends_with("</script></body></html>"));
}

#[test]
fn full_document_submissions_keep_their_own_skeleton() {
    let html = "<!DOCTYPE html>\n<html>\n<head><title>Step</title></head>\n<body><p>x</p></body>\n</html>";
    let document = compose_document(html, "p { margin: 0; }", "var ready = true;");

    assert!(document.starts_with("<!DOCTYPE html>"));
    assert!(document.contains("<style>p { margin: 0; }</style></head>"));
    assert!(document.contains("<script>var ready = true;</script></body>"));
    // exactly one skeleton, not a nested one
    assert_eq!(document.matches("<html>").count(), 1);
}

#[test]
fn bridge_defers_execution_until_dom_ready() {
    let wrapped = ScriptBridge::new("document.querySelector('h1');").wrapped();
    assert!(wrapped.starts_with("document.addEventListener('DOMContentLoaded', function () {"));
    assert!(wrapped.ends_with("});"));
}

#[test]
fn bridge_hoists_every_top_level_function() {
    let wrapped = ScriptBridge::new(
        "function first() {}\nconst x = 1;\nfunction second(a, b) { return a + b; }",
    )
    .wrapped();
    assert!(wrapped.contains("if (typeof first !== 'undefined') window.first = first;"));
    assert!(wrapped.contains("if (typeof second !== 'undefined') window.second = second;"));
}

#[test]
fn bridge_leaves_nested_functions_alone() {
    let wrapped = ScriptBridge::new("function outer() { function inner() {} }").wrapped();
    assert!(wrapped.contains("window.outer = outer;"));
    assert!(!wrapped.contains("window.inner"));
}
