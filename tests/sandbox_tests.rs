use stepcheck::{
    page::{ScriptBridge, compose_document},
    sandbox::{Sandbox, SandboxLimits},
};

fn sandbox(html: &str, css: &str, js: &str) -> Sandbox {
    let wrapped = ScriptBridge::new(js).wrapped();
    let document = compose_document(html, css, &wrapped);
    Sandbox::create(&document, js, "https://sandbox.invalid/", &SandboxLimits::default())
        .expect("sandbox should build")
}

#[test]
fn console_calls_are_intercepted_in_order() {
    let sb = sandbox(
        "<p>x</p>",
        "",
        "console.log('first'); console.info('second'); console.warn('third'); console.error('fourth');",
    );
    let entries = sb.console_entries();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0].level, "log");
    assert_eq!(entries[0].message, "first");
    assert_eq!(entries[1].level, "info");
    assert_eq!(entries[3].level, "error");
    assert!(sb.console_contains("warn", "third"));
    assert!(!sb.console_contains("log", "third"));
}

#[test]
fn console_joins_arguments_with_spaces() {
    let sb = sandbox("<p>x</p>", "", "console.log('sum is', 1 + 2);");
    assert!(sb.console_contains("log", "sum is 3"));
}

#[test]
fn scripts_see_the_parsed_dom() {
    let sb = sandbox(
        "<ul><li>One</li><li>Two</li></ul>",
        "",
        "console.log(document.querySelectorAll('li').length);",
    );
    assert!(sb.console_contains("log", "2"));
}

#[test]
fn scripts_mutate_the_live_dom() {
    let sb = sandbox(
        "<div id=\"out\">before</div>",
        "",
        "document.getElementById('out').textContent = 'after';",
    );
    let out = sb.query_first("#out").unwrap().expect("div should exist");
    assert_eq!(sb.text_content(out), "after");
}

#[test]
fn created_elements_appear_in_queries() {
    let sb = sandbox(
        "<ul id=\"list\"></ul>",
        "",
        "var li = document.createElement('li');\
         li.textContent = 'new';\
         document.getElementById('list').appendChild(li);",
    );
    let items = sb.query_all("#list li").unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(sb.text_content(items[0]), "new");
}

#[test]
fn class_list_mutations_are_visible() {
    let sb = sandbox(
        "<button id=\"go\" class=\"btn\">x</button>",
        "",
        "var b = document.getElementById('go');\
         b.classList.add('active');\
         b.classList.remove('btn');",
    );
    let button = sb.query_first("#go").unwrap().expect("button should exist");
    assert!(sb.has_class(button, "active"));
    assert!(!sb.has_class(button, "btn"));
}

#[test]
fn listener_registrations_are_recorded() {
    let sb = sandbox(
        "<button id=\"go\" class=\"btn\">x</button>",
        "",
        "document.getElementById('go').addEventListener('click', function () {});",
    );
    assert!(sb.listener_attached("click"));
    assert!(!sb.listener_attached("mouseover"));
}

#[test]
fn dom_content_loaded_callbacks_run_immediately() {
    let sb = sandbox(
        "<p id=\"target\">x</p>",
        "",
        // the bridge already wraps submissions this way; a nested listener
        // must still fire
        "document.addEventListener('DOMContentLoaded', function () { console.log('ready'); });",
    );
    assert!(sb.console_contains("log", "ready"));
}

#[test]
fn hoisted_functions_are_reachable_as_globals() {
    let mut sb = sandbox(
        "<p>x</p>",
        "",
        "function add(a, b) { return a + b; }",
    );
    assert!(sb.global_defined("add"));
    assert!(sb.global_is_function("add"));
    let result = sb
        .call_global("add", &[serde_json::json!(2), serde_json::json!(3)])
        .expect("call should succeed");
    assert!(sb.strict_equals_json(&result, &serde_json::json!(5)));
}

#[test]
fn dispatch_runs_listeners_and_inline_handlers() {
    let mut sb = sandbox(
        "<button id=\"go\" onclick=\"inlineHit()\">Click me</button>",
        "",
        "function inlineHit() { document.getElementById('go').setAttribute('data-inline', 'yes'); }\
         document.getElementById('go').addEventListener('click', function () {\
             this.textContent = 'Clicked!';\
         });",
    );
    let button = sb.query_first("#go").unwrap().expect("button should exist");
    let before = sb.body_snapshot();
    sb.dispatch_event(button, "click").expect("dispatch should succeed");
    let after = sb.body_snapshot();

    assert_ne!(before, after);
    assert_eq!(sb.text_content(button), "Clicked!");
    assert_eq!(sb.attr(button, "data-inline").as_deref(), Some("yes"));
}

#[test]
fn dispatch_bubbles_to_ancestor_listeners() {
    let mut sb = sandbox(
        "<div id=\"wrap\"><button id=\"go\">x</button></div>",
        "",
        "document.getElementById('wrap').addEventListener('click', function () {\
             console.log('bubbled');\
         });",
    );
    let button = sb.query_first("#go").unwrap().expect("button should exist");
    sb.dispatch_event(button, "click").expect("dispatch should succeed");
    assert!(sb.console_contains("log", "bubbled"));
}

#[test]
fn zero_delay_timers_run_during_settle() {
    let sb = sandbox(
        "<p>x</p>",
        "",
        "setTimeout(function () { console.log('deferred'); }, 0);",
    );
    assert!(sb.console_contains("log", "deferred"));
}

#[test]
fn timers_beyond_the_window_never_run() {
    let sb = sandbox(
        "<p>x</p>",
        "",
        "setTimeout(function () { console.log('late'); }, 60000);",
    );
    assert!(!sb.console_contains("log", "late"));
}

#[test]
fn cleared_timers_never_run() {
    let sb = sandbox(
        "<p>x</p>",
        "",
        "var id = setTimeout(function () { console.log('cleared'); }, 0); clearTimeout(id);",
    );
    assert!(!sb.console_contains("log", "cleared"));
}

#[test]
fn script_errors_become_console_entries_not_crashes() {
    let sb = sandbox("<p>x</p>", "", "this is not valid javascript {{{");
    let entries = sb.console_entries();
    assert!(entries.iter().any(|e| e.level == "error"));
}

#[test]
fn runaway_loops_terminate_inside_the_engine() {
    let wrapped = ScriptBridge::new("while (true) {}").wrapped();
    let document = compose_document("<p>x</p>", "", &wrapped);
    let limits = SandboxLimits {
        loop_iteration_limit: 10_000,
        ..SandboxLimits::default()
    };
    let sb = Sandbox::create(&document, "while (true) {}", "https://sandbox.invalid/", &limits)
        .expect("sandbox should survive a runaway script");
    assert!(sb.console_entries().iter().any(|e| e.level == "error"));
}

#[test]
fn consecutive_sandboxes_share_no_state() {
    let first = sandbox("<p>x</p>", "", "console.log('from first');");
    assert!(first.console_contains("log", "from first"));
    drop(first);

    let second = sandbox("<p>y</p>", "", "");
    assert!(second.console_entries().is_empty());
    assert!(!second.listener_attached("click"));
}

#[test]
fn computed_style_resolves_through_the_cascade() {
    let sb = sandbox(
        "<h1 class=\"title\">Hi</h1>",
        "h1 { color: blue; } .title { color: red; }",
        "",
    );
    let h1 = sb.query_first("h1").unwrap().expect("h1 should exist");
    assert_eq!(sb.computed_style(h1, "color").as_deref(), Some("red"));
}

#[test]
fn style_mutations_from_scripts_win_the_cascade() {
    let sb = sandbox(
        "<h1 id=\"t\">Hi</h1>",
        "h1 { color: blue; }",
        "document.getElementById('t').style.color = 'green';",
    );
    let h1 = sb.query_first("#t").unwrap().expect("h1 should exist");
    assert_eq!(sb.computed_style(h1, "color").as_deref(), Some("green"));
}
