#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::time::Duration;

use anyhow::{Context as _, Result, anyhow};
use boa_engine::{Context, JsString, JsValue, Source};

use crate::{
    constants::{DEFAULT_QUIESCENCE, LOOP_ITERATION_LIMIT, MAX_SCRIPT_BYTES, RECURSION_LIMIT},
    css::{computed_value, normalize_selector_text, parse_stylesheet},
    dom::{
        selector::SelectorList,
        tree::{DomTree, NodeId},
    },
    sandbox::{
        bindings,
        state::{self, ConsoleEntry, SandboxState, TimerRecord},
    },
};

/// Ceiling on settle rounds, so self-rescheduling timers terminate.
const MAX_TIMER_ROUNDS: usize = 8;

/// Per-sandbox execution limits.
#[derive(Debug, Clone, Copy)]
pub struct SandboxLimits {
    /// settle window for deferred setup code (timers, microtasks)
    pub quiescence:           Duration,
    /// largest script the sandbox will execute
    pub max_script_bytes:     usize,
    /// loop-iteration ceiling inside the script engine
    pub loop_iteration_limit: u64,
    /// call-stack depth ceiling inside the script engine
    pub recursion_limit:      usize,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            quiescence:           DEFAULT_QUIESCENCE,
            max_script_bytes:     MAX_SCRIPT_BYTES,
            loop_iteration_limit: LOOP_ITERATION_LIMIT,
            recursion_limit:      RECURSION_LIMIT,
        }
    }
}

/// An isolated DOM+script execution context for one submission.
///
/// Creation parses the composed document, installs the interception state
/// and script bindings, executes every embedded script in document order,
/// and settles deferred work, so rules observe the submission at rest.
/// Exactly one sandbox exists per evaluation; dropping it tears the
/// per-thread state down.
///
/// Scripts run with full language power but no host capabilities beyond the
/// installed bindings. This is the platform's documented trust boundary, not
/// a hardened jail.
pub struct Sandbox {
    /// the script engine context
    context: Context,
}

impl Sandbox {
    /// Builds a sandbox from a composed document.
    ///
    /// * `document`: the composed HTML document string
    /// * `raw_js`: the submission's script before wrapping, for source checks
    /// * `base_url`: reported to scripts via `location`
    /// * `limits`: execution ceilings for this sandbox
    pub fn create(
        document: &str,
        raw_js: &str,
        base_url: &str,
        limits: &SandboxLimits,
    ) -> Result<Self> {
        let dom =
            DomTree::from_html(document).context("could not parse the composed document")?;

        let mut sheets = Vec::new();
        let mut sheets_failed = false;
        for source in dom.style_sources() {
            match parse_stylesheet(&source) {
                Ok(sheet) => sheets.push(sheet),
                Err(error) => {
                    tracing::debug!("stylesheet skipped: {error}");
                    sheets_failed = true;
                }
            }
        }

        let scripts = dom.script_sources();
        state::install(SandboxState::new(dom, sheets, sheets_failed, raw_js.to_string()));

        let mut context = Context::default();
        context
            .runtime_limits_mut()
            .set_loop_iteration_limit(limits.loop_iteration_limit);
        context
            .runtime_limits_mut()
            .set_recursion_limit(limits.recursion_limit);

        if let Err(error) = bindings::install(&mut context, base_url) {
            state::teardown();
            return Err(anyhow!("could not install sandbox bindings: {error}"));
        }

        for script in scripts {
            if script.len() > limits.max_script_bytes {
                state::with(|s| {
                    s.log(
                        "error",
                        format!(
                            "Script skipped ({} KB exceeds the {} KB limit)",
                            script.len() / 1024,
                            limits.max_script_bytes / 1024
                        ),
                    );
                });
                continue;
            }
            if let Err(error) = context.eval(Source::from_bytes(script.as_bytes())) {
                state::with(|s| s.log("error", format!("Uncaught {error}")));
            }
        }
        let _ = context.run_jobs();

        settle(&mut context, limits.quiescence);

        Ok(Self { context })
    }

    /// Every element matching the selector, in document order.
    pub fn query_all(&self, selector: &str) -> Result<Vec<NodeId>, String> {
        let list = SelectorList::parse(selector)?;
        Ok(state::with(|s| list.query_all(&s.dom)))
    }

    /// The first element matching the selector.
    pub fn query_first(&self, selector: &str) -> Result<Option<NodeId>, String> {
        Ok(self.query_all(selector)?.into_iter().next())
    }

    /// Subtree text of an element.
    pub fn text_content(&self, node: NodeId) -> String {
        state::with(|s| s.dom.text_content(node))
    }

    /// Serialized markup of an element's children.
    pub fn inner_html(&self, node: NodeId) -> String {
        state::with(|s| s.dom.inner_html(node))
    }

    /// Attribute value of an element.
    pub fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        state::with(|s| s.dom.attr(node, name).map(str::to_string))
    }

    /// True when the element carries the attribute.
    pub fn has_attr(&self, node: NodeId, name: &str) -> bool {
        state::with(|s| s.dom.has_attr(node, name))
    }

    /// True when the element's class list contains `class`.
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        state::with(|s| s.dom.has_class(node, class))
    }

    /// The document's declared doctype name, lowercased.
    pub fn doctype(&self) -> Option<String> {
        state::with(|s| s.dom.doctype().map(str::to_string))
    }

    /// The cascaded style value of `property` on `node`.
    pub fn computed_style(&self, node: NodeId, property: &str) -> Option<String> {
        state::with(|s| computed_value(&s.dom, &s.sheets, node, property))
    }

    /// True when any author rule has the given selector text.
    pub fn style_selector_exists(&self, selector: &str) -> bool {
        let wanted = normalize_selector_text(selector);
        state::with(|s| s.sheets.iter().any(|sheet| sheet.has_selector(&wanted)))
    }

    /// The declared (not cascaded) value of `property` in the first author
    /// rule whose selector text matches.
    pub fn declared_style_value(&self, selector: &str, property: &str) -> Option<String> {
        let wanted = normalize_selector_text(selector);
        state::with(|s| {
            s.sheets
                .iter()
                .find_map(|sheet| sheet.declared_value(&wanted, property).map(str::to_string))
        })
    }

    /// True when at least one `<style>` element failed to parse; the style
    /// evaluators fall back to live-element heuristics in that case.
    pub fn sheets_failed(&self) -> bool {
        state::with(|s| s.sheets_failed)
    }

    /// Raw text of every `<style>` element, for the last-resort source scan
    /// used when a stylesheet failed to parse.
    pub fn style_source_text(&self) -> String {
        state::with(|s| s.dom.style_sources().join("\n"))
    }

    /// A copy of the intercepted console log.
    pub fn console_entries(&self) -> Vec<ConsoleEntry> {
        state::with(|s| s.console.clone())
    }

    /// True when a console entry of `level` contains `needle`.
    pub fn console_contains(&self, level: &str, needle: &str) -> bool {
        state::with(|s| {
            s.console
                .iter()
                .any(|entry| entry.level == level && entry.message.contains(needle))
        })
    }

    /// True when any recorded listener registration matches the event type,
    /// regardless of which element registered it.
    pub fn listener_attached(&self, event_type: &str) -> bool {
        state::with(|s| s.listeners.iter().any(|l| l.event_type == event_type))
    }

    /// The submission's raw script source.
    pub fn raw_js(&self) -> String {
        state::with(|s| s.raw_js.clone())
    }

    /// Serialized markup of the document body, for change detection around
    /// event dispatch.
    pub fn body_snapshot(&self) -> String {
        state::with(|s| {
            let body = s.dom.body();
            s.dom.inner_html(body)
        })
    }

    /// Evaluates an expression in sandbox scope.
    pub fn eval_expression(&mut self, code: &str) -> Result<JsValue, String> {
        self.context
            .eval(Source::from_bytes(code.as_bytes()))
            .map_err(|error| error.to_string())
    }

    /// True when `name` resolves on the sandbox global, either as an own
    /// property (`var`, hoisted functions) or via `typeof` (block-scoped
    /// declarations reachable from global code).
    pub fn global_defined(&mut self, name: &str) -> bool {
        let global = self.context.global_object();
        if global
            .has_property(JsString::from(name), &mut self.context)
            .unwrap_or(false)
        {
            return true;
        }
        if !is_identifier(name) {
            return false;
        }
        matches!(
            self.eval_expression(&format!("typeof {name} !== 'undefined'")),
            Ok(value) if value.to_boolean()
        )
    }

    /// True when `name` resolves to a function on the sandbox global.
    pub fn global_is_function(&mut self, name: &str) -> bool {
        if !is_identifier(name) {
            return false;
        }
        matches!(
            self.eval_expression(&format!("typeof {name} === 'function'")),
            Ok(value) if value.to_boolean()
        )
    }

    /// Invokes a global function with JSON arguments.
    pub fn call_global(
        &mut self,
        name: &str,
        args: &[serde_json::Value],
    ) -> Result<JsValue, String> {
        let global = self.context.global_object();
        let function = global
            .get(JsString::from(name), &mut self.context)
            .map_err(|error| error.to_string())?;
        let JsValue::Object(function) = function else {
            return Err(format!("'{name}' is not callable"));
        };
        if !function.is_callable() {
            return Err(format!("'{name}' is not callable"));
        }
        let mut call_args = Vec::with_capacity(args.len());
        for arg in args {
            call_args.push(self.json_to_js(arg)?);
        }
        function
            .call(&JsValue::undefined(), &call_args, &mut self.context)
            .map_err(|error| error.to_string())
    }

    /// Converts a JSON value into a sandbox value.
    pub fn json_to_js(&mut self, value: &serde_json::Value) -> Result<JsValue, String> {
        JsValue::from_json(value, &mut self.context).map_err(|error| error.to_string())
    }

    /// Strict (`===`) comparison between a sandbox value and a JSON value.
    pub fn strict_equals_json(&mut self, value: &JsValue, expected: &serde_json::Value) -> bool {
        match self.json_to_js(expected) {
            Ok(expected) => value.strict_equals(&expected),
            Err(_) => false,
        }
    }

    /// Renders a sandbox value the way template interpolation would.
    pub fn display_value(&mut self, value: &JsValue) -> String {
        value
            .to_string(&mut self.context)
            .map(|s| s.to_std_string_escaped())
            .unwrap_or_else(|_| value.display().to_string())
    }

    /// Tests `content` against a JavaScript regular expression, so the
    /// pattern dialect matches what lesson authors wrote.
    pub fn regex_test(&mut self, pattern: &str, flags: &str, content: &str) -> Result<bool, String> {
        let code = format!(
            "new RegExp({}, {}).test({})",
            quote_js(pattern),
            quote_js(flags),
            quote_js(content)
        );
        self.eval_expression(&code).map(|value| value.to_boolean())
    }

    /// Synthetically dispatches an event at an element, running inline
    /// handlers and recorded listeners along the ancestor chain.
    pub fn dispatch_event(&mut self, node: NodeId, event_type: &str) -> Result<(), String> {
        bindings::dispatch_event_at(&mut self.context, node, event_type)
            .map_err(|error| error.to_string())
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        state::teardown();
    }
}

/// Runs deferred work inside the quiescence window: pending microtask jobs
/// plus timers whose delay falls inside the window, in delay order. The
/// rounds are bounded so self-rescheduling callbacks terminate; intervals
/// fire at most once. No wall-clock sleeping happens; the window is a
/// virtual deadline, which keeps results reproducible.
fn settle(context: &mut Context, window: Duration) {
    let window_ms = window.as_millis() as u64;
    for _ in 0..MAX_TIMER_ROUNDS {
        let mut due: Vec<TimerRecord> = state::with(|s| {
            let (due, pending): (Vec<_>, Vec<_>) = s
                .timers
                .drain(..)
                .partition(|timer| timer.delay_ms <= window_ms);
            s.timers = pending;
            due
        });
        if due.is_empty() {
            break;
        }
        due.sort_by_key(|timer| (timer.delay_ms, timer.id));
        for timer in due {
            bindings::run_callback(&Some(timer.callback), &JsValue::undefined(), &[], context);
        }
        let _ = context.run_jobs();
    }
}

/// True for names safe to interpolate into a `typeof` probe.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Quotes a string as a JavaScript string literal.
fn quote_js(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}
