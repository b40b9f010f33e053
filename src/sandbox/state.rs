#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{cell::RefCell, time::Instant};

use crate::{
    css::model::Stylesheet,
    dom::tree::{DomTree, NodeId},
};

/// Listener registrations on the document or window have no tag name to key
/// by and are recorded under this literal. Stored rule sets depend on it,
/// so it is part of the persisted-data contract.
pub const DOCUMENT_TARGET_KEY: &str = "Unknown";

/// One intercepted console call.
#[derive(Debug, Clone)]
pub struct ConsoleEntry {
    /// console level: `log`, `info`, `warn`, or `error`
    pub level:        String,
    /// the call's arguments, stringified and joined with spaces
    pub message:      String,
    /// milliseconds since the sandbox was created
    pub timestamp_ms: u128,
}

/// How an intercepted callback can be re-invoked later.
#[derive(Debug, Clone)]
pub enum CallbackRef {
    /// a hidden global variable holding the function object
    Slot(String),
    /// raw source text, e.g. a string passed to `setTimeout`
    Source(String),
}

/// One intercepted `addEventListener` registration.
#[derive(Debug, Clone)]
pub struct ListenerRecord {
    /// signature of the registering element: `TAG#id.class.class…`
    pub element_key: String,
    /// the event type, e.g. `click`
    pub event_type:  String,
    /// the parked callback; `None` when the listener was not callable
    pub callback:    Option<CallbackRef>,
    /// whether the registration asked for the capture phase
    pub capture:     bool,
}

/// One pending timer created by `setTimeout`/`setInterval`.
#[derive(Debug, Clone)]
pub struct TimerRecord {
    /// unique timer id returned to the script
    pub id:       u32,
    /// the parked callback
    pub callback: CallbackRef,
    /// requested delay in milliseconds
    pub delay_ms: u64,
    /// true for `setInterval`
    pub interval: bool,
}

/// Everything one sandbox owns besides the script engine context: the live
/// DOM, parsed stylesheets, the intercepted console/listener/timer records,
/// and the submission's raw script for source-level checks.
#[derive(Debug)]
pub struct SandboxState {
    /// the live document tree
    pub dom:           DomTree,
    /// parsed author stylesheets, in document order
    pub sheets:        Vec<Stylesheet>,
    /// true when at least one `<style>` element failed to parse
    pub sheets_failed: bool,
    /// intercepted console output, in call order
    pub console:       Vec<ConsoleEntry>,
    /// intercepted listener registrations, in call order
    pub listeners:     Vec<ListenerRecord>,
    /// pending timers
    pub timers:        Vec<TimerRecord>,
    /// the submission's raw JavaScript, before the bridge wrap
    pub raw_js:        String,
    /// sandbox creation time, for console timestamps
    epoch:             Instant,
    /// counter backing callback slot names
    next_slot:         u32,
    /// counter backing timer ids
    next_timer:        u32,
}

impl SandboxState {
    /// Creates the state for one sandbox.
    pub fn new(
        dom: DomTree,
        sheets: Vec<Stylesheet>,
        sheets_failed: bool,
        raw_js: String,
    ) -> Self {
        Self {
            dom,
            sheets,
            sheets_failed,
            console: Vec::new(),
            listeners: Vec::new(),
            timers: Vec::new(),
            raw_js,
            epoch: Instant::now(),
            next_slot: 0,
            next_timer: 0,
        }
    }

    /// Appends one console entry.
    pub fn log(&mut self, level: &str, message: String) {
        self.console.push(ConsoleEntry {
            level: level.to_string(),
            message,
            timestamp_ms: self.epoch.elapsed().as_millis(),
        });
    }

    /// Returns a fresh hidden-global name for parking a callback.
    pub fn next_callback_slot(&mut self) -> String {
        self.next_slot += 1;
        format!("__sc_cb_{}", self.next_slot)
    }

    /// Returns a fresh timer id.
    pub fn next_timer_id(&mut self) -> u32 {
        self.next_timer += 1;
        self.next_timer
    }

    /// Signature of an element for listener bookkeeping:
    /// uppercase tag, `#id` when present, `.class` per class.
    pub fn element_key(&self, node: NodeId) -> String {
        let Some(tag) = self.dom.tag(node) else {
            return DOCUMENT_TARGET_KEY.to_string();
        };
        let mut key = tag.to_ascii_uppercase();
        if let Some(id) = self.dom.attr(node, "id")
            && !id.is_empty()
        {
            key.push('#');
            key.push_str(id);
        }
        for class in self.dom.classes(node) {
            key.push('.');
            key.push_str(&class);
        }
        key
    }
}

thread_local! {
    /// The state of the sandbox currently running on this worker thread.
    ///
    /// The script engine's native functions must be plain `Copy` closures, so
    /// they reach the sandbox through this thread-local instead of captured
    /// references. Each sandbox runs its whole lifetime on one blocking
    /// thread and installs a fresh state first, so two sandboxes never share
    /// records.
    static STATE: RefCell<Option<SandboxState>> = const { RefCell::new(None) };
}

/// Installs a fresh state, discarding anything a previous sandbox on this
/// thread left behind.
pub fn install(state: SandboxState) {
    STATE.with(|s| *s.borrow_mut() = Some(state));
}

/// Removes and returns the current state.
pub fn teardown() -> Option<SandboxState> {
    STATE.with(|s| s.borrow_mut().take())
}

/// Runs `f` against the installed state.
///
/// Panics when no sandbox is active on this thread; every caller is either a
/// binding invoked during script execution or a rule evaluator invoked while
/// the sandbox handle is alive, so a miss is a bug, not a runtime condition.
pub fn with<T>(f: impl FnOnce(&mut SandboxState) -> T) -> T {
    STATE.with(|s| {
        let mut guard = s.borrow_mut();
        let state = guard
            .as_mut()
            .expect("sandbox state is not installed on this thread");
        f(state)
    })
}

/// Runs `f` against the installed state, or returns `None` outside a
/// sandbox. Used by script bindings so a stray call can never abort the
/// host.
pub fn try_with<T>(f: impl FnOnce(&mut SandboxState) -> T) -> Option<T> {
    STATE.with(|s| s.borrow_mut().as_mut().map(f))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_for(html: &str) -> SandboxState {
        let dom = DomTree::from_html(html).expect("markup should parse");
        SandboxState::new(dom, Vec::new(), false, String::new())
    }

    #[test]
    fn element_keys_follow_the_signature_format() {
        let state = state_for(
            "<body><button id=\"go\" class=\"btn btn-primary\">x</button><p>y</p></body>",
        );
        let button = state.dom.element_by_id("go").unwrap();
        assert_eq!(state.element_key(button), "BUTTON#go.btn.btn-primary");

        let p = state
            .dom
            .elements()
            .into_iter()
            .find(|&e| state.dom.tag(e) == Some("p"))
            .unwrap();
        assert_eq!(state.element_key(p), "P");
    }

    #[test]
    fn install_replaces_previous_state() {
        install(state_for("<body><p id=\"a\">1</p></body>"));
        with(|s| s.log("log", "first sandbox".to_string()));
        install(state_for("<body><p id=\"b\">2</p></body>"));
        let leaked = with(|s| s.console.len());
        assert_eq!(leaked, 0);
        teardown();
    }

    #[test]
    fn slots_and_timer_ids_are_unique() {
        let mut state = state_for("<body></body>");
        let a = state.next_callback_slot();
        let b = state.next_callback_slot();
        assert_ne!(a, b);
        assert_ne!(state.next_timer_id(), state.next_timer_id());
    }
}
