#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Browser-like globals installed into the script engine.
pub mod bindings;
/// Per-sandbox interception state shared with the script bindings.
pub mod state;
/// Sandbox construction, readiness, and the rule-facing surface.
pub mod runtime;

pub use runtime::{Sandbox, SandboxLimits};
pub use state::{ConsoleEntry, ListenerRecord};
