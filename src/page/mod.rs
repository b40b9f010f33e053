#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Assembles one HTML document string from submission fragments.
pub mod composer;
/// Rewrites submitted JavaScript for execution inside the sandbox.
pub mod script;

pub use composer::compose_document;
pub use script::ScriptBridge;
