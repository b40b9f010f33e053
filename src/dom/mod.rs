#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Tree-sitter parser wrapper for HTML sources.
pub mod parser;
/// CSS selector subset: parsing, matching, and specificity.
pub mod selector;
/// The mutable element tree rules and scripts operate on.
pub mod tree;

pub use parser::Parser;
pub use selector::{Selector, SelectorList};
pub use tree::{DomTree, NodeData, NodeId};
