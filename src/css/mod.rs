#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Resolution of computed style values against the cascade.
pub mod computed;
/// Stylesheet, rule, and declaration models.
pub mod model;
/// Peg grammar for author stylesheets.
pub mod parsers;

pub use computed::{computed_value, normalize_value};
pub use model::{Declaration, StyleRule, Stylesheet};
pub use parsers::{
    normalize_selector_text, parse_declarations, parse_stylesheet, serialize_declarations,
};
