#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::Formatter;

use anyhow::{Context, Result, anyhow};
use tree_sitter::Tree;

/// A struct that wraps a tree-sitter parser object and HTML source code.
#[derive(Clone)]
pub struct Parser {
    /// the source code being parsed
    code: String,
    /// the parse tree
    tree: Option<Tree>,
}

/// Returns the compiled tree-sitter HTML language.
fn html_language() -> tree_sitter::Language {
    tree_sitter_html::LANGUAGE.into()
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, _: &mut Formatter<'_>) -> std::fmt::Result {
        Ok(())
    }
}

impl Parser {
    /// Returns a new parser object
    ///
    /// * `source_code`: the HTML source to be parsed
    pub fn new(source_code: String) -> Result<Self> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&html_language())
            .with_context(|| "Failed to load HTML grammar")?;
        let tree = parser
            .parse(source_code.as_str(), None)
            .ok_or_else(|| anyhow!("Error parsing HTML source"))?;

        Ok(Self {
            code: source_code,
            tree: Some(tree),
        })
    }

    /// A getter for the parser's source code
    pub fn code(&self) -> &str {
        self.code.as_str()
    }

    /// The root node of the parse tree.
    pub fn root(&self) -> Result<tree_sitter::Node<'_>> {
        Ok(self
            .tree
            .as_ref()
            .context("Treesitter could not parse HTML")?
            .root_node())
    }
}
