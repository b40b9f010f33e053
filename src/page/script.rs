#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use anyhow::{Context as _, Result, anyhow};
use tree_sitter::{Query, QueryCursor, StreamingIterator};

use crate::constants::TOP_LEVEL_FUNCTIONS_QUERY;

/// Rewrites submitted JavaScript so it behaves inside the sandbox the way it
/// would in a learner's browser.
///
/// Submitted scripts are executed from inside a wrapping block, which costs
/// top-level `function` declarations their automatic global hoisting; inline
/// handler attributes like `onclick="greet()"` would then fail to resolve.
/// The bridge appends a `typeof`-guarded `window.NAME = NAME;` line per
/// top-level declaration and wraps the whole script in a `DOMContentLoaded`
/// listener so DOM queries and the hoist lines run only after parse.
pub struct ScriptBridge {
    /// the raw submitted source
    source: String,
}

impl ScriptBridge {
    /// Wraps the provided submission script.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Names of the top-level `function NAME(...)` declarations in the
    /// source, in declaration order.
    ///
    /// Uses a real parse of the submission rather than a textual scan;
    /// conditionally defined or otherwise unbound names are harmless because
    /// every emitted hoist line is `typeof`-guarded.
    pub fn top_level_functions(&self) -> Result<Vec<String>> {
        let mut parser = tree_sitter::Parser::new();
        let language: tree_sitter::Language = tree_sitter_javascript::LANGUAGE.into();
        parser
            .set_language(&language)
            .with_context(|| "Failed to load JavaScript grammar")?;
        let tree = parser
            .parse(self.source.as_str(), None)
            .ok_or_else(|| anyhow!("Error parsing JavaScript code"))?;

        let query = Query::new(&language, TOP_LEVEL_FUNCTIONS_QUERY)
            .with_context(|| "Failed to compile top-level function query")?;
        let capture_index = query
            .capture_index_for_name("name")
            .ok_or_else(|| anyhow!("Capture name `name` has no index associated."))?;

        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, tree.root_node(), self.source.as_bytes());
        let mut names = Vec::new();

        while let Some(m) = matches.next() {
            for capture in m.captures.iter().filter(|c| c.index == capture_index) {
                let name = capture
                    .node
                    .utf8_text(self.source.as_bytes())
                    .context("Cannot map capture to source text")?;
                names.push(name.to_string());
            }
        }

        Ok(names)
    }

    /// Returns the script ready for embedding into the composed document.
    ///
    /// If the submission does not parse, the wrap is still emitted with no
    /// hoist lines; the sandbox surfaces the syntax error at run time, where
    /// the learner expects to see it.
    pub fn wrapped(&self) -> String {
        let names = match self.top_level_functions() {
            Ok(names) => names,
            Err(error) => {
                tracing::debug!("submission script did not parse, skipping hoist: {error}");
                Vec::new()
            }
        };

        let mut body = String::with_capacity(self.source.len() + names.len() * 64);
        body.push_str(&self.source);
        body.push('\n');
        for name in &names {
            body.push_str(&format!(
                "if (typeof {name} !== 'undefined') window.{name} = {name};\n"
            ));
        }

        format!("document.addEventListener('DOMContentLoaded', function () {{\n{body}}});")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_top_level_declarations_in_order() {
        let bridge = ScriptBridge::new("function a() {}\nvar x = 1;\nfunction b(n) { return n; }");
        let names = bridge.top_level_functions().expect("script should parse");
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn nested_declarations_are_not_hoisted() {
        let bridge = ScriptBridge::new("function outer() { function inner() {} }");
        let names = bridge.top_level_functions().expect("script should parse");
        assert_eq!(names, vec!["outer".to_string()]);
    }

    #[test]
    fn wrapped_script_guards_every_hoist() {
        let bridge = ScriptBridge::new("function greet(name) { return 'hi ' + name; }");
        let wrapped = bridge.wrapped();
        assert!(wrapped.starts_with("document.addEventListener('DOMContentLoaded'"));
        assert!(wrapped.contains("if (typeof greet !== 'undefined') window.greet = greet;"));
    }

    #[test]
    fn unparseable_scripts_still_get_wrapped() {
        let bridge = ScriptBridge::new("function ( {{{");
        let wrapped = bridge.wrapped();
        assert!(wrapped.starts_with("document.addEventListener('DOMContentLoaded'"));
        assert!(wrapped.contains("function ( {{{"));
    }

    #[test]
    fn empty_script_wraps_to_a_noop() {
        let wrapped = ScriptBridge::new("").wrapped();
        assert!(wrapped.contains("DOMContentLoaded"));
    }
}
