#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use anyhow::{Result, anyhow};

use crate::{
    css::model::{Declaration, StyleRule, Stylesheet},
    dom::selector::SelectorList,
};

peg::parser! {
    /// Grammar for author stylesheets: rule sets with declaration blocks,
    /// `!important`, and at-rules (skipped wholesale, statement or block
    /// form). Comments are stripped before parsing.
    grammar css_grammar() for str {
        /// matches any number of whitespace characters
        rule ws() = quiet!{[' ' | '\t' | '\n' | '\r']*}

        /// matches a balanced brace block, contents ignored
        rule block()
            = "{" (block() / [^ '{' | '}'])* "}"

        /// matches an at-rule in statement or block form
        rule at_rule()
            = "@" [^ ';' | '{']* (block() / ";") ws()

        /// matches raw selector text up to the opening brace
        rule selector_text() -> &'input str
            = s:$([^ '{' | '}' | ';' | '@']+) { s }

        /// matches one declaration
        rule declaration() -> Option<(String, String)>
            = ws() p:$([^ ':' | ';' | '{' | '}']+) ":" v:$([^ ';' | '}']*) {
                let property = p.trim().to_ascii_lowercase();
                if property.is_empty() { None } else { Some((property, v.trim().to_string())) }
            }

        /// matches a declaration block body
        rule declarations() -> Vec<(String, String)>
            = d:(declaration() ** ";") ";"? ws() { d.into_iter().flatten().collect() }

        /// matches one rule set
        rule rule_set() -> (String, Vec<(String, String)>)
            = s:selector_text() "{" d:declarations() "}" ws() {
                (s.to_string(), d)
            }

        /// matches one top-level stylesheet item
        rule item() -> Option<(String, Vec<(String, String)>)>
            = at_rule() { None }
            / r:rule_set() { Some(r) }

        /// parses a whole stylesheet into raw rule sets
        pub rule stylesheet() -> Vec<(String, Vec<(String, String)>)>
            = ws() items:item()* ws() { items.into_iter().flatten().collect() }
    }
}

/// Parses one author stylesheet.
pub fn parse_stylesheet(source: &str) -> Result<Stylesheet> {
    let stripped = strip_comments(source);
    let raw = css_grammar::stylesheet(&stripped)
        .map_err(|e| anyhow!("Could not parse stylesheet: {e}"))?;

    let rules = raw
        .into_iter()
        .map(|(selector_text, declarations)| {
            let selector_text = normalize_selector_text(&selector_text);
            let selectors = SelectorList::parse(&selector_text)
                .map(|list| list.selectors)
                .unwrap_or_default();
            StyleRule {
                selector_text,
                selectors,
                declarations: declarations
                    .into_iter()
                    .map(|(property, value)| split_important(property, value))
                    .collect(),
            }
        })
        .collect();

    Ok(Stylesheet { rules })
}

/// Parses a declaration list, e.g. the contents of a `style` attribute.
pub fn parse_declarations(source: &str) -> Vec<Declaration> {
    source
        .split(';')
        .filter_map(|piece| {
            let (property, value) = piece.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            if property.is_empty() {
                return None;
            }
            Some(split_important(property, value.trim().to_string()))
        })
        .collect()
}

/// Serializes declarations back into `a: b; c: d` form for a `style`
/// attribute.
pub fn serialize_declarations(declarations: &[Declaration]) -> String {
    declarations
        .iter()
        .map(|d| {
            if d.important {
                format!("{}: {} !important", d.property, d.value)
            } else {
                format!("{}: {}", d.property, d.value)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Normalizes selector text for string comparison: collapsed whitespace and
/// canonical spacing around `>` and `,`.
pub fn normalize_selector_text(text: &str) -> String {
    let spaced = text.replace('>', " > ").replace(',', " , ");
    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.replace(" , ", ", ")
}

/// Splits a trailing `!important` off a declaration value.
fn split_important(property: String, value: String) -> Declaration {
    let trimmed = value.trim();
    let lowered = trimmed.to_ascii_lowercase();
    if let Some(at) = lowered.rfind("!important")
        && lowered[at + "!important".len()..].trim().is_empty()
    {
        Declaration {
            property,
            value: trimmed[..at].trim().to_string(),
            important: true,
        }
    } else {
        Declaration {
            property,
            value: trimmed.to_string(),
            important: false,
        }
    }
}

/// Removes `/* … */` comments.
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(at) = rest.find("/*") {
        out.push_str(&rest[..at]);
        match rest[at..].find("*/") {
            Some(end) => rest = &rest[at + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}
