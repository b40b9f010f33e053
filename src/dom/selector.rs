#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use crate::dom::tree::{DomTree, NodeId};

/// One simple selector inside a compound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimplePart {
    /// `*`
    Universal,
    /// a lowercase tag name
    Tag(String),
    /// `#id`
    Id(String),
    /// `.class`
    Class(String),
    /// `[name]` or `[name=value]`
    Attr {
        /// lowercase attribute name
        name:  String,
        /// expected value; `None` checks presence only
        value: Option<String>,
    },
}

/// A compound selector: simple parts that must all match one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compound {
    /// the simple parts of this compound
    pub parts: Vec<SimplePart>,
}

/// Relationship between two adjacent compounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// whitespace: any ancestor
    Descendant,
    /// `>`: the direct parent
    Child,
}

/// A complex selector: compounds joined by combinators, left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// compounds in source order
    pub compounds:   Vec<Compound>,
    /// combinators between them; always `compounds.len() - 1` entries
    pub combinators: Vec<Combinator>,
}

/// A comma-separated selector group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    /// the alternatives; an element matches when any of them match
    pub selectors: Vec<Selector>,
}

peg::parser! {
    /// Grammar for the selector subset used by lesson rule sets: tag, `#id`,
    /// `.class`, `[attr]`, `[attr=value]`, `*`, compounds, descendant and
    /// child combinators, and comma groups.
    grammar selector_grammar() for str {
        /// matches any number of whitespace characters
        rule ws() = quiet!{[' ' | '\t' | '\n' | '\r']*}

        /// matches an identifier (tag, class, id, or attribute name)
        rule ident() -> String
            = s:$(['a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_']+) { s.to_string() }

        /// matches a tag-name simple selector
        rule tag() -> SimplePart
            = t:ident() { SimplePart::Tag(t.to_ascii_lowercase()) }

        /// matches the universal selector
        rule universal() -> SimplePart
            = "*" { SimplePart::Universal }

        /// matches an id simple selector
        rule id_part() -> SimplePart
            = "#" i:ident() { SimplePart::Id(i) }

        /// matches a class simple selector
        rule class_part() -> SimplePart
            = "." c:ident() { SimplePart::Class(c) }

        /// matches a quoted or bare attribute value
        rule attr_value() -> String
            = "\"" v:$([^ '"']*) "\"" { v.to_string() }
            / "'" v:$([^ '\'']*) "'" { v.to_string() }
            / v:$([^ ']']+) { v.trim().to_string() }

        /// matches an attribute presence or value selector
        rule attr_part() -> SimplePart
            = "[" ws() n:ident() ws() v:("=" ws() value:attr_value() { value })? ws() "]" {
                SimplePart::Attr { name: n.to_ascii_lowercase(), value: v }
            }

        /// matches any simple selector
        rule part() -> SimplePart
            = id_part() / class_part() / attr_part() / universal() / tag()

        /// matches a compound selector
        rule compound() -> Compound
            = parts:part()+ { Compound { parts } }

        /// matches a combinator between compounds
        rule combinator() -> Combinator
            = ws() ">" ws() { Combinator::Child }
            / [' ' | '\t']+ { Combinator::Descendant }

        /// parses one complex selector
        pub rule complex() -> Selector
            = first:compound() rest:(c:combinator() n:compound() { (c, n) })* {
                let mut compounds = vec![first];
                let mut combinators = Vec::new();
                for (c, n) in rest {
                    combinators.push(c);
                    compounds.push(n);
                }
                Selector { compounds, combinators }
            }

        /// parses a comma-separated selector group
        pub rule list() -> Vec<Selector>
            = ws() s:(complex() ** (ws() "," ws())) ws() { s }
    }
}

impl Selector {
    /// Specificity as (ids, classes + attributes, tags).
    pub fn specificity(&self) -> (u32, u32, u32) {
        let mut spec = (0, 0, 0);
        for compound in &self.compounds {
            for part in &compound.parts {
                match part {
                    SimplePart::Id(_) => spec.0 += 1,
                    SimplePart::Class(_) | SimplePart::Attr { .. } => spec.1 += 1,
                    SimplePart::Tag(_) => spec.2 += 1,
                    SimplePart::Universal => {}
                }
            }
        }
        spec
    }

    /// True when the selector matches the element.
    pub fn matches(&self, dom: &DomTree, node: NodeId) -> bool {
        matches_chain(dom, &self.compounds, &self.combinators, node)
    }
}

impl SelectorList {
    /// Parses a selector group, reporting an error message suited to rule
    /// diagnostics when the text is outside the supported subset.
    pub fn parse(text: &str) -> Result<Self, String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err("Selector is empty.".to_string());
        }
        match selector_grammar::list(trimmed) {
            Ok(selectors) if !selectors.is_empty() => Ok(Self { selectors }),
            _ => Err(format!("Invalid or unsupported selector '{text}'.")),
        }
    }

    /// True when any alternative matches the element.
    pub fn matches(&self, dom: &DomTree, node: NodeId) -> bool {
        self.selectors.iter().any(|s| s.matches(dom, node))
    }

    /// Every matching element under `scope`, in document order.
    pub fn query_under(&self, dom: &DomTree, scope: NodeId) -> Vec<NodeId> {
        dom.elements_under(scope)
            .into_iter()
            .filter(|&e| self.matches(dom, e))
            .collect()
    }

    /// Every matching element in the document, in document order.
    pub fn query_all(&self, dom: &DomTree) -> Vec<NodeId> {
        self.query_under(dom, 0)
    }

    /// The first matching element in the document, if any.
    pub fn query_first(&self, dom: &DomTree) -> Option<NodeId> {
        self.query_all(dom).into_iter().next()
    }
}

/// Matches the rightmost compound on `node` and walks the remaining chain up
/// the ancestor axis, backtracking over descendant combinators.
fn matches_chain(
    dom: &DomTree,
    compounds: &[Compound],
    combinators: &[Combinator],
    node: NodeId,
) -> bool {
    let last = compounds.len() - 1;
    if !compound_matches(dom, node, &compounds[last]) {
        return false;
    }
    if last == 0 {
        return true;
    }
    match combinators[last - 1] {
        Combinator::Child => dom
            .parent_element(node)
            .is_some_and(|p| matches_chain(dom, &compounds[..last], &combinators[..last - 1], p)),
        Combinator::Descendant => dom
            .ancestors(node)
            .into_iter()
            .any(|a| matches_chain(dom, &compounds[..last], &combinators[..last - 1], a)),
    }
}

/// True when every simple part of the compound matches the element.
fn compound_matches(dom: &DomTree, node: NodeId, compound: &Compound) -> bool {
    if !dom.is_element(node) {
        return false;
    }
    compound.parts.iter().all(|part| match part {
        SimplePart::Universal => true,
        SimplePart::Tag(tag) => dom.tag(node) == Some(tag.as_str()),
        SimplePart::Id(id) => dom.attr(node, "id") == Some(id.as_str()),
        SimplePart::Class(class) => dom.has_class(node, class),
        SimplePart::Attr { name, value } => match value {
            Some(v) => dom.attr(node, name) == Some(v.as_str()),
            None => dom.has_attr(node, name),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dom() -> DomTree {
        DomTree::from_html(
            "<html><body><nav id=\"menu\"><a class=\"link active\" href=\"/\">Home</a>\
             <a class=\"link\" href=\"/about\">About</a></nav>\
             <div class=\"content\"><p>Text</p><span data-kind=\"note\">n</span></div></body></html>",
        )
        .expect("markup should parse")
    }

    #[test]
    fn tag_id_class_and_attribute_parts() {
        let dom = dom();
        assert_eq!(SelectorList::parse("a").unwrap().query_all(&dom).len(), 2);
        assert_eq!(
            SelectorList::parse("#menu").unwrap().query_all(&dom).len(),
            1
        );
        assert_eq!(
            SelectorList::parse(".link.active")
                .unwrap()
                .query_all(&dom)
                .len(),
            1
        );
        assert_eq!(
            SelectorList::parse("[data-kind=note]")
                .unwrap()
                .query_all(&dom)
                .len(),
            1
        );
        assert_eq!(
            SelectorList::parse("a[href=\"/about\"]")
                .unwrap()
                .query_all(&dom)
                .len(),
            1
        );
    }

    #[test]
    fn descendant_and_child_combinators() {
        let dom = dom();
        assert_eq!(
            SelectorList::parse("nav a").unwrap().query_all(&dom).len(),
            2
        );
        assert_eq!(
            SelectorList::parse("body > div")
                .unwrap()
                .query_all(&dom)
                .len(),
            1
        );
        assert!(
            SelectorList::parse("body > a")
                .unwrap()
                .query_all(&dom)
                .is_empty()
        );
    }

    #[test]
    fn comma_groups_union() {
        let dom = dom();
        assert_eq!(
            SelectorList::parse("p, span").unwrap().query_all(&dom).len(),
            2
        );
    }

    #[test]
    fn specificity_counts() {
        let list = SelectorList::parse("nav a.link#menu").unwrap();
        assert_eq!(list.selectors[0].specificity(), (1, 1, 2));
    }

    #[test]
    fn unsupported_selectors_report_an_error() {
        assert!(SelectorList::parse("a:hover").is_err());
        assert!(SelectorList::parse("").is_err());
    }
}
