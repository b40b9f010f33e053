#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use anyhow::Result;

use crate::dom::parser::Parser;

/// Index of a node inside a [`DomTree`] arena.
pub type NodeId = usize;

/// Elements that never carry children and serialize without an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Payload of one arena node.
#[derive(Debug, Clone)]
pub enum NodeData {
    /// The document root; never has a parent.
    Document,
    /// An element with a lowercase tag name and ordered attributes.
    Element {
        /// lowercase tag name
        tag:        String,
        /// attribute pairs in source order, names lowercased
        attributes: Vec<(String, String)>,
    },
    /// A text run, entities already decoded.
    Text(String),
    /// A comment; kept so serialized markup round-trips visibly.
    Comment(String),
}

/// One node of the arena tree.
#[derive(Debug, Clone)]
pub struct Node {
    /// parent node, if attached
    pub parent:   Option<NodeId>,
    /// child nodes in document order
    pub children: Vec<NodeId>,
    /// the node payload
    pub data:     NodeData,
}

/// A mutable document tree, built from parsed HTML and shared between the
/// script bindings and the rule evaluators.
#[derive(Debug, Clone)]
pub struct DomTree {
    /// arena storage; index 0 is always the document node
    nodes:   Vec<Node>,
    /// doctype name (lowercased), when the document declared one
    doctype: Option<String>,
}

impl DomTree {
    /// Builds a tree from an HTML document string.
    pub fn from_html(source: &str) -> Result<Self> {
        let parser = Parser::new(source.to_string())?;
        let mut tree = Self {
            nodes:   vec![Node {
                parent:   None,
                children: Vec::new(),
                data:     NodeData::Document,
            }],
            doctype: None,
        };
        let root = parser.root()?;
        let top = tree.build_children(&parser, root)?;
        for id in top {
            tree.attach(0, id);
        }
        Ok(tree)
    }

    /// Parses an HTML fragment into detached nodes owned by this arena and
    /// returns the top-level node ids.
    pub fn parse_fragment(&mut self, html: &str) -> Result<Vec<NodeId>> {
        let parser = Parser::new(html.to_string())?;
        let root = parser.root()?;
        self.build_children(&parser, root)
    }

    /// Converts the children of a tree-sitter node into arena nodes.
    fn build_children(
        &mut self,
        parser: &Parser,
        ts_node: tree_sitter::Node<'_>,
    ) -> Result<Vec<NodeId>> {
        let source = parser.code();
        let mut out = Vec::new();
        let mut cursor = ts_node.walk();
        for child in ts_node.children(&mut cursor) {
            match child.kind() {
                "doctype" => {
                    let raw = child.utf8_text(source.as_bytes()).unwrap_or_default();
                    self.doctype = doctype_name(raw);
                }
                "element" | "script_element" | "style_element" => {
                    if let Some(id) = self.build_element(parser, child)? {
                        out.push(id);
                    }
                }
                "text" => {
                    let raw = child.utf8_text(source.as_bytes()).unwrap_or_default();
                    out.push(self.create_text(decode_entities(raw)));
                }
                // script/style contents are raw text; entities stay literal
                "raw_text" => {
                    let raw = child.utf8_text(source.as_bytes()).unwrap_or_default();
                    out.push(self.create_text(raw.to_string()));
                }
                "entity" => {
                    let raw = child.utf8_text(source.as_bytes()).unwrap_or_default();
                    out.push(self.create_text(decode_entities(raw)));
                }
                "comment" => {
                    let raw = child.utf8_text(source.as_bytes()).unwrap_or_default();
                    let body = raw
                        .trim_start_matches("<!--")
                        .trim_end_matches("-->")
                        .to_string();
                    out.push(self.create_node(NodeData::Comment(body)));
                }
                // tags and parse errors carry no content of their own
                _ => {}
            }
        }
        Ok(out)
    }

    /// Converts one tree-sitter element node into an arena element.
    fn build_element(
        &mut self,
        parser: &Parser,
        ts_node: tree_sitter::Node<'_>,
    ) -> Result<Option<NodeId>> {
        let source = parser.code();
        let mut tag = String::new();
        let mut attributes = Vec::new();

        let mut cursor = ts_node.walk();
        for child in ts_node.children(&mut cursor) {
            if matches!(child.kind(), "start_tag" | "self_closing_tag") {
                let mut tag_cursor = child.walk();
                for part in child.children(&mut tag_cursor) {
                    match part.kind() {
                        "tag_name" => {
                            tag = part
                                .utf8_text(source.as_bytes())
                                .unwrap_or_default()
                                .to_ascii_lowercase();
                        }
                        "attribute" => {
                            if let Some(pair) = attribute_pair(part, source) {
                                attributes.push(pair);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        if tag.is_empty() {
            return Ok(None);
        }

        let id = self.create_node(NodeData::Element { tag, attributes });
        let children = self.build_children(parser, ts_node)?;
        for child in children {
            self.attach(id, child);
        }
        Ok(Some(id))
    }

    /// Pushes a node into the arena, detached.
    fn create_node(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        self.nodes.len() - 1
    }

    /// Creates a detached element node.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.create_node(NodeData::Element {
            tag:        tag.to_ascii_lowercase(),
            attributes: Vec::new(),
        })
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, text: String) -> NodeId {
        self.create_node(NodeData::Text(text))
    }

    /// Detaches a node from its current parent, if any.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id].parent.take() {
            self.nodes[parent].children.retain(|&c| c != id);
        }
    }

    /// Attaches `child` as the last child of `parent`.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    /// Immutable access to a node.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// True when the node is an element.
    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id].data, NodeData::Element { .. })
    }

    /// Lowercase tag name of an element node.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id].data {
            NodeData::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    /// Attribute value by (case-insensitive) name.
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id].data {
            NodeData::Element { attributes, .. } => attributes
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// True when the element carries the attribute, regardless of value.
    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    /// Sets (or replaces) an attribute.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attributes, .. } = &mut self.nodes[id].data {
            let name = name.to_ascii_lowercase();
            if let Some(slot) = attributes.iter_mut().find(|(n, _)| *n == name) {
                slot.1 = value.to_string();
            } else {
                attributes.push((name, value.to_string()));
            }
        }
    }

    /// Removes an attribute if present.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let NodeData::Element { attributes, .. } = &mut self.nodes[id].data {
            attributes.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        }
    }

    /// The element's classes, in attribute order.
    pub fn classes(&self, id: NodeId) -> Vec<String> {
        self.attr(id, "class")
            .map(|value| value.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// True when the element's class list contains `class`.
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.classes(id).iter().any(|c| c == class)
    }

    /// Adds a class unless already present.
    pub fn add_class(&mut self, id: NodeId, class: &str) {
        let mut classes = self.classes(id);
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
            self.set_attr(id, "class", &classes.join(" "));
        }
    }

    /// Removes a class if present.
    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        let classes: Vec<String> = self
            .classes(id)
            .into_iter()
            .filter(|c| c != class)
            .collect();
        self.set_attr(id, "class", &classes.join(" "));
    }

    /// Toggles a class, returning true when the class is now present.
    pub fn toggle_class(&mut self, id: NodeId, class: &str) -> bool {
        if self.has_class(id, class) {
            self.remove_class(id, class);
            false
        } else {
            self.add_class(id, class);
            true
        }
    }

    /// Concatenated text of the node's subtree.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    /// Appends subtree text into `out`.
    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id].data {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Comment(_) => {}
            _ => {
                for &child in &self.nodes[id].children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Replaces the node's children with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        for child in self.nodes[id].children.clone() {
            self.detach(child);
        }
        let text_node = self.create_text(text.to_string());
        self.attach(id, text_node);
    }

    /// Serialized markup of the node's children.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in &self.nodes[id].children {
            self.serialize(child, &mut out);
        }
        out
    }

    /// Replaces the node's children with the parsed fragment.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) -> Result<()> {
        let fragment = self.parse_fragment(html)?;
        for child in self.nodes[id].children.clone() {
            self.detach(child);
        }
        for node in fragment {
            self.attach(id, node);
        }
        Ok(())
    }

    /// Serializes one node into `out`.
    fn serialize(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id].data {
            NodeData::Document => {
                for &child in &self.nodes[id].children {
                    self.serialize(child, out);
                }
            }
            NodeData::Text(text) => out.push_str(&escape_text(text)),
            NodeData::Comment(body) => {
                out.push_str("<!--");
                out.push_str(body);
                out.push_str("-->");
            }
            NodeData::Element { tag, attributes } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                for &child in &self.nodes[id].children {
                    self.serialize(child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }

    /// Element ids of the whole document in document order.
    pub fn elements(&self) -> Vec<NodeId> {
        self.elements_under(0)
    }

    /// Element ids of a subtree in document order, excluding the scope node.
    pub fn elements_under(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[scope].children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if self.is_element(id) {
                out.push(id);
            }
            for &child in self.nodes[id].children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Ancestor element ids, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.nodes[id].parent;
        while let Some(parent) = current {
            if self.is_element(parent) {
                out.push(parent);
            }
            current = self.nodes[parent].parent;
        }
        out
    }

    /// Parent element of a node, if any.
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent.filter(|&p| self.is_element(p))
    }

    /// First element with the given `id` attribute.
    pub fn element_by_id(&self, value: &str) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|&e| self.attr(e, "id") == Some(value))
    }

    /// The `<body>` element, falling back to the document element, then the
    /// document node itself, so snapshots always have an anchor.
    pub fn body(&self) -> NodeId {
        self.elements()
            .into_iter()
            .find(|&e| self.tag(e) == Some("body"))
            .or_else(|| self.document_element())
            .unwrap_or(0)
    }

    /// The root `<html>` element, when present.
    pub fn document_element(&self) -> Option<NodeId> {
        self.nodes[0]
            .children
            .iter()
            .copied()
            .find(|&e| self.tag(e) == Some("html"))
            .or_else(|| self.nodes[0].children.iter().copied().find(|&e| self.is_element(e)))
    }

    /// Declared doctype name, lowercased.
    pub fn doctype(&self) -> Option<&str> {
        self.doctype.as_deref()
    }

    /// Raw text of every `<style>` element, in document order.
    pub fn style_sources(&self) -> Vec<String> {
        self.elements()
            .into_iter()
            .filter(|&e| self.tag(e) == Some("style"))
            .map(|e| self.text_content(e))
            .collect()
    }

    /// Raw text of every `<script>` element without a `src` attribute, in
    /// document order. External scripts are not fetched inside the sandbox.
    pub fn script_sources(&self) -> Vec<String> {
        self.elements()
            .into_iter()
            .filter(|&e| self.tag(e) == Some("script") && !self.has_attr(e, "src"))
            .map(|e| self.text_content(e))
            .collect()
    }
}

/// Extracts an attribute name/value pair from a tree-sitter `attribute` node.
fn attribute_pair(node: tree_sitter::Node<'_>, source: &str) -> Option<(String, String)> {
    let mut name = None;
    let mut value = String::new();
    let mut cursor = node.walk();
    for part in node.children(&mut cursor) {
        match part.kind() {
            "attribute_name" => {
                name = Some(
                    part.utf8_text(source.as_bytes())
                        .unwrap_or_default()
                        .to_ascii_lowercase(),
                );
            }
            "attribute_value" => {
                value = decode_entities(part.utf8_text(source.as_bytes()).unwrap_or_default());
            }
            "quoted_attribute_value" => {
                let mut inner = part.walk();
                for piece in part.children(&mut inner) {
                    if piece.kind() == "attribute_value" {
                        value =
                            decode_entities(piece.utf8_text(source.as_bytes()).unwrap_or_default());
                    }
                }
            }
            _ => {}
        }
    }
    name.map(|n| (n, value))
}

/// Pulls the doctype name out of a raw `<!DOCTYPE …>` declaration.
fn doctype_name(raw: &str) -> Option<String> {
    let inner = raw
        .trim()
        .trim_start_matches("<!")
        .trim_end_matches('>')
        .trim();
    let mut words = inner.split_whitespace();
    words.next()?; // the DOCTYPE keyword itself
    Some(
        words
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase(),
    )
}

/// Decodes the handful of entities lesson markup actually uses.
fn decode_entities(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(at) = rest.find('&') {
        out.push_str(&rest[..at]);
        rest = &rest[at..];
        let Some(end) = rest.find(';') else {
            out.push_str(rest);
            return out;
        };
        let entity = &rest[1..end];
        match entity {
            "amp" => out.push('&'),
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            "nbsp" => out.push('\u{a0}'),
            _ => {
                let decoded = entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32);
                match decoded {
                    Some(c) => out.push(c),
                    None => {
                        out.push('&');
                        out.push_str(entity);
                        out.push(';');
                    }
                }
            }
        }
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    out
}

/// Escapes text content for serialization.
fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escapes an attribute value for serialization.
fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DomTree {
        DomTree::from_html(
            "<html><head></head><body><div class=\"container main\" id=\"app\">\
             <h1 id=\"title\">Hello &amp; welcome</h1><ul><li>One</li><li>Two</li></ul>\
             </div></body></html>",
        )
        .expect("sample should parse")
    }

    #[test]
    fn builds_elements_with_attributes() {
        let dom = sample();
        let app = dom.element_by_id("app").expect("div should exist");
        assert_eq!(dom.tag(app), Some("div"));
        assert_eq!(dom.classes(app), vec!["container", "main"]);
    }

    #[test]
    fn decodes_entities_in_text() {
        let dom = sample();
        let title = dom.element_by_id("title").expect("h1 should exist");
        assert_eq!(dom.text_content(title), "Hello & welcome");
    }

    #[test]
    fn doctype_is_captured() {
        let dom = DomTree::from_html("<!DOCTYPE html><html><body></body></html>")
            .expect("document should parse");
        assert_eq!(dom.doctype(), Some("html"));
    }

    #[test]
    fn inner_html_round_trips_structure() {
        let mut dom = sample();
        let app = dom.element_by_id("app").expect("div should exist");
        let before = dom.inner_html(app);
        assert!(before.contains("<h1 id=\"title\">"));

        dom.set_inner_html(app, "<p class=\"x\">new</p>")
            .expect("fragment should parse");
        assert_eq!(dom.inner_html(app), "<p class=\"x\">new</p>");
    }

    #[test]
    fn text_content_replacement_drops_children() {
        let mut dom = sample();
        let app = dom.element_by_id("app").expect("div should exist");
        dom.set_text_content(app, "flat");
        assert_eq!(dom.text_content(app), "flat");
        assert!(dom.inner_html(app).contains("flat"));
    }

    #[test]
    fn class_mutations() {
        let mut dom = sample();
        let app = dom.element_by_id("app").expect("div should exist");
        dom.add_class(app, "active");
        assert!(dom.has_class(app, "active"));
        assert!(!dom.toggle_class(app, "active"));
        assert!(!dom.has_class(app, "active"));
    }

    #[test]
    fn void_elements_serialize_without_end_tag() {
        let dom = DomTree::from_html("<body><img src=\"a.png\" alt=\"a\"></body>")
            .expect("document should parse");
        let body = dom.body();
        assert_eq!(dom.inner_html(body), "<img src=\"a.png\" alt=\"a\">");
    }

    #[test]
    fn created_nodes_attach_in_order() {
        let mut dom = sample();
        let list = dom
            .elements()
            .into_iter()
            .find(|&e| dom.tag(e) == Some("ul"))
            .expect("ul should exist");
        let li = dom.create_element("li");
        let text = dom.create_text("Three".to_string());
        dom.attach(li, text);
        dom.attach(list, li);
        assert_eq!(
            dom.elements_under(list)
                .iter()
                .filter(|&&e| dom.tag(e) == Some("li"))
                .count(),
            3
        );
        assert_eq!(dom.text_content(list), "OneTwoThree");
    }
}
