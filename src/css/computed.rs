#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use crate::{
    css::{
        model::Stylesheet,
        parsers::parse_declarations,
    },
    dom::tree::{DomTree, NodeId},
};

/// Properties that inherit down the tree when not set on the element.
const INHERITED_PROPERTIES: &[&str] = &[
    "color",
    "cursor",
    "font",
    "font-family",
    "font-size",
    "font-style",
    "font-weight",
    "letter-spacing",
    "line-height",
    "list-style",
    "list-style-type",
    "text-align",
    "text-indent",
    "text-transform",
    "visibility",
    "white-space",
    "word-spacing",
];

/// Precedence tier of one declaration: author normal < inline normal <
/// author `!important` < inline `!important`.
fn tier(important: bool, inline: bool) -> u8 {
    match (important, inline) {
        (false, false) => 0,
        (false, true) => 1,
        (true, false) => 2,
        (true, true) => 3,
    }
}

/// Resolves the cascaded value of `property` on `node`.
///
/// The winner is chosen by precedence tier, then selector specificity, then
/// source order; inherited properties fall back to the parent element when
/// nothing matched. The returned string is the declared value as authored
/// (trimmed), which is this engine's canonical serialization.
pub fn computed_value(
    dom: &DomTree,
    sheets: &[Stylesheet],
    node: NodeId,
    property: &str,
) -> Option<String> {
    let property = property.to_ascii_lowercase();
    let mut best: Option<((u8, (u32, u32, u32), usize), String)> = None;
    let mut order = 0usize;

    for sheet in sheets {
        for rule in &sheet.rules {
            let specificity = rule
                .selectors
                .iter()
                .filter(|s| s.matches(dom, node))
                .map(|s| s.specificity())
                .max();
            if let Some(specificity) = specificity {
                for d in rule.declarations.iter().filter(|d| d.property == property) {
                    let key = (tier(d.important, false), specificity, order);
                    if best.as_ref().is_none_or(|(k, _)| key >= *k) {
                        best = Some((key, d.value.clone()));
                    }
                }
            }
            order += 1;
        }
    }

    if let Some(style_attr) = dom.attr(node, "style") {
        for d in parse_declarations(style_attr)
            .into_iter()
            .filter(|d| d.property == property)
        {
            let key = (tier(d.important, true), (0, 0, 0), order);
            if best.as_ref().is_none_or(|(k, _)| key >= *k) {
                best = Some((key, d.value));
            }
        }
    }

    match best {
        Some((_, value)) => Some(value),
        None if INHERITED_PROPERTIES.contains(&property.as_str()) => dom
            .parent_element(node)
            .and_then(|parent| computed_value(dom, sheets, parent, &property)),
        None => None,
    }
}

/// Sixteen CSS named colors plus `purple` and `fuchsia`, as `rgb()` values.
const NAMED_COLORS: &[(&str, &str)] = &[
    ("white", "rgb(255,255,255)"),
    ("black", "rgb(0,0,0)"),
    ("red", "rgb(255,0,0)"),
    ("green", "rgb(0,128,0)"),
    ("blue", "rgb(0,0,255)"),
    ("yellow", "rgb(255,255,0)"),
    ("cyan", "rgb(0,255,255)"),
    ("magenta", "rgb(255,0,255)"),
    ("silver", "rgb(192,192,192)"),
    ("gray", "rgb(128,128,128)"),
    ("maroon", "rgb(128,0,0)"),
    ("olive", "rgb(128,128,0)"),
    ("lime", "rgb(0,255,0)"),
    ("aqua", "rgb(0,255,255)"),
    ("teal", "rgb(0,128,128)"),
    ("navy", "rgb(0,0,128)"),
    ("fuchsia", "rgb(255,0,255)"),
    ("purple", "rgb(128,0,128)"),
];

/// Normalizes a CSS value for lenient comparison: zero lengths collapse to
/// `0px`, hex colors expand to `rgb()`, named colors map to `rgb()`, `rgb`
/// values lose their whitespace, everything else lowercases. The optional
/// `property`/`expected` pair enables the reset-border special cases.
pub fn normalize_value(value: &str, property: Option<&str>, expected: Option<&str>) -> String {
    let value = value.trim();

    if matches!(value, "0" | "0px" | "0em" | "0rem") {
        return "0px".to_string();
    }

    let mut value = value.to_string();
    if value.starts_with('#') && value.len() == 4 {
        let chars: Vec<char> = value.chars().collect();
        value = format!(
            "#{}{}{}{}{}{}",
            chars[1], chars[1], chars[2], chars[2], chars[3], chars[3]
        );
    }

    if value.starts_with('#') && value.len() == 7 {
        let parse = |range: std::ops::Range<usize>| u8::from_str_radix(&value[range], 16);
        if let (Ok(r), Ok(g), Ok(b)) = (parse(1..3), parse(3..5), parse(5..7)) {
            return format!("rgb({r},{g},{b})");
        }
    }

    let lowered = value.to_ascii_lowercase();
    if let Some((_, rgb)) = NAMED_COLORS.iter().find(|(name, _)| *name == lowered) {
        return (*rgb).to_string();
    }

    if value.is_empty() && property == Some("border") && expected == Some("none") {
        return "none".to_string();
    }

    if property == Some("border-style")
        && expected == Some("none")
        && matches!(lowered.as_str(), "outset" | "initial")
    {
        return "none".to_string();
    }

    if lowered.starts_with("rgb") {
        return lowered.split_whitespace().collect();
    }

    lowered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::parsers::parse_stylesheet;

    fn setup(html: &str, css: &str) -> (DomTree, Vec<Stylesheet>) {
        let dom = DomTree::from_html(html).expect("markup should parse");
        let sheet = parse_stylesheet(css).expect("stylesheet should parse");
        (dom, vec![sheet])
    }

    #[test]
    fn specificity_beats_order() {
        let (dom, sheets) = setup(
            "<body><p id=\"x\" class=\"note\">t</p></body>",
            "#x { color: red; } p { color: blue; } .note { color: green; }",
        );
        let p = dom.element_by_id("x").unwrap();
        assert_eq!(
            computed_value(&dom, &sheets, p, "color"),
            Some("red".to_string())
        );
    }

    #[test]
    fn later_rules_win_at_equal_specificity() {
        let (dom, sheets) = setup(
            "<body><p>t</p></body>",
            "p { color: red; } p { color: blue; }",
        );
        let p = dom.elements().into_iter().find(|&e| dom.tag(e) == Some("p")).unwrap();
        assert_eq!(
            computed_value(&dom, &sheets, p, "color"),
            Some("blue".to_string())
        );
    }

    #[test]
    fn inline_style_beats_author_rules() {
        let (dom, sheets) = setup(
            "<body><p id=\"x\" style=\"color: green\">t</p></body>",
            "#x { color: red; }",
        );
        let p = dom.element_by_id("x").unwrap();
        assert_eq!(
            computed_value(&dom, &sheets, p, "color"),
            Some("green".to_string())
        );
    }

    #[test]
    fn important_author_rule_beats_inline() {
        let (dom, sheets) = setup(
            "<body><p id=\"x\" style=\"color: green\">t</p></body>",
            "#x { color: red !important; }",
        );
        let p = dom.element_by_id("x").unwrap();
        assert_eq!(
            computed_value(&dom, &sheets, p, "color"),
            Some("red".to_string())
        );
    }

    #[test]
    fn inherited_properties_fall_back_to_the_parent() {
        let (dom, sheets) = setup(
            "<body><div id=\"wrap\"><span id=\"s\">t</span></div></body>",
            "#wrap { color: purple; width: 100px; }",
        );
        let span = dom.element_by_id("s").unwrap();
        assert_eq!(
            computed_value(&dom, &sheets, span, "color"),
            Some("purple".to_string())
        );
        assert_eq!(computed_value(&dom, &sheets, span, "width"), None);
    }

    #[test]
    fn value_normalization() {
        assert_eq!(normalize_value("0", None, None), "0px");
        assert_eq!(normalize_value("#abc", None, None), "rgb(170,187,204)");
        assert_eq!(normalize_value("#007bff", None, None), "rgb(0,123,255)");
        assert_eq!(normalize_value("White", None, None), "rgb(255,255,255)");
        assert_eq!(
            normalize_value("rgb(1, 2, 3)", None, None),
            "rgb(1,2,3)"
        );
        assert_eq!(
            normalize_value("outset", Some("border-style"), Some("none")),
            "none"
        );
        assert_eq!(normalize_value("BLOCK", None, None), "block");
    }
}
