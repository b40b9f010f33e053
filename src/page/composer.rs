#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Assembles one HTML document string from the submission's html, css, and
/// (already wrapped) js fragments.
///
/// A submission whose html starts with a doctype declaration is treated as a
/// full document: the stylesheet is spliced in immediately before `</head>`
/// and the script immediately before `</body>`. Anything else is treated as a
/// body fragment and wrapped in a synthesized document skeleton.
///
/// * `html`: the learner's markup, fragment or full document
/// * `css`: the learner's stylesheet
/// * `wrapped_js`: the learner's script, after [`crate::page::ScriptBridge`]
pub fn compose_document(html: &str, css: &str, wrapped_js: &str) -> String {
    if is_full_document(html) {
        let with_style = splice_before(
            html,
            "</head>",
            &format!("<style>{css}</style>"),
        );
        splice_before(
            &with_style,
            "</body>",
            &format!("<script>{wrapped_js}</script>"),
        )
    } else {
        format!(
            "<html><head><style>{css}</style></head><body>{html}<script>{wrapped_js}</script></body></html>"
        )
    }
}

/// Returns true when the markup is a full document, i.e. it starts with a
/// doctype declaration (case-insensitive, leading whitespace ignored).
fn is_full_document(html: &str) -> bool {
    html.trim_start()
        .get(..9)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("<!doctype"))
}

/// Inserts `insertion` immediately before the first case-insensitive
/// occurrence of `anchor`, or appends it when the anchor is absent.
fn splice_before(document: &str, anchor: &str, insertion: &str) -> String {
    match find_case_insensitive(document, anchor) {
        Some(at) => {
            let mut out = String::with_capacity(document.len() + insertion.len());
            out.push_str(&document[..at]);
            out.push_str(insertion);
            out.push_str(&document[at..]);
            out
        }
        None => {
            let mut out = document.to_string();
            out.push_str(insertion);
            out
        }
    }
}

/// Byte offset of the first case-insensitive occurrence of `needle`.
fn find_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let lowered = haystack.to_ascii_lowercase();
    lowered.find(&needle.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_fragments_in_a_skeleton() {
        let document = compose_document("<h1>Hi</h1>", "h1 { color: red; }", "console.log(1);");
        assert!(document.starts_with("<html><head><style>"));
        assert!(document.contains("<body><h1>Hi</h1><script>console.log(1);</script></body>"));
    }

    #[test]
    fn splices_into_full_documents() {
        let html = "<!DOCTYPE html>\n<html><head><title>t</title></head><body><p>x</p></body></html>";
        let document = compose_document(html, "p { color: blue; }", "var a = 1;");
        assert!(document.contains("<style>p { color: blue; }</style></head>"));
        assert!(document.contains("<script>var a = 1;</script></body>"));
    }

    #[test]
    fn doctype_detection_is_case_insensitive() {
        assert!(is_full_document("  <!doctype html><html></html>"));
        assert!(is_full_document("<!DocType HTML><html></html>"));
        assert!(!is_full_document("<div></div>"));
    }

    #[test]
    fn missing_anchors_append_instead_of_dropping() {
        let document = compose_document("<!doctype html><p>bare</p>", "p{}", "1;");
        assert!(document.contains("<style>p{}</style>"));
        assert!(document.contains("<script>1;</script>"));
    }

    #[test]
    fn composition_is_deterministic() {
        let a = compose_document("<p>x</p>", "p{}", "var a;");
        let b = compose_document("<p>x</p>", "p{}", "var a;");
        assert_eq!(a, b);
    }
}
