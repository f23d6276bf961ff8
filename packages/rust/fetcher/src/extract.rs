//! HTML → plain text.

use scraper::{Html, Node};

/// Elements whose text never counts as page content.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Extract visible text from an HTML document, collapsing all whitespace runs
/// to single spaces.
pub fn extract_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut pieces: Vec<&str> = Vec::new();

    for node in doc.tree.nodes() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            pieces.push(text);
        }
    }

    pieces
        .iter()
        .flat_map(|p| p.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Truncate to at most `max_chars` characters, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
