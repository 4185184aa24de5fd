use scraper::{Html, Node};

/// Parent elements whose text never reaches the model.
const SKIP_PARENTS: &[&str] = &["style", "script", "head", "meta"];

/// Default prefix kept for the prompt.
pub const DEFAULT_MAX_CHARS: usize = 8000;

/// Visible text of an HTML document, one fragment per line, capped at `max_chars`.
///
/// A text node is dropped when its parent is one of [`SKIP_PARENTS`] or the
/// document itself. Fragments are trimmed and empty ones discarded.
pub fn extract_text(html: &str, max_chars: usize) -> String {
    let joined = visible_fragments(html).join("\n");
    truncate_chars(&joined, max_chars)
}

fn visible_fragments(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut fragments = Vec::new();

    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let Some(parent) = node.parent() else {
            continue;
        };
        match parent.value() {
            Node::Element(el) if !SKIP_PARENTS.contains(&el.name()) => {}
            _ => continue,
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            fragments.push(trimmed.to_string());
        }
    }

    fragments
}

/// First `max` characters of `s` (not bytes).
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

// ── Tests ──
