//! Inline `#tag` extraction.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::markdown_ast::{SpanKind, partition};

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#([\w/-]+)").unwrap());

/// Characters that glue a `#` to preceding text: entities (`&`), urls (`/`),
/// wiki-link sections (`[`), escapes and the end of an inline code span.
const GLUE_CHARS: &[char] = &['#', '&', '/', '[', '\\', '`'];

/// Collect the distinct inline tags of `text`, sorted.
///
/// Tokens inside code blocks and inline code are ignored, as are purely
/// numeric tokens like `#123`. A trailing `/` is dropped.
pub fn extract_tags(text: &str) -> BTreeSet<String> {
    let mut tags = BTreeSet::new();
    for span in partition(text) {
        if span.kind != SpanKind::Text {
            continue;
        }
        for caps in TAG_RE.captures_iter(span.slice(text)) {
            let hash = span.range.start + caps.get(0).map_or(0, |m| m.start());
            if !starts_tag(&text[..hash]) {
                continue;
            }
            let tag = caps[1].trim_end_matches('/');
            if tag.is_empty() || tag.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            tags.insert(tag.to_string());
        }
    }
    tags
}

/// Whether a `#` preceded by `before` opens a tag.
fn starts_tag(before: &str) -> bool {
    let Some(prev) = before.chars().next_back() else {
        return true;
    };
    if prev.is_alphanumeric() || prev == '_' || GLUE_CHARS.contains(&prev) {
        return false;
    }
    // `[text](#heading)` points into the same document
    !(prev == '(' && before[..before.len() - 1].ends_with(']'))
}
