//! Merging computed structural fields into a document header.

use std::collections::BTreeSet;

use serde_yaml::{Mapping, Value};

use super::types::{Frontmatter, ParsedDocument};
use crate::hierarchy::DocumentRole;

/// Key holding the document role.
pub const TYPE_KEY: &str = "type";
/// Key holding the owning root container.
pub const SET_KEY: &str = "set";
/// Key holding the tag mapping.
pub const TAGS_KEY: &str = "tags";

/// Merge role, container membership and tags into a document's header.
///
/// - `type` is always overwritten with `role`.
/// - `set` is set to `owning_container`, or removed when there is none.
/// - `tags` is the union of whatever tags the header already lists (sequence,
///   mapping keys or a comma-separated string) and `tags`, written as a
///   `tag: tag` mapping in sorted order. Left out when the union is empty.
///
/// Every other key keeps its value and position. Applying the merge twice
/// with the same inputs gives the same document.
pub fn merge_metadata(
    mut doc: ParsedDocument,
    role: DocumentRole,
    owning_container: Option<&str>,
    tags: &BTreeSet<String>,
) -> ParsedDocument {
    let fm = doc.frontmatter.get_or_insert_with(Frontmatter::default);

    fm.insert(TYPE_KEY, Value::String(role.as_str().to_string()));

    match owning_container {
        Some(set) => fm.insert(SET_KEY, Value::String(set.to_string())),
        None => {
            fm.remove(SET_KEY);
        }
    }

    let mut merged = fm.get(TAGS_KEY).map(existing_tags).unwrap_or_default();
    merged.extend(tags.iter().cloned());
    if !merged.is_empty() {
        let mapping: Mapping = merged
            .into_iter()
            .map(|tag| (Value::String(tag.clone()), Value::String(tag)))
            .collect();
        fm.insert(TAGS_KEY, Value::Mapping(mapping));
    }

    doc
}

/// Tags already present in a header value.
fn existing_tags(value: &Value) -> BTreeSet<String> {
    match value {
        Value::Sequence(items) => {
            items.iter().filter_map(scalar_to_string).filter_map(|s| normalize_tag(&s)).collect()
        }
        Value::Mapping(map) => {
            map.keys().filter_map(scalar_to_string).filter_map(|s| normalize_tag(&s)).collect()
        }
        Value::String(s) => s.split(',').filter_map(normalize_tag).collect(),
        other => scalar_to_string(other).and_then(|s| normalize_tag(&s)).into_iter().collect(),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn normalize_tag(raw: &str) -> Option<String> {
    let tag = raw.trim().trim_matches(['[', ']', '"', '\'']).trim();
    let tag = tag.strip_prefix('#').unwrap_or(tag);
    if tag.is_empty() { None } else { Some(tag.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontmatter::{parse, serialize};

    fn tags(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn merged(content: &str, role: DocumentRole, set: Option<&str>, t: &[&str]) -> String {
        let doc = parse(content).unwrap();
        serialize(&merge_metadata(doc, role, set, &tags(t)))
    }

    #[test]
    fn test_synthesizes_page_header() {
        let out = merged("# Note 1\n", DocumentRole::Page, None, &[]);
        assert_eq!(out, "---\ntype: Page\n---\n# Note 1\n");
    }

    #[test]
    fn test_synthesizes_set_leaf_header() {
        let out = merged("Body", DocumentRole::SetLeaf, Some("Notes"), &["real/tag"]);
        assert_eq!(out, "---\ntype: SetLeaf\nset: Notes\ntags:\n  real/tag: real/tag\n---\nBody");
    }

    #[test]
    fn test_preserves_user_keys_in_place() {
        let content = "---\ntitle: Plan\ntype: note\nauthor: me\n---\nBody";
        let out = merged(content, DocumentRole::SetLeaf, Some("Work"), &[]);
        assert_eq!(out, "---\ntitle: Plan\ntype: SetLeaf\nauthor: me\nset: Work\n---\nBody");
    }

    #[test]
    fn test_page_drops_stale_set() {
        let content = "---\nset: Old\ntitle: x\n---\nBody";
        let out = merged(content, DocumentRole::Page, None, &[]);
        assert_eq!(out, "---\ntitle: x\ntype: Page\n---\nBody");
    }

    #[test]
    fn test_merges_sequence_tags() {
        let content = "---\ntags:\n  - zeta\n  - '#alpha'\n---\nBody";
        let doc = merge_metadata(
            parse(content).unwrap(),
            DocumentRole::Page,
            None,
            &tags(&["beta", "alpha"]),
        );
        let fm = doc.frontmatter.unwrap();
        let keys: Vec<_> = fm.get(TAGS_KEY).unwrap().as_mapping().unwrap().keys()
            .filter_map(|k| k.as_str())
            .collect();
        assert_eq!(keys, vec!["alpha", "beta", "zeta"]);
    }

    #[test]
    fn test_merges_comma_separated_tags() {
        let content = "---\ntags: one, two ,#three\n---\nBody";
        let doc =
            merge_metadata(parse(content).unwrap(), DocumentRole::Page, None, &tags(&[]));
        let fm = doc.frontmatter.unwrap();
        let map = fm.get(TAGS_KEY).unwrap().as_mapping().unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("three").and_then(|v| v.as_str()), Some("three"));
    }

    #[test]
    fn test_merges_mapping_tags() {
        let content = "---\ntags:\n  b: b\n  a: a\n---\nBody";
        let out = merged(content, DocumentRole::Page, None, &["c"]);
        assert_eq!(out, "---\ntags:\n  a: a\n  b: b\n  c: c\ntype: Page\n---\nBody");
    }

    #[test]
    fn test_numeric_tags_stay_strings() {
        let content = "---\ntags: [2024]\n---\nBody";
        let doc =
            merge_metadata(parse(content).unwrap(), DocumentRole::Page, None, &tags(&[]));
        let fm = doc.frontmatter.unwrap();
        let map = fm.get(TAGS_KEY).unwrap().as_mapping().unwrap();
        assert_eq!(map.get("2024").and_then(|v| v.as_str()), Some("2024"));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let inputs = [
            "# Plain\n",
            "---\ntitle: Plan\ntags: a, b\n---\n\nBody text\n",
            "---\ntags:\n  - x\nset: Stale\n---\nBody",
            "",
        ];
        for input in inputs {
            for (role, set) in [(DocumentRole::Page, None), (DocumentRole::SetLeaf, Some("Notes"))] {
                let once = merged(input, role, set, &["real/tag", "2024"]);
                let twice = merged(&once, role, set, &["real/tag", "2024"]);
                assert_eq!(once, twice, "merge not idempotent for {input:?}");
            }
        }
    }
}
