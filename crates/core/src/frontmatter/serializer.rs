//! Frontmatter serialization back to markdown.

use super::types::{Frontmatter, ParsedDocument};

/// Serialize a parsed document back to a markdown string.
///
/// The body follows the closing delimiter line directly, which is exactly
/// what [`parse`](super::parse) strips, so parse/serialize round-trips.
pub fn serialize(doc: &ParsedDocument) -> String {
    if let Some(fm) = &doc.frontmatter
        && !fm.fields.is_empty()
    {
        return format!("---\n{}---\n{}", frontmatter_to_yaml(fm), doc.body);
    }
    doc.body.clone()
}

/// Serialize a Frontmatter struct to YAML string (without delimiters).
pub fn frontmatter_to_yaml(fm: &Frontmatter) -> String {
    let yaml = serde_yaml::to_string(&fm.fields).unwrap_or_default();
    if yaml.ends_with('\n') { yaml } else { format!("{yaml}\n") }
}
