//! Frontmatter parsing from markdown documents.

use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::Value;
use thiserror::Error;

use super::types::{Frontmatter, ParsedDocument};

/// Errors that can occur during frontmatter parsing.
#[derive(Debug, Error)]
pub enum FrontmatterParseError {
    #[error("invalid YAML frontmatter: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    #[error("frontmatter is not a key/value mapping")]
    NotAMapping,
}

static KEY_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    // `key: value` or `key:` at column zero
    Regex::new(r"^([A-Za-z0-9_][A-Za-z0-9_ .-]*?)\s*:(?:\s+(.*?))?\s*$").unwrap()
});

/// Parse frontmatter from markdown content.
///
/// Frontmatter is delimited by `---` lines at the start of the document:
/// ```markdown
/// ---
/// key: value
/// ---
/// # Document content
/// ```
///
/// The body starts right after the newline that ends the closing delimiter.
pub fn parse(content: &str) -> Result<ParsedDocument, FrontmatterParseError> {
    let Some((yaml, body)) = split_frontmatter(content) else {
        return Ok(ParsedDocument { frontmatter: None, body: content.to_string() });
    };

    let frontmatter = if yaml.trim().is_empty() {
        Frontmatter::default()
    } else {
        match serde_yaml::from_str::<Value>(yaml)? {
            Value::Mapping(fields) => Frontmatter { fields },
            Value::Null => Frontmatter::default(),
            _ => return Err(FrontmatterParseError::NotAMapping),
        }
    };

    Ok(ParsedDocument { frontmatter: Some(frontmatter), body: body.to_string() })
}

/// Parse frontmatter, recovering from invalid YAML.
///
/// Headers that are plain `key: value` lines (optionally followed by `- item`
/// lists) are recovered line by line. Anything else is left in the body
/// untouched so no user text is lost.
pub fn parse_lenient(content: &str) -> ParsedDocument {
    let (doc, error) = parse_recovering(content);
    if let Some(e) = error {
        match &doc.frontmatter {
            Some(fm) => tracing::warn!(
                "frontmatter is not valid YAML ({}), recovered {} fields line by line",
                e,
                fm.fields.len()
            ),
            None => {
                tracing::warn!("frontmatter is not valid YAML ({}), keeping it as body text", e)
            }
        }
    }
    doc
}

/// Like [`parse_lenient`], but hands the parse error back instead of logging it.
pub fn parse_recovering(content: &str) -> (ParsedDocument, Option<FrontmatterParseError>) {
    match parse(content) {
        Ok(doc) => (doc, None),
        Err(e) => {
            if let Some((yaml, body)) = split_frontmatter(content)
                && let Some(frontmatter) = scan_key_values(yaml)
            {
                let doc =
                    ParsedDocument { frontmatter: Some(frontmatter), body: body.to_string() };
                return (doc, Some(e));
            }
            (ParsedDocument { frontmatter: None, body: content.to_string() }, Some(e))
        }
    }
}

/// Split a document into its raw frontmatter text and body.
fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let trimmed = content.trim_start();
    let mut lines = trimmed.split_inclusive('\n');

    let first = lines.next()?;
    if first.trim_end() != "---" {
        return None;
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end() == "---" {
            let yaml = &trimmed[yaml_start..offset];
            let body = &trimmed[offset + line.len()..];
            return Some((yaml, body));
        }
        offset += line.len();
    }

    // No closing ---, treat as no frontmatter
    None
}

/// Line-by-line recovery of simple `key: value` headers.
fn scan_key_values(yaml: &str) -> Option<Frontmatter> {
    let mut fm = Frontmatter::default();
    let mut current_key: Option<String> = None;

    for line in yaml.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if line.starts_with([' ', '\t']) || trimmed.starts_with("- ") {
            let item = trimmed.strip_prefix("- ")?;
            let key = current_key.as_deref()?;
            match fm.get(key) {
                Some(Value::Sequence(items)) => {
                    let mut items = items.clone();
                    items.push(recovered_scalar(item));
                    fm.insert(key, Value::Sequence(items));
                }
                Some(Value::Null) => {
                    fm.insert(key, Value::Sequence(vec![recovered_scalar(item)]));
                }
                _ => return None,
            }
            continue;
        }

        let caps = KEY_LINE_RE.captures(line)?;
        let key = caps.get(1)?.as_str().to_string();
        match caps.get(2).map(|m| m.as_str()).filter(|v| !v.is_empty()) {
            Some(value) => fm.insert(&key, recovered_scalar(value)),
            None => fm.insert(&key, Value::Null),
        }
        current_key = Some(key);
    }

    Some(fm)
}

/// Typed value of a recovered `value`: numbers, booleans and flow lists keep
/// their YAML type, quoted or otherwise unparsable text stays a string.
fn recovered_scalar(raw: &str) -> Value {
    let unquoted = unquote(raw);
    if unquoted.len() != raw.len() {
        return Value::String(unquoted.to_string());
    }
    match serde_yaml::from_str::<Value>(raw) {
        Ok(value @ (Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Sequence(_))) => {
            value
        }
        _ => Value::String(raw.to_string()),
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(value)
}
