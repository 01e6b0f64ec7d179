//! Path canonicalization and archive-safe sanitization.
//!
//! Every path that ends up as an archive entry name or as a link target goes
//! through [`sanitize_path`], so the two always agree byte for byte.

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Forward-slash path of `path` relative to `root`.
///
/// Returns `None` when `path` is not located under `root` or contains a
/// parent-directory component after the prefix is stripped.
pub fn relative_slash_path(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut segments = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(s) => segments.push(s.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(segments.join("/"))
}

/// Replace every whitespace run in a single path segment with one underscore.
pub fn sanitize_segment(segment: &str) -> String {
    WHITESPACE_RUN_RE.replace_all(segment, "_").into_owned()
}

/// Sanitize a relative path segment by segment, preserving separators.
///
/// Backslashes are treated as separators so Windows-style references
/// sanitize to the same key as their forward-slash spelling.
pub fn sanitize_path(relative: &str) -> String {
    relative.replace('\\', "/").split('/').map(sanitize_segment).collect::<Vec<_>>().join("/")
}

/// Sanitized forward-slash path of `path` relative to `root`.
pub fn sanitized_relative(path: &Path, root: &Path) -> Option<String> {
    relative_slash_path(path, root).map(|rel| sanitize_path(&rel))
}

/// Key used to decide whether two paths name the same file.
///
/// Case-insensitive and separator-insensitive.
pub fn comparison_key(path: &str) -> String {
    path.replace('\\', "/").trim_end_matches('/').to_lowercase()
}

pub fn same_file(a: &Path, b: &Path) -> bool {
    comparison_key(&a.to_string_lossy()) == comparison_key(&b.to_string_lossy())
}

/// Collapse `.` and `..` components without touching the filesystem.
///
/// A `..` that would climb above the first component is kept, so callers can
/// detect references escaping their base with a `strip_prefix` check.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().map(|c| c.as_os_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Draft Plan.md", "Draft_Plan.md")]
    #[case("A/Draft Plan.md", "A/Draft_Plan.md")]
    #[case("My  Folder/a \t b.png", "My_Folder/a_b.png")]
    #[case(" lead/trail ", "_lead/trail_")]
    #[case("no_spaces/x.md", "no_spaces/x.md")]
    #[case("win\\style path.md", "win/style_path.md")]
    fn test_sanitize_path(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize_path(input), expected);
    }

    #[test]
    fn test_sanitize_preserves_separators() {
        let sanitized = sanitize_path("a b/c d/e f.md");
        assert_eq!(sanitized.matches('/').count(), 2);
    }

    #[test]
    fn test_relative_slash_path() {
        let root = Path::new("/vault");
        assert_eq!(
            relative_slash_path(Path::new("/vault/A/B/x.md"), root),
            Some("A/B/x.md".to_string())
        );
        assert_eq!(relative_slash_path(Path::new("/elsewhere/x.md"), root), None);
        assert_eq!(relative_slash_path(root, root), Some(String::new()));
    }

    #[test]
    fn test_sanitized_relative_matches_sanitize_path() {
        let root = Path::new("/vault");
        let file = Path::new("/vault/Projects 2024/My Note.md");
        let rel = relative_slash_path(file, root).unwrap();
        assert_eq!(sanitized_relative(file, root).unwrap(), sanitize_path(&rel));
    }

    #[test]
    fn test_same_file_is_case_and_separator_insensitive() {
        assert!(same_file(Path::new("Notes/Note1.md"), Path::new("notes\\NOTE1.md")));
        assert!(!same_file(Path::new("Notes/Note1.md"), Path::new("Notes/Note2.md")));
    }

    #[rstest]
    #[case("/vault/A/B/../x.md", "/vault/A/x.md")]
    #[case("/vault/./A/x.md", "/vault/A/x.md")]
    #[case("/vault/../../x.md", "/x.md")]
    #[case("a/../../x.md", "../x.md")]
    fn test_normalize_lexically(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_lexically(Path::new(input)), PathBuf::from(expected));
    }
}
