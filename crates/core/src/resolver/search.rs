//! Lookup primitives shared by the resolution strategies.

use std::cell::OnceCell;
use std::path::{Component, Path, PathBuf};

use crate::exclusion::ExclusionFilter;
use crate::vault::{EntryKind, VaultWalker, WalkedFile, list_entries};

/// Where a search match may live relative to the search base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Any non-excluded directory.
    Anywhere,
    /// Only below an attachment-store folder. With `Some(n)`, that folder must
    /// sit within the first `n` directory levels of the base.
    InAttachments(Option<usize>),
}

/// Everything a strategy needs to look for one candidate file.
pub struct SearchContext<'a> {
    pub export_root: &'a Path,
    pub document_dir: &'a Path,
    /// Candidate relative file name, e.g. `Draft Plan.md` or `img/chart.png`.
    pub candidate: &'a str,
    pub filter: &'a ExclusionFilter,
    /// Lazily built list of every walkable file under the export root.
    pub index: &'a OnceCell<Vec<WalkedFile>>,
    /// Final gate: only files that will be emitted are acceptable.
    pub accept: &'a dyn Fn(&Path) -> bool,
}

impl<'a> SearchContext<'a> {
    /// Look up the candidate directly below `base`.
    ///
    /// Each segment prefers an exact name and falls back to a
    /// case-insensitive one, so the returned path always carries the on-disk
    /// spelling.
    pub fn direct(&self, base: &Path) -> Option<PathBuf> {
        let segments: Vec<&str> =
            self.candidate.split(['/', '\\']).filter(|s| !s.is_empty()).collect();
        let (last, dirs) = segments.split_last()?;

        let mut current = base.to_path_buf();
        for segment in dirs {
            match *segment {
                "." => {}
                ".." => {
                    if !current.pop() {
                        return None;
                    }
                }
                name => current = child_named(&current, name, EntryKind::Directory)?,
            }
        }
        let found = child_named(&current, last, EntryKind::File)?;
        (self.accept)(&found).then_some(found)
    }

    /// Attachment-store folders directly inside `dir`.
    pub fn attachment_dirs_in(&self, dir: &Path) -> Vec<PathBuf> {
        list_entries(dir)
            .map(|entries| {
                entries
                    .into_iter()
                    .filter(|e| e.is_dir() && self.filter.is_attachments_dir(&e.name))
                    .map(|e| e.absolute_path)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Search below `base` for a file whose trailing path segments match the
    /// candidate, case-insensitively.
    ///
    /// The shallowest match wins; ties go to the lexicographically smaller
    /// lowercase path.
    pub fn search(&self, base: &Path, max_depth: Option<usize>, scope: Scope) -> Option<PathBuf> {
        let base_rel = base.strip_prefix(self.export_root).ok()?;
        let tail = self.tail_segments();
        if tail.is_empty() {
            return None;
        }

        self.index()
            .iter()
            .filter_map(|file| {
                let rel = file.relative_path.strip_prefix(base_rel).ok()?;
                let parts: Vec<String> =
                    rel.iter().map(|s| s.to_string_lossy().to_lowercase()).collect();
                Some((file, parts))
            })
            .filter(|(_, parts)| max_depth.is_none_or(|depth| parts.len() <= depth))
            .filter(|(_, parts)| parts.ends_with(&tail))
            .filter(|(_, parts)| self.in_scope(parts, scope))
            .filter(|(file, _)| (self.accept)(&file.absolute_path))
            .min_by(|(_, a), (_, b)| a.len().cmp(&b.len()).then_with(|| a.join("/").cmp(&b.join("/"))))
            .map(|(file, _)| file.absolute_path.clone())
    }

    /// The top-level folder holding the current document, if it is not at
    /// the export root.
    pub fn top_level_folder(&self) -> Option<PathBuf> {
        let rel = self.document_dir.strip_prefix(self.export_root).ok()?;
        match rel.components().next()? {
            Component::Normal(first) => Some(self.export_root.join(first)),
            _ => None,
        }
    }

    fn index(&self) -> &[WalkedFile] {
        self.index.get_or_init(|| VaultWalker::new(self.export_root, self.filter).files())
    }

    fn tail_segments(&self) -> Vec<String> {
        self.candidate
            .split(['/', '\\'])
            .filter(|s| !s.is_empty() && *s != "." && *s != "..")
            .map(str::to_lowercase)
            .collect()
    }

    fn in_scope(&self, parts: &[String], scope: Scope) -> bool {
        let dirs = &parts[..parts.len().saturating_sub(1)];
        match scope {
            Scope::Anywhere => true,
            Scope::InAttachments(limit) => dirs
                .iter()
                .enumerate()
                .any(|(i, d)| limit.is_none_or(|n| i < n) && self.filter.is_attachments_dir(d)),
        }
    }
}

/// Entry of `kind` in `dir` called `name`, exact spelling first.
fn child_named(dir: &Path, name: &str, kind: EntryKind) -> Option<PathBuf> {
    let entries = list_entries(dir).ok()?;
    let lower = name.to_lowercase();
    entries
        .iter()
        .filter(|e| e.kind == kind)
        .find(|e| e.name == name)
        .or_else(|| entries.iter().filter(|e| e.kind == kind).find(|e| e.name.to_lowercase() == lower))
        .map(|e| e.absolute_path.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn vault() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("A/B/C")).unwrap();
        fs::create_dir_all(root.join("A/Attachments")).unwrap();
        fs::write(root.join("A/B/C/deep.md"), "").unwrap();
        fs::write(root.join("A/Draft Plan.md"), "").unwrap();
        fs::write(root.join("A/Attachments/chart.png"), "").unwrap();
        fs::write(root.join("chart.png"), "").unwrap();
        dir
    }

    fn with_context<T>(
        root: &Path,
        doc_dir: &Path,
        candidate: &str,
        f: impl FnOnce(&SearchContext<'_>) -> T,
    ) -> T {
        let filter = ExclusionFilter::default();
        let index = OnceCell::new();
        let accept = |p: &Path| p.is_file();
        let ctx = SearchContext {
            export_root: root,
            document_dir: doc_dir,
            candidate,
            filter: &filter,
            index: &index,
            accept: &accept,
        };
        f(&ctx)
    }

    #[test]
    fn test_direct_is_case_insensitive_and_keeps_disk_spelling() {
        let v = vault();
        let root = v.path();
        let found = with_context(root, root, "a/draft plan.md", |ctx| ctx.direct(root));
        assert_eq!(found, Some(root.join("A/Draft Plan.md")));
    }

    #[test]
    fn test_direct_parent_segments() {
        let v = vault();
        let root = v.path();
        let doc_dir = root.join("A/B");
        let found = with_context(root, &doc_dir, "../Draft Plan.md", |ctx| ctx.direct(&doc_dir));
        assert_eq!(found, Some(root.join("A/Draft Plan.md")));
    }

    #[test]
    fn test_search_respects_depth() {
        let v = vault();
        let root = v.path();
        let a = root.join("A");
        assert!(with_context(root, &a, "deep.md", |ctx| ctx.search(&a, Some(2), Scope::Anywhere))
            .is_none());
        assert_eq!(
            with_context(root, &a, "deep.md", |ctx| ctx.search(&a, Some(3), Scope::Anywhere)),
            Some(root.join("A/B/C/deep.md"))
        );
    }

    #[test]
    fn test_search_prefers_shallowest() {
        let v = vault();
        let root = v.path();
        let found = with_context(root, root, "CHART.png", |ctx| ctx.search(root, None, Scope::Anywhere));
        assert_eq!(found, Some(root.join("chart.png")));
    }

    #[test]
    fn test_search_in_attachments_scope() {
        let v = vault();
        let root = v.path();
        let found = with_context(root, root, "chart.png", |ctx| {
            ctx.search(root, None, Scope::InAttachments(None))
        });
        assert_eq!(found, Some(root.join("A/Attachments/chart.png")));

        let shallow = with_context(root, root, "chart.png", |ctx| {
            ctx.search(root, None, Scope::InAttachments(Some(1)))
        });
        assert!(shallow.is_none());
    }

    #[test]
    fn test_top_level_folder() {
        let v = vault();
        let root = v.path();
        let doc_dir = root.join("A/B/C");
        let top = with_context(root, &doc_dir, "x.md", |ctx| ctx.top_level_folder());
        assert_eq!(top, Some(root.join("A")));
        assert!(with_context(root, root, "x.md", |ctx| ctx.top_level_folder()).is_none());
    }
}
