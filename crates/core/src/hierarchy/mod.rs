//! Classifying directories into containers and documents into roles.
//!
//! Direct children of the export root are root containers. Anything deeper
//! belongs to the root container above it. Folders named like attachment
//! stores are kept out of the outline, and a root-level attachment store has
//! no owner at all.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::exclusion::ExclusionFilter;
use crate::paths::sanitized_relative;
use crate::vault::{EntryKind, VaultEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DirectoryRole {
    ExportRoot,
    RootContainer,
    NestedContainer,
    Attachments,
}

/// Role written to a document's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DocumentRole {
    /// Standalone document with no owning container.
    Page,
    /// Document that belongs to a root container.
    SetLeaf,
}

impl DocumentRole {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentRole::Page => "Page",
            DocumentRole::SetLeaf => "SetLeaf",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDescriptor {
    pub name: String,
    pub source_path: PathBuf,
    /// Sanitized path relative to the export root; empty for the root itself.
    pub relative_path_in_output: String,
    pub is_root_container: bool,
    pub owning_root_container: Option<String>,
    pub excluded: bool,
    pub role: DirectoryRole,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPlacement {
    pub role: DocumentRole,
    pub owning_container: Option<String>,
}

/// Memoizing directory classifier for one export run.
#[derive(Debug)]
pub struct HierarchyClassifier {
    filter: ExclusionFilter,
    cache: HashMap<(PathBuf, PathBuf), ContainerDescriptor>,
}

impl HierarchyClassifier {
    pub fn new(filter: ExclusionFilter) -> Self {
        Self { filter, cache: HashMap::new() }
    }

    /// Classify `dir` relative to `export_root`.
    ///
    /// The first answer for a `(dir, export_root)` pair is kept for the rest
    /// of the run.
    pub fn classify_dir(&mut self, dir: &Path, export_root: &Path) -> &ContainerDescriptor {
        let key = (dir.to_path_buf(), export_root.to_path_buf());
        if self.cache.contains_key(&key) {
            return &self.cache[&key];
        }

        let descriptor = self.compute(dir, export_root);
        tracing::debug!(
            "classified {} as {:?} (owner: {:?}, excluded: {})",
            dir.display(),
            descriptor.role,
            descriptor.owning_root_container,
            descriptor.excluded
        );
        self.cache.entry(key).or_insert(descriptor)
    }

    fn compute(&mut self, dir: &Path, export_root: &Path) -> ContainerDescriptor {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if dir == export_root {
            return ContainerDescriptor {
                name,
                source_path: dir.to_path_buf(),
                relative_path_in_output: String::new(),
                is_root_container: false,
                owning_root_container: None,
                excluded: false,
                role: DirectoryRole::ExportRoot,
            };
        }

        let relative = sanitized_relative(dir, export_root);
        let parent = match (dir.parent(), &relative) {
            (Some(parent), Some(_)) => self.classify_dir(parent, export_root).clone(),
            _ => {
                // Outside the export root: nothing owns it and nothing exports it.
                return ContainerDescriptor {
                    name,
                    source_path: dir.to_path_buf(),
                    relative_path_in_output: String::new(),
                    is_root_container: false,
                    owning_root_container: None,
                    excluded: true,
                    role: DirectoryRole::NestedContainer,
                };
            }
        };

        let entry = VaultEntry {
            absolute_path: dir.to_path_buf(),
            kind: EntryKind::Directory,
            name: name.clone(),
        };
        let excluded = parent.excluded || self.filter.is_excluded(&entry);
        let is_attachments = self.filter.is_attachments_dir(&name);
        let at_top = parent.role == DirectoryRole::ExportRoot;

        let (role, owner) = match (at_top, is_attachments) {
            (true, true) => (DirectoryRole::Attachments, None),
            (true, false) => (DirectoryRole::RootContainer, Some(name.clone())),
            (false, true) => (DirectoryRole::Attachments, parent.owning_root_container.clone()),
            (false, false) => {
                (DirectoryRole::NestedContainer, parent.owning_root_container.clone())
            }
        };

        ContainerDescriptor {
            source_path: dir.to_path_buf(),
            relative_path_in_output: relative.unwrap_or_default(),
            is_root_container: role == DirectoryRole::RootContainer && !excluded,
            owning_root_container: if excluded { None } else { owner },
            excluded,
            role,
            name,
        }
    }

    /// Role and owning root container of the document at `path`.
    pub fn place_document(&mut self, path: &Path, export_root: &Path) -> DocumentPlacement {
        let Some(parent) = path.parent() else {
            return DocumentPlacement { role: DocumentRole::Page, owning_container: None };
        };
        match &self.classify_dir(parent, export_root).owning_root_container {
            Some(owner) => {
                DocumentPlacement { role: DocumentRole::SetLeaf, owning_container: Some(owner.clone()) }
            }
            None => DocumentPlacement { role: DocumentRole::Page, owning_container: None },
        }
    }

    /// Number of directories classified so far.
    pub fn classified(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> HierarchyClassifier {
        HierarchyClassifier::new(ExclusionFilter::default())
    }

    #[test]
    fn test_export_root() {
        let mut c = classifier();
        let root = Path::new("/vault");
        let d = c.classify_dir(root, root);
        assert_eq!(d.role, DirectoryRole::ExportRoot);
        assert!(d.owning_root_container.is_none());
        assert!(!d.excluded);
    }

    #[test]
    fn test_root_container() {
        let mut c = classifier();
        let root = Path::new("/vault");
        let d = c.classify_dir(&root.join("My Notes"), root);
        assert_eq!(d.role, DirectoryRole::RootContainer);
        assert!(d.is_root_container);
        assert_eq!(d.owning_root_container.as_deref(), Some("My Notes"));
        assert_eq!(d.relative_path_in_output, "My_Notes");
    }

    #[test]
    fn test_nested_owner_is_root_container() {
        let mut c = classifier();
        let root = Path::new("/vault");
        let d = c.classify_dir(&root.join("A/B/C"), root);
        assert_eq!(d.role, DirectoryRole::NestedContainer);
        assert!(!d.is_root_container);
        assert_eq!(d.owning_root_container.as_deref(), Some("A"));
        assert_eq!(d.relative_path_in_output, "A/B/C");
    }

    #[test]
    fn test_root_attachments_have_no_owner() {
        let mut c = classifier();
        let root = Path::new("/vault");
        let d = c.classify_dir(&root.join("Attachments"), root);
        assert_eq!(d.role, DirectoryRole::Attachments);
        assert!(d.owning_root_container.is_none());
    }

    #[test]
    fn test_nested_attachments_keep_owner() {
        let mut c = classifier();
        let root = Path::new("/vault");
        let d = c.classify_dir(&root.join("Projects/attachments"), root);
        assert_eq!(d.role, DirectoryRole::Attachments);
        assert_eq!(d.owning_root_container.as_deref(), Some("Projects"));
    }

    #[test]
    fn test_exclusion_propagates_down() {
        let mut c = classifier();
        let root = Path::new("/vault");
        assert!(c.classify_dir(&root.join("_deleted/Projects"), root).excluded);
        assert!(c.classify_dir(&root.join("Work/.git/objects"), root).excluded);
        assert!(!c.classify_dir(&root.join("Work/Projects"), root).excluded);
    }

    #[test]
    fn test_memoized_per_root() {
        let mut c = classifier();
        let root = Path::new("/vault");
        c.classify_dir(&root.join("A/B"), root);
        assert_eq!(c.classified(), 3);
        c.classify_dir(&root.join("A/B"), root);
        assert_eq!(c.classified(), 3);

        // Same directory under a nested export root is a separate answer.
        let nested = root.join("A");
        let d = c.classify_dir(&root.join("A/B"), &nested);
        assert_eq!(d.role, DirectoryRole::RootContainer);
        assert_eq!(d.owning_root_container.as_deref(), Some("B"));
    }

    #[test]
    fn test_place_document() {
        let mut c = classifier();
        let root = Path::new("/vault");

        let top = c.place_document(&root.join("Note1.md"), root);
        assert_eq!(top, DocumentPlacement { role: DocumentRole::Page, owning_container: None });

        let leaf = c.place_document(&root.join("Notes/Note1.md"), root);
        assert_eq!(leaf.role, DocumentRole::SetLeaf);
        assert_eq!(leaf.owning_container.as_deref(), Some("Notes"));

        let deep = c.place_document(&root.join("A/B/x.md"), root);
        assert_eq!(deep.owning_container.as_deref(), Some("A"));

        let stray = c.place_document(&root.join("assets/readme.md"), root);
        assert_eq!(stray.role, DocumentRole::Page);
    }
}
