//! Directory listing and recursive vault walking.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::exclusion::ExclusionFilter;

#[derive(Debug, Error)]
pub enum VaultWalkerError {
    #[error("vault root does not exist: {0}")]
    MissingRoot(String),

    #[error("vault root is not a directory: {0}")]
    NotADirectory(String),

    #[error("failed to read directory {0}: {1}")]
    ReadDir(String, #[source] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// A filesystem node seen in one directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultEntry {
    pub absolute_path: PathBuf,
    pub kind: EntryKind,
    pub name: String,
}

impl VaultEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Check that `root` is an existing directory and return its canonical form.
pub fn validate_root(root: &Path) -> Result<PathBuf, VaultWalkerError> {
    if !root.exists() {
        return Err(VaultWalkerError::MissingRoot(root.display().to_string()));
    }
    if !root.is_dir() {
        return Err(VaultWalkerError::NotADirectory(root.display().to_string()));
    }
    root.canonicalize().map_err(|_| VaultWalkerError::MissingRoot(root.display().to_string()))
}

/// List the entries of one directory: files first, then directories, each
/// group sorted by name. Symlinks and entries whose type cannot be read are
/// left out.
pub fn list_entries(dir: &Path) -> Result<Vec<VaultEntry>, VaultWalkerError> {
    let read = fs::read_dir(dir)
        .map_err(|e| VaultWalkerError::ReadDir(dir.display().to_string(), e))?;

    let mut entries = Vec::new();
    for entry in read {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let kind = if file_type.is_symlink() {
            continue;
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        entries.push(VaultEntry {
            absolute_path: entry.path(),
            kind,
            name: entry.file_name().to_string_lossy().into_owned(),
        });
    }

    entries.sort_by(|a, b| {
        (a.kind == EntryKind::Directory, &a.name).cmp(&(b.kind == EntryKind::Directory, &b.name))
    });
    Ok(entries)
}

/// A file found by [`VaultWalker::files`].
#[derive(Debug, Clone)]
pub struct WalkedFile {
    /// Absolute path to the file.
    pub absolute_path: PathBuf,
    /// Path relative to the walk root.
    pub relative_path: PathBuf,
}

/// Recursive file walker that prunes excluded and tool-state directories.
#[derive(Debug)]
pub struct VaultWalker<'a> {
    root: PathBuf,
    filter: &'a ExclusionFilter,
}

impl<'a> VaultWalker<'a> {
    pub fn new(root: &Path, filter: &'a ExclusionFilter) -> Self {
        Self { root: root.to_path_buf(), filter }
    }

    /// All non-excluded files under the root, in walk order.
    ///
    /// Unreadable subdirectories are logged and skipped.
    pub fn files(&self) -> Vec<WalkedFile> {
        let walk = WalkDir::new(&self.root).follow_links(false).sort_by_file_name();

        let mut files = Vec::new();
        for entry in walk.into_iter().filter_entry(|e| !self.is_excluded(e)) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("walk error under {}: {}", self.root.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            files.push(WalkedFile {
                absolute_path: path.to_path_buf(),
                relative_path: path.strip_prefix(&self.root).unwrap_or(path).to_path_buf(),
            });
        }
        files
    }

    fn is_excluded(&self, entry: &walkdir::DirEntry) -> bool {
        // Never filter the root directory (depth 0)
        if entry.depth() == 0 {
            return false;
        }
        let kind = if entry.file_type().is_dir() { EntryKind::Directory } else { EntryKind::File };
        let vault_entry = VaultEntry {
            absolute_path: entry.path().to_path_buf(),
            kind,
            name: entry.file_name().to_string_lossy().into_owned(),
        };
        self.filter.is_excluded(&vault_entry)
    }
}
