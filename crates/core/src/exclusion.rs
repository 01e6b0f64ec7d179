//! Deciding which vault entries take part in an export.
//!
//! Exclusion is evaluated per entry: a folder is skipped because of its own
//! name (or a deleted marker in a document's header), never because some
//! unrelated ancestor's name happens to contain a marker as a substring.

use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::config::ExportSettings;
use crate::frontmatter::{self, Frontmatter};
use crate::paths::same_file;
use crate::vault::{EntryKind, VaultEntry};

/// Extensions treated as markdown documents.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["md", "markdown"];

const IMAGE_EXTENSIONS: &[&str] =
    &["png", "jpg", "jpeg", "gif", "bmp", "svg", "webp", "tif", "tiff", "ico", "heic", "avif"];

const MEDIA_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "m4a", "ogg", "flac", "aac", "webm", "mp4", "mov", "mkv", "avi", "m4v", "3gp",
];

const OTHER_ATTACHMENT_EXTENSIONS: &[&str] = &[
    // office documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "odp", "rtf", "epub",
    // archives
    "zip", "tar", "gz", "tgz", "7z", "rar", "bz2", "xz",
    // structured data
    "json", "yaml", "yml", "toml", "xml", "csv", "tsv", "canvas", "excalidraw",
    // plain and source text
    "txt", "log", "html", "htm", "css", "js", "ts", "py", "rs", "go", "java", "c", "h", "cpp",
    "sh", "sql", "tex", "bib",
];

/// Editor and OS metadata that never belongs in an export.
const DENIED_FILE_NAMES: &[&str] = &[".ds_store", "thumbs.db", "desktop.ini"];
const DENIED_EXTENSIONS: &[&str] = &["tmp", "swp", "swo", "part", "crdownload"];

/// Directory names that never hold content (tool state, VCS metadata).
const IGNORED_DIR_NAMES: &[&str] = &["node_modules", "target", "__pycache__", "venv"];

/// Header values that mark a document as deleted.
const DELETED_STATUSES: &[&str] = &["deleted", "trashed", "trash"];

fn extension_of(path: &Path) -> Option<String> {
    path.extension().and_then(|e| e.to_str()).map(str::to_lowercase)
}

/// Whether `path` is a markdown document.
pub fn is_document(path: &Path) -> bool {
    extension_of(path).is_some_and(|e| DOCUMENT_EXTENSIONS.contains(&e.as_str()))
}

/// Whether `ext` (without the dot, any case) is an allow-listed attachment kind.
pub fn is_attachment_extension(ext: &str) -> bool {
    let ext = ext.to_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str())
        || MEDIA_EXTENSIONS.contains(&ext.as_str())
        || OTHER_ATTACHMENT_EXTENSIONS.contains(&ext.as_str())
}

/// Whether `ext` is a document or attachment extension this tool knows.
pub fn is_known_extension(ext: &str) -> bool {
    DOCUMENT_EXTENSIONS.contains(&ext.to_lowercase().as_str()) || is_attachment_extension(ext)
}

/// Whether `path` renders inline when embedded (images, audio, video).
pub fn is_embeddable_media(path: &Path) -> bool {
    extension_of(path).is_some_and(|e| {
        IMAGE_EXTENSIONS.contains(&e.as_str()) || MEDIA_EXTENSIONS.contains(&e.as_str())
    })
}

/// Whether a file should be copied into the export.
///
/// Documents and allow-listed attachment kinds are included. Unknown
/// extensions are included too, unless the file is editor or OS metadata.
pub fn should_include_file(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n.to_lowercase(),
        None => return false,
    };

    if DENIED_FILE_NAMES.contains(&name.as_str())
        || name.starts_with('.')
        || name.ends_with('~')
    {
        return false;
    }

    match extension_of(path) {
        Some(ext) if is_known_extension(&ext) => true,
        Some(ext) => !DENIED_EXTENSIONS.contains(&ext.as_str()),
        None => true,
    }
}

/// Whether a parsed header declares the document deleted or trashed.
pub fn declares_deleted(fm: &Frontmatter) -> bool {
    let flag = |key: &str| matches!(fm.get(key), Some(Value::Bool(true)));
    if flag("deleted") || flag("trashed") {
        return true;
    }
    fm.get_str("status")
        .is_some_and(|s| DELETED_STATUSES.contains(&s.trim().to_lowercase().as_str()))
}

/// Whether raw document content declares itself deleted.
pub fn content_declares_deleted(content: &str) -> bool {
    let (doc, _) = frontmatter::parse_recovering(content);
    doc.frontmatter.as_ref().is_some_and(declares_deleted)
}

/// Name-based exclusion rules for one export run.
#[derive(Debug, Clone)]
pub struct ExclusionFilter {
    markers: Vec<String>,
    extra_ignored_dirs: Vec<String>,
    attachment_dirs: Vec<String>,
    /// Files left out by path, such as the archive being written.
    skipped_files: Vec<PathBuf>,
}

impl Default for ExclusionFilter {
    fn default() -> Self {
        Self::new(&ExportSettings::default())
    }
}

impl ExclusionFilter {
    pub fn new(settings: &ExportSettings) -> Self {
        let lower =
            |items: &[String]| -> Vec<String> { items.iter().map(|s| s.to_lowercase()).collect() };
        Self {
            markers: lower(&settings.exclusion_markers),
            extra_ignored_dirs: lower(&settings.extra_ignored_dirs),
            attachment_dirs: lower(&settings.attachment_folders),
            skipped_files: Vec::new(),
        }
    }

    /// Whether an entry is excluded by its own name.
    pub fn is_excluded(&self, entry: &VaultEntry) -> bool {
        match entry.kind {
            EntryKind::Directory => {
                self.is_ignored_dir(&entry.name) || self.is_excluded_name(&entry.name)
            }
            EntryKind::File => {
                self.is_excluded_name(&entry.name) || self.is_skipped_file(&entry.absolute_path)
            }
        }
    }

    /// Leave the file at `path` out regardless of its name.
    pub fn skip_file(&mut self, path: &Path) {
        self.skipped_files.push(path.to_path_buf());
    }

    pub fn is_skipped_file(&self, path: &Path) -> bool {
        self.skipped_files.iter().any(|skipped| same_file(skipped, path))
    }

    /// Whether a file or folder name carries a deletion marker.
    ///
    /// Matches the bare token, `_token`/`.token`, `token_*` and `*_token`,
    /// case-insensitively, against both the full name and the name without
    /// its extension.
    pub fn is_excluded_name(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        let stem = Path::new(&lower)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&lower)
            .to_string();

        self.markers.iter().any(|token| {
            [lower.as_str(), stem.as_str()].iter().any(|candidate| {
                *candidate == token.as_str()
                    || candidate.strip_prefix(['_', '.']) == Some(token.as_str())
                    || candidate.starts_with(&format!("{token}_"))
                    || candidate.ends_with(&format!("_{token}"))
            })
        })
    }

    /// Whether a directory is tool state rather than content.
    pub fn is_ignored_dir(&self, name: &str) -> bool {
        if name.starts_with('.') {
            return true;
        }
        let lower = name.to_lowercase();
        IGNORED_DIR_NAMES.contains(&lower.as_str()) || self.extra_ignored_dirs.contains(&lower)
    }

    /// Whether a directory name marks an attachment store.
    pub fn is_attachments_dir(&self, name: &str) -> bool {
        self.attachment_dirs.contains(&name.to_lowercase())
    }
}
