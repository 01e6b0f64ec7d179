//! Resolving wiki-links, embeds and markdown links to files in the vault.

pub mod rewrite;
pub mod search;
pub mod strategies;

use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::exclusion::{self, ExclusionFilter};
use crate::paths::{normalize_lexically, relative_slash_path, sanitize_path};
use crate::vault::WalkedFile;

pub use rewrite::RewriteOutcome;
pub use search::{Scope, SearchContext};
pub use strategies::{STRATEGIES, Strategy};

/// Outcome of resolving one reference occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    /// Reference text as written, before any alias.
    pub original_text: String,
    pub target_path: Option<PathBuf>,
    pub found: bool,
}

/// Reference resolver for one export root and one run.
pub struct Resolver {
    export_root: PathBuf,
    filter: ExclusionFilter,
    index: OnceCell<Vec<WalkedFile>>,
    memo: HashMap<(PathBuf, String), Option<PathBuf>>,
    unavailable: RefCell<HashMap<PathBuf, bool>>,
}

impl Resolver {
    pub fn new(export_root: &Path, filter: ExclusionFilter) -> Self {
        Self {
            export_root: export_root.to_path_buf(),
            filter,
            index: OnceCell::new(),
            memo: HashMap::new(),
            unavailable: RefCell::new(HashMap::new()),
        }
    }

    /// Resolve `reference` as written in a document living in `document_dir`.
    ///
    /// Any alias, `#section` or `^block` suffix is ignored for the lookup.
    pub fn resolve(&mut self, document_dir: &Path, reference: &str) -> ResolvedReference {
        let original_text = split_alias(reference).0.trim().to_string();
        let candidate = match lookup_key(reference) {
            Some(key) => candidate_file_name(&key),
            None => {
                return ResolvedReference { original_text, target_path: None, found: false };
            }
        };

        let memo_key = (document_dir.to_path_buf(), candidate.clone());
        let target_path = match self.memo.get(&memo_key).cloned() {
            Some(hit) => hit,
            None => {
                let found = self.run_strategies(document_dir, &candidate);
                self.memo.insert(memo_key, found.clone());
                found
            }
        };

        ResolvedReference { original_text, found: target_path.is_some(), target_path }
    }

    fn run_strategies(&self, document_dir: &Path, candidate: &str) -> Option<PathBuf> {
        let accept = |path: &Path| self.accepts(path);
        let ctx = SearchContext {
            export_root: &self.export_root,
            document_dir,
            candidate,
            filter: &self.filter,
            index: &self.index,
            accept: &accept,
        };

        STRATEGIES.iter().find_map(|(name, strategy)| {
            let hit = strategy(&ctx)?;
            tracing::debug!("resolved '{}' via {} to {}", candidate, name, hit.display());
            Some(hit)
        })
    }

    /// Link target emitted for a resolved (or unresolved) reference.
    ///
    /// Found references point at the sanitized export-relative path. Missing
    /// ones get the sanitized path the file would have next to the document,
    /// or the sanitized reference text when that lands outside the root.
    pub fn link_target(&self, document_dir: &Path, reference: &ResolvedReference) -> String {
        if let Some(target) = &reference.target_path
            && let Some(rel) = relative_slash_path(target, &self.export_root)
        {
            return sanitize_path(&rel);
        }

        let Some(key) = lookup_key(&reference.original_text) else {
            return sanitize_path(&reference.original_text);
        };
        let guess = normalize_lexically(&document_dir.join(candidate_file_name(&key)));
        match relative_slash_path(&guess, &self.export_root) {
            Some(rel) if !rel.is_empty() => sanitize_path(&rel),
            _ => sanitize_path(&key),
        }
    }

    /// Whether `path` is a file that the export will emit.
    pub fn accepts(&self, path: &Path) -> bool {
        let Ok(rel) = path.strip_prefix(&self.export_root) else {
            return false;
        };
        if !path.is_file()
            || !exclusion::should_include_file(path)
            || self.filter.is_skipped_file(path)
        {
            return false;
        }

        let mut names = rel.iter().map(|s| s.to_string_lossy());
        let Some(file_name) = names.next_back() else {
            return false;
        };
        if self.filter.is_excluded_name(&file_name) {
            return false;
        }
        if names.any(|dir| self.filter.is_ignored_dir(&dir) || self.filter.is_excluded_name(&dir)) {
            return false;
        }

        !(exclusion::is_document(path) && self.is_unavailable(path))
    }

    /// Documents that declare themselves deleted or cannot be read.
    fn is_unavailable(&self, path: &Path) -> bool {
        if let Some(&known) = self.unavailable.borrow().get(path) {
            return known;
        }
        let unavailable = match fs::read(path) {
            Ok(bytes) => exclusion::content_declares_deleted(&String::from_utf8_lossy(&bytes)),
            Err(_) => true,
        };
        self.unavailable.borrow_mut().insert(path.to_path_buf(), unavailable);
        unavailable
    }
}

/// Split `target|alias`. Inside table cells the pipe is written `\|`; the
/// backslash belongs to neither side.
pub fn split_alias(reference: &str) -> (&str, Option<&str>) {
    match reference.split_once('|') {
        Some((target, alias)) => (target.strip_suffix('\\').unwrap_or(target), Some(alias)),
        None => (reference, None),
    }
}

/// Lookup key of a reference: the text before any `|`, without `#section`
/// or `^block` suffixes or a leading `/`. `None` for self-references like
/// `[[#Heading]]`.
pub fn lookup_key(reference: &str) -> Option<String> {
    let (before_alias, _) = split_alias(reference);
    let without_suffix = before_alias.split(['#', '^']).next().unwrap_or_default();
    let key = without_suffix.trim().trim_start_matches('/').trim();
    if key.is_empty() { None } else { Some(repair_suffix(key)) }
}

/// Undo a document extension appended after an attachment extension, so
/// `chart.png.md` is looked up as `chart.png`.
///
/// This is a heuristic: a file really named `notes.pdf.md` is looked up as
/// the PDF.
pub fn repair_suffix(key: &str) -> String {
    let path = Path::new(key);
    let is_document = exclusion::is_document(path);
    let inner_ext = path
        .file_stem()
        .map(Path::new)
        .and_then(|stem| stem.extension())
        .and_then(|e| e.to_str());

    match inner_ext {
        Some(ext) if is_document && exclusion::is_attachment_extension(ext) => {
            let cut = key.rfind('.').unwrap_or(key.len());
            key[..cut].to_string()
        }
        _ => key.to_string(),
    }
}

/// File name to look for: the key itself when it carries a known
/// extension, otherwise the key plus `.md`.
pub fn candidate_file_name(key: &str) -> String {
    let known = Path::new(key)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(exclusion::is_known_extension);
    if known { key.to_string() } else { format!("{key}.md") }
}

/// Default display text for a reference: the last path segment, minus a
/// known extension.
pub fn display_name(key: &str) -> String {
    let last = key.rsplit(['/', '\\']).next().unwrap_or(key);
    let path = Path::new(last);
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if exclusion::is_known_extension(ext) => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| last.to_string()),
        _ => last.to_string(),
    }
}
