//! One export run: walk the vault, rewrite documents, write the archive.

mod report;

pub use report::{ConversionReport, UnresolvedReference};

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::archive::{ArchiveError, ArchiveSink};
use crate::config::ExportSettings;
use crate::exclusion::{self, ExclusionFilter};
use crate::frontmatter::{self, ParsedDocument};
use crate::hierarchy::{DirectoryRole, DocumentRole, HierarchyClassifier};
use crate::outline::{OutlineBuilder, OutlineLink, OutlineNode};
use crate::paths::{comparison_key, sanitize_path, sanitize_segment, sanitized_relative};
use crate::resolver::Resolver;
use crate::tags::extract_tags;
use crate::vault::{EntryKind, VaultEntry, VaultWalkerError, list_entries, validate_root};

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("export root does not exist: {0}")]
    MissingRoot(String),

    #[error("export root is not a directory: {0}")]
    NotADirectory(String),

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

impl From<VaultWalkerError> for ConvertError {
    fn from(e: VaultWalkerError) -> Self {
        match e {
            VaultWalkerError::NotADirectory(p) => ConvertError::NotADirectory(p),
            VaultWalkerError::MissingRoot(p) | VaultWalkerError::ReadDir(p, _) => {
                ConvertError::MissingRoot(p)
            }
        }
    }
}

/// Per-run bookkeeping that is not owned by a collaborator.
#[derive(Default)]
struct RunState {
    report: ConversionReport,
    /// Every entry name already written.
    emitted: HashSet<String>,
}

impl RunState {
    /// Claim `name` for the archive; `false` if an earlier entry has it.
    ///
    /// Zip entry names are case-sensitive, so `Plan.md` and `plan.md` are
    /// both kept.
    fn claim(&mut self, name: &str) -> bool {
        self.emitted.insert(name.to_string())
    }

    /// Whether a written entry equals `name` ignoring case.
    fn taken_ignoring_case(&self, name: &str) -> bool {
        let key = comparison_key(name);
        self.emitted.iter().any(|n| comparison_key(n) == key)
    }
}

/// Converter for one export root.
///
/// All caches (directory classification, reference resolution, deleted
/// status) live here and are dropped with the converter.
pub struct Converter {
    export_root: PathBuf,
    settings: ExportSettings,
    filter: ExclusionFilter,
    classifier: HierarchyClassifier,
    resolver: Resolver,
    outline: OutlineBuilder,
}

impl Converter {
    /// Prepare a run, failing if `export_root` is missing or not a directory.
    pub fn new(export_root: &Path, settings: ExportSettings) -> Result<Self, ConvertError> {
        let export_root = validate_root(export_root)?;
        let filter = ExclusionFilter::new(&settings);
        Ok(Self {
            classifier: HierarchyClassifier::new(filter.clone()),
            resolver: Resolver::new(&export_root, filter.clone()),
            outline: OutlineBuilder::new(settings.max_heading_level),
            export_root,
            settings,
            filter,
        })
    }

    /// Leave `output` out of the export, e.g. an archive written inside
    /// the vault.
    pub fn skip_output(mut self, output: &Path) -> Self {
        let output = fs::canonicalize(output).unwrap_or_else(|_| output.to_path_buf());
        self.filter.skip_file(&output);
        self.classifier = HierarchyClassifier::new(self.filter.clone());
        self.resolver = Resolver::new(&self.export_root, self.filter.clone());
        self
    }

    /// Convert the vault into `sink`.
    ///
    /// Per-entry failures are logged and counted; only archive failures end
    /// the run early.
    pub fn run(&mut self, sink: &mut dyn ArchiveSink) -> Result<ConversionReport, ConvertError> {
        tracing::info!("exporting {}", self.export_root.display());

        let mut state = RunState::default();
        let mut tree = OutlineNode::new(self.root_name(), DirectoryRole::ExportRoot);
        let root = self.export_root.clone();
        self.visit_dir(&root, &mut tree, &mut state, sink)?;

        self.write_placeholders(&mut tree, &mut state, sink)?;
        self.write_index(&tree, &mut state, sink)?;

        state.report.archive_bytes = sink.finish()?;

        let report = state.report;
        tracing::info!(
            "exported {} entries: {} containers, {} documents, {} attachments ({} unresolved references)",
            report.entries_written(),
            report.containers,
            report.documents,
            report.attachments,
            report.unresolved.len()
        );
        Ok(report)
    }

    fn root_name(&self) -> String {
        self.export_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn visit_dir(
        &mut self,
        dir: &Path,
        node: &mut OutlineNode,
        state: &mut RunState,
        sink: &mut dyn ArchiveSink,
    ) -> Result<(), ConvertError> {
        let entries = match list_entries(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("{}", e);
                state.report.skipped += 1;
                return Ok(());
            }
        };

        for entry in entries {
            if self.filter.is_excluded(&entry) {
                tracing::debug!("excluded {}", entry.absolute_path.display());
                state.report.excluded += 1;
                continue;
            }

            match entry.kind {
                EntryKind::File => self.visit_file(&entry, node, state, sink)?,
                EntryKind::Directory => {
                    let descriptor =
                        self.classifier.classify_dir(&entry.absolute_path, &self.export_root).clone();
                    if descriptor.excluded {
                        state.report.excluded += 1;
                        continue;
                    }
                    if descriptor.is_root_container {
                        state.report.containers += 1;
                    }

                    let mut child = OutlineNode::new(descriptor.name, descriptor.role);
                    self.visit_dir(&entry.absolute_path, &mut child, state, sink)?;
                    node.children.push(child);
                }
            }
        }
        Ok(())
    }

    fn visit_file(
        &mut self,
        entry: &VaultEntry,
        node: &mut OutlineNode,
        state: &mut RunState,
        sink: &mut dyn ArchiveSink,
    ) -> Result<(), ConvertError> {
        let path = &entry.absolute_path;
        if !exclusion::should_include_file(path) {
            tracing::debug!("excluded by type {}", path.display());
            state.report.excluded += 1;
            return Ok(());
        }
        let Some(name) = sanitized_relative(path, &self.export_root) else {
            state.report.skipped += 1;
            return Ok(());
        };

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("skipping unreadable file {}: {}", path.display(), e);
                state.report.skipped += 1;
                return Ok(());
            }
        };

        if !exclusion::is_document(path) {
            if !state.claim(&name) {
                tracing::warn!("skipping {}: archive entry {} already written", path.display(), name);
                state.report.skipped += 1;
                return Ok(());
            }
            sink.append(&name, &bytes)?;
            tracing::debug!("copied {}", name);
            state.report.attachments += 1;
            return Ok(());
        }

        let doc = frontmatter::parse_lenient(&String::from_utf8_lossy(&bytes));
        if doc.frontmatter.as_ref().is_some_and(exclusion::declares_deleted) {
            tracing::debug!("excluded deleted document {}", path.display());
            state.report.excluded += 1;
            return Ok(());
        }
        if !state.claim(&name) {
            tracing::warn!("skipping {}: archive entry {} already written", path.display(), name);
            state.report.skipped += 1;
            return Ok(());
        }

        let text = self.convert_document(path, &name, doc, state);
        sink.append(&name, text.as_bytes())?;
        tracing::debug!("wrote {}", name);

        state.report.documents += 1;
        node.documents.push(OutlineLink { title: file_title(path), target: name });
        Ok(())
    }

    /// Rewrite references, then merge role, container and tags into the header.
    fn convert_document(
        &mut self,
        path: &Path,
        name: &str,
        mut doc: ParsedDocument,
        state: &mut RunState,
    ) -> String {
        let document_dir = path.parent().unwrap_or(&self.export_root);
        let placement = self.classifier.place_document(path, &self.export_root);
        let tags = extract_tags(&doc.body);

        let outcome = self.resolver.rewrite(document_dir, &doc.body);
        for reference in outcome.unresolved() {
            tracing::warn!("{}: unresolved reference '{}'", name, reference.original_text);
            state.report.unresolved.push(UnresolvedReference {
                document: name.to_string(),
                reference: reference.original_text.clone(),
            });
        }
        doc.body = outcome.body;

        let merged = frontmatter::merge_metadata(
            doc,
            placement.role,
            placement.owning_container.as_deref(),
            &tags,
        );
        frontmatter::serialize(&merged)
    }

    /// Give every root container without documents a placeholder leaf.
    fn write_placeholders(
        &self,
        tree: &mut OutlineNode,
        state: &mut RunState,
        sink: &mut dyn ArchiveSink,
    ) -> Result<(), ConvertError> {
        for container in &mut tree.children {
            if container.role != DirectoryRole::RootContainer || container.has_documents() {
                continue;
            }

            let segment = sanitize_segment(&container.name);
            let name = format!("{segment}/{segment}.md");
            if !state.claim(&name) {
                tracing::warn!("placeholder {} clashes with an existing entry", name);
                continue;
            }

            let doc = ParsedDocument { frontmatter: None, body: format!("# {}\n", container.name) };
            let merged = frontmatter::merge_metadata(
                doc,
                DocumentRole::SetLeaf,
                Some(&container.name),
                &BTreeSet::new(),
            );
            sink.append(&name, frontmatter::serialize(&merged).as_bytes())?;
            tracing::debug!("wrote placeholder {}", name);

            state.report.placeholders += 1;
            container.documents.push(OutlineLink { title: container.name.clone(), target: name });
        }
        Ok(())
    }

    fn write_index(
        &self,
        tree: &OutlineNode,
        state: &mut RunState,
        sink: &mut dyn ArchiveSink,
    ) -> Result<(), ConvertError> {
        let name = self.index_name(state);
        let body = self.outline.top_level_index(
            &self.settings.index_title,
            &tree.documents,
            &tree.children,
        );
        let doc = ParsedDocument { frontmatter: None, body };
        let merged = frontmatter::merge_metadata(doc, DocumentRole::Page, None, &BTreeSet::new());
        sink.append(&name, frontmatter::serialize(&merged).as_bytes())?;
        tracing::debug!("wrote index {}", name);

        state.report.index_path = name;
        Ok(())
    }

    /// Configured index name, suffixed `_1`, `_2`, ... until it is free.
    fn index_name(&self, state: &mut RunState) -> String {
        let configured = sanitize_path(&self.settings.index_name);
        let path = Path::new(&configured);
        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let ext = path.extension().map(|e| format!(".{}", e.to_string_lossy())).unwrap_or_default();

        let mut candidate = configured.clone();
        let mut n = 1;
        while state.taken_ignoring_case(&candidate) {
            candidate = format!("{stem}_{n}{ext}");
            n += 1;
        }
        state.claim(&candidate);
        candidate
    }
}

/// Link title for a document: its file name without the extension.
fn file_title(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Convert the vault at `export_root` into `sink` with `settings`.
pub fn convert_vault(
    export_root: &Path,
    settings: ExportSettings,
    sink: &mut dyn ArchiveSink,
) -> Result<ConversionReport, ConvertError> {
    Converter::new(export_root, settings)?.run(sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemorySink;
    use tempfile::TempDir;

    #[test]
    fn test_missing_root_fails_before_output() {
        let result = Converter::new(Path::new("/nonexistent/vault"), ExportSettings::default());
        assert!(matches!(result, Err(ConvertError::MissingRoot(_))));
    }

    #[test]
    fn test_file_root_is_not_a_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("note.md");
        fs::write(&file, "x").unwrap();
        let result = Converter::new(&file, ExportSettings::default());
        assert!(matches!(result, Err(ConvertError::NotADirectory(_))));
    }

    #[test]
    fn test_index_name_avoids_collision() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.md"), "# Mine").unwrap();

        let mut sink = MemorySink::new();
        let report = convert_vault(dir.path(), ExportSettings::default(), &mut sink).unwrap();
        assert_eq!(report.index_path, "Index_1.md");
        assert!(sink.text("index.md").unwrap().contains("# Mine"));
        assert!(sink.text("Index_1.md").unwrap().contains("- [index](index.md)"));
    }

    #[test]
    fn test_sanitized_duplicates_keep_first() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a b.md"), "first").unwrap();
        fs::write(dir.path().join("a_b.md"), "second").unwrap();

        let mut sink = MemorySink::new();
        let report = convert_vault(dir.path(), ExportSettings::default(), &mut sink).unwrap();
        assert_eq!(report.documents, 1);
        assert_eq!(report.skipped, 1);
        assert!(sink.text("a_b.md").unwrap().ends_with("first"));
    }

    #[test]
    fn test_custom_index_settings() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("n.md"), "x").unwrap();
        let settings = ExportSettings {
            index_name: "Start Here.md".to_string(),
            index_title: "Home".to_string(),
            ..ExportSettings::default()
        };

        let mut sink = MemorySink::new();
        let report = convert_vault(dir.path(), settings, &mut sink).unwrap();
        assert_eq!(report.index_path, "Start_Here.md");
        assert_eq!(
            sink.text("Start_Here.md").unwrap(),
            "---\ntype: Page\n---\n# Home\n\n- [n](n.md)\n"
        );
    }

    #[test]
    fn test_case_variants_are_both_written() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("Notes")).unwrap();
        fs::write(dir.path().join("Notes/Plan.md"), "upper").unwrap();
        fs::write(dir.path().join("Notes/plan.md"), "lower").unwrap();
        fs::write(dir.path().join("Notes/x.md"), "[[plan]] [[Plan]]").unwrap();

        let mut sink = MemorySink::new();
        let report = convert_vault(dir.path(), ExportSettings::default(), &mut sink).unwrap();
        assert_eq!(report.documents, 3);
        assert_eq!(report.skipped, 0);
        assert!(sink.text("Notes/Plan.md").unwrap().ends_with("upper"));
        assert!(sink.text("Notes/plan.md").unwrap().ends_with("lower"));
        assert!(
            sink.text("Notes/x.md").unwrap().ends_with("[plan](Notes/plan.md) [Plan](Notes/Plan.md)")
        );
    }

    #[test]
    fn test_output_inside_vault_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "![[export.zip]]").unwrap();
        let output = dir.path().join("export.zip");
        fs::write(&output, "partial").unwrap();

        let mut sink = MemorySink::new();
        let report = Converter::new(dir.path(), ExportSettings::default())
            .unwrap()
            .skip_output(&output)
            .run(&mut sink)
            .unwrap();
        assert_eq!(report.attachments, 0);
        assert_eq!(report.excluded, 1);
        assert_eq!(sink.names(), vec!["a.md", "Index.md"]);
        assert_eq!(report.unresolved.len(), 1);
    }
}
