use serde::Serialize;

/// A reference that could not be matched to an exported file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedReference {
    /// Archive entry name of the document holding the reference.
    pub document: String,
    /// Reference text as written, without alias.
    pub reference: String,
}

/// What one export run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    /// Root containers that made it into the export.
    pub containers: usize,
    pub documents: usize,
    pub attachments: usize,
    pub placeholders: usize,
    /// Files and folders left out by name, type or declared status.
    pub excluded: usize,
    /// Entries that failed to read or clashed with an earlier entry name.
    pub skipped: usize,
    pub unresolved: Vec<UnresolvedReference>,
    /// Archive entry name of the top-level index.
    pub index_path: String,
    pub archive_bytes: u64,
}

impl ConversionReport {
    /// Entries written to the archive, index included.
    pub fn entries_written(&self) -> usize {
        let index = usize::from(!self.index_path.is_empty());
        self.documents + self.attachments + self.placeholders + index
    }
}
