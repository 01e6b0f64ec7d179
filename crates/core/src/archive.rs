//! Archive output.
//!
//! The converter only ever appends named entries and finishes once, so the
//! sink is a two-method trait. [`ZipSink`] writes a real archive and
//! [`MemorySink`] keeps everything in memory.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to create archive {0}: {1}")]
    Create(String, #[source] std::io::Error),

    #[error("failed to write archive entry {0}: {1}")]
    Write(String, #[source] std::io::Error),

    #[error("zip error on entry {0}: {1}")]
    Zip(String, #[source] zip::result::ZipError),

    #[error("archive already finished")]
    Finished,
}

/// Destination for archive entries.
pub trait ArchiveSink {
    /// Append an entry named `name` holding `bytes`.
    fn append(&mut self, name: &str, bytes: &[u8]) -> Result<(), ArchiveError>;

    /// Finalize the archive and report its total size in bytes.
    fn finish(&mut self) -> Result<u64, ArchiveError>;
}

/// Zip archive on disk, deflated at maximum compression.
///
/// Entry timestamps are pinned to the zip epoch so the same input always
/// produces the same bytes.
pub struct ZipSink {
    path: PathBuf,
    writer: Option<ZipWriter<File>>,
    options: SimpleFileOptions,
}

impl ZipSink {
    pub fn create(path: &Path) -> Result<Self, ArchiveError> {
        let file =
            File::create(path).map_err(|e| ArchiveError::Create(path.display().to_string(), e))?;
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(9))
            .last_modified_time(DateTime::default());
        Ok(Self { path: path.to_path_buf(), writer: Some(ZipWriter::new(file)), options })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ArchiveSink for ZipSink {
    fn append(&mut self, name: &str, bytes: &[u8]) -> Result<(), ArchiveError> {
        let writer = self.writer.as_mut().ok_or(ArchiveError::Finished)?;
        writer
            .start_file(name, self.options)
            .map_err(|e| ArchiveError::Zip(name.to_string(), e))?;
        writer.write_all(bytes).map_err(|e| ArchiveError::Write(name.to_string(), e))
    }

    fn finish(&mut self) -> Result<u64, ArchiveError> {
        let writer = self.writer.take().ok_or(ArchiveError::Finished)?;
        let file = writer
            .finish()
            .map_err(|e| ArchiveError::Zip(self.path.display().to_string(), e))?;
        let size = file
            .metadata()
            .map_err(|e| ArchiveError::Write(self.path.display().to_string(), e))?
            .len();
        tracing::debug!("finished archive {} ({} bytes)", self.path.display(), size);
        Ok(size)
    }
}

/// In-memory sink that records entries in append order.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub entries: Vec<(String, Vec<u8>)>,
    finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, b)| b.as_slice())
    }

    /// Entry contents as text, for documents.
    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name).map(|b| String::from_utf8_lossy(b).into_owned())
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }
}

impl ArchiveSink for MemorySink {
    fn append(&mut self, name: &str, bytes: &[u8]) -> Result<(), ArchiveError> {
        if self.finished {
            return Err(ArchiveError::Finished);
        }
        self.entries.push((name.to_string(), bytes.to_vec()));
        Ok(())
    }

    fn finish(&mut self) -> Result<u64, ArchiveError> {
        if self.finished {
            return Err(ArchiveError::Finished);
        }
        self.finished = true;
        Ok(self.entries.iter().map(|(_, b)| b.len() as u64).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn test_zip_sink_writes_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.zip");

        let mut sink = ZipSink::create(&path).unwrap();
        sink.append("Index.md", b"# Index\n").unwrap();
        sink.append("Notes/a_b.md", b"body").unwrap();
        let size = sink.finish().unwrap();
        assert_eq!(size, std::fs::metadata(&path).unwrap().len());

        let mut archive = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        let mut content = String::new();
        archive.by_name("Notes/a_b.md").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "body");
    }

    #[test]
    fn test_zip_output_is_reproducible() {
        let dir = TempDir::new().unwrap();
        let write = |name: &str| {
            let path = dir.path().join(name);
            let mut sink = ZipSink::create(&path).unwrap();
            sink.append("a.md", b"same").unwrap();
            sink.finish().unwrap();
            std::fs::read(path).unwrap()
        };
        assert_eq!(write("one.zip"), write("two.zip"));
    }

    #[test]
    fn test_append_after_finish_fails() {
        let mut sink = MemorySink::new();
        sink.append("a", b"1").unwrap();
        assert_eq!(sink.finish().unwrap(), 1);
        assert!(matches!(sink.append("b", b"2"), Err(ArchiveError::Finished)));
    }
}
