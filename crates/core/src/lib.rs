#![allow(clippy::module_name_repetitions)]

pub mod archive;
pub mod config;
pub mod convert;
pub mod exclusion;
pub mod frontmatter;
pub mod hierarchy;
pub mod markdown_ast;
pub mod outline;
pub mod paths;
pub mod resolver;
pub mod tags;
pub mod vault;

pub use archive::{ArchiveError, ArchiveSink, MemorySink, ZipSink};
pub use convert::{ConversionReport, ConvertError, Converter, UnresolvedReference, convert_vault};
