//! Frontmatter parsing, merging, and serialization.
//!
//! This module provides functionality to:
//! - Parse YAML frontmatter from markdown documents
//! - Merge computed structural fields (`type`, `set`, `tags`) into it
//! - Serialize documents back to markdown with frontmatter

pub mod merge;
pub mod parser;
pub mod serializer;
pub mod types;

pub use merge::{SET_KEY, TAGS_KEY, TYPE_KEY, merge_metadata};
pub use parser::{FrontmatterParseError, parse, parse_lenient, parse_recovering};
pub use serializer::{frontmatter_to_yaml, serialize};
pub use types::{Frontmatter, ParsedDocument};
