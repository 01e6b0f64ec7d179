use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub export: ExportSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Knobs for a single export run.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExportSettings {
    /// File name of the top-level index document.
    pub index_name: String,
    /// Title rendered as the first heading of the index document.
    pub index_title: String,
    /// Deepest heading level the outline may use (markdown caps at 6).
    pub max_heading_level: u8,
    /// Folder names treated as attachment stores (case-insensitive).
    pub attachment_folders: Vec<String>,
    /// Name tokens that mark a file or folder as deleted (case-insensitive).
    pub exclusion_markers: Vec<String>,
    /// Additional folder names skipped entirely, on top of the built-in list.
    pub extra_ignored_dirs: Vec<String>,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            index_name: "Index.md".to_string(),
            index_title: "Vault Index".to_string(),
            max_heading_level: 6,
            attachment_folders: ["attachments", "attachment", "_attachments", "assets", "media", "files"]
                .into_iter()
                .map(String::from)
                .collect(),
            exclusion_markers: vec!["deleted".to_string(), "trash".to_string()],
            extra_ignored_dirs: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file_level: Option<String>,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), file_level: None, file: None }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    /// Config file the settings were read from, if any.
    pub source: Option<PathBuf>,
    pub export: ExportSettings,
    pub logging: LoggingConfig,
}
