//! File reference and content models.

use serde::{Deserialize, Serialize};

/// Whether a reference points at a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Directory,
}

/// A workspace file staged (or stageable) as chat context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedFileRef {
    /// File name without directories.
    pub name: String,
    /// Absolute path on disk.
    pub path: String,
    /// Path relative to the workspace root it was found under.
    pub relative_path: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
}

/// How a file's content is delivered to the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Decoded content is sent verbatim.
    #[default]
    Text,
    /// Only a placeholder is sent.
    Binary,
    /// Only a placeholder is sent.
    Image,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Text => "text",
            FileType::Binary => "binary",
            FileType::Image => "image",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, FileType::Text)
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved content of a file: full text, or a placeholder for non-text files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    pub content: String,
    pub file_type: FileType,
}

impl FileContent {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            file_type: FileType::Text,
        }
    }
}

/// A [`FileContent`] paired with the path it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub path: String,
    pub content: FileContent,
}

impl ResolvedFile {
    pub fn new(path: impl Into<String>, content: FileContent) -> Self {
        Self {
            path: path.into(),
            content,
        }
    }
}
