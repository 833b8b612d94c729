//! Messages exchanged between the panel and the mediator.
//!
//! Both directions are plain owned values tagged on `type`, so they can be
//! moved across a channel or serialized to JSON for a host bridge without
//! either side holding a reference into the other's state.

use serde::{Deserialize, Serialize};

use crate::file::{AttachedFileRef, FileType};

/// Panel → mediator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PanelIntent {
    /// Submit a chat turn with the absolute paths of staged attachments.
    SendMessage {
        message: String,
        #[serde(default)]
        attached_files: Vec<String>,
    },
    /// Incremental file search.
    SearchFiles { query: String },
    /// Fetch a single file's resolved content.
    GetFileContent { file_path: String },
    /// Channel handshake.
    Ready,
}

/// Mediator → panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PanelEvent {
    TypingStart,
    TypingEnd,
    /// Assistant reply; `timestamp` is RFC 3339.
    AiResponse { message: String, timestamp: String },
    FilesFound { files: Vec<AttachedFileRef> },
    /// `content` is empty when the file could not be resolved.
    FileContent {
        file_path: String,
        content: String,
        file_type: FileType,
    },
    /// User-visible failure.
    Error { message: String },
    /// Handshake acknowledgement.
    Initialized,
}

impl PanelIntent {
    pub fn kind(&self) -> &'static str {
        match self {
            PanelIntent::SendMessage { .. } => "sendMessage",
            PanelIntent::SearchFiles { .. } => "searchFiles",
            PanelIntent::GetFileContent { .. } => "getFileContent",
            PanelIntent::Ready => "ready",
        }
    }
}

impl PanelEvent {
    pub fn error(message: impl Into<String>) -> Self {
        PanelEvent::Error {
            message: message.into(),
        }
    }
}
