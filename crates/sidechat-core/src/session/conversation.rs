use crate::chat::{ChatMessage, ChatRole};
use crate::file::ResolvedFile;

use super::message::ConversationTurn;

/// Upper bound on retained history turns (user and assistant each count as one).
pub const MAX_HISTORY_TURNS: usize = 20;

/// Fixed system instruction sent ahead of every conversation.
pub const SYSTEM_PROMPT: &str = "You are an AI assistant integrated into the user's code editor. \
Help the user with coding tasks, code review, explanations, and general development questions. \
When files are attached, use their content as context for your responses. \
Provide clear, concise, and actionable advice. \
Format code responses with proper syntax highlighting using markdown code blocks with language specification.";

pub const ATTACHED_FILES_HEADER: &str = "Attached files for context:";

/// Everything needed for one chat completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPayload {
    pub system: String,
    /// Snapshot of history at compose time, oldest first.
    pub history: Vec<ConversationTurn>,
    /// The user's message with the attached-files block appended.
    pub user_content: String,
}

impl RequestPayload {
    /// Flattens to `system, history..., user`.
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(ChatMessage::new(ChatRole::System, self.system.clone()));
        messages.extend(
            self.history
                .iter()
                .map(|turn| ChatMessage::new(turn.role.into(), turn.content.clone())),
        );
        messages.push(ChatMessage::new(ChatRole::User, self.user_content.clone()));
        messages
    }
}

/// Bounded conversation history for one panel.
///
/// The session is the only owner of history. It is handed explicitly to
/// whoever composes requests; there is no global instance.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    history: Vec<ConversationTurn>,
    max_turns: usize,
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationSession {
    pub fn new() -> Self {
        Self::with_max_turns(MAX_HISTORY_TURNS)
    }

    pub fn with_max_turns(max_turns: usize) -> Self {
        Self {
            history: Vec::new(),
            max_turns,
        }
    }

    /// Builds the outbound payload without touching history.
    pub fn compose(&self, user_message: &str, files: &[ResolvedFile]) -> RequestPayload {
        RequestPayload {
            system: SYSTEM_PROMPT.to_string(),
            history: self.history.clone(),
            user_content: compose_user_content(user_message, files),
        }
    }

    /// Appends a completed exchange, then drops the oldest turns beyond the bound.
    pub fn record(&mut self, user_message: &str, assistant_reply: &str) {
        self.history.push(ConversationTurn::user(user_message));
        self.history.push(ConversationTurn::assistant(assistant_reply));

        if self.history.len() > self.max_turns {
            let excess = self.history.len() - self.max_turns;
            self.history.drain(..excess);
        }
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

fn compose_user_content(user_message: &str, files: &[ResolvedFile]) -> String {
    let mut content = user_message.to_string();
    if files.is_empty() {
        return content;
    }

    content.push_str("\n\n");
    content.push_str(ATTACHED_FILES_HEADER);
    content.push('\n');

    for file in files {
        content.push_str(&format!("\n--- {} ---\n", file.path));
        if file.content.file_type.is_text() {
            content.push_str(&file.content.content);
        } else {
            content.push_str(&format!(
                "[{} FILE - Content not displayed]",
                file.content.file_type.as_str().to_uppercase()
            ));
        }
        content.push('\n');
    }

    content
}
