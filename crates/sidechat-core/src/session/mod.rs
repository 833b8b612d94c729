//! Session domain module.
//!
//! # Module Structure
//!
//! - `message`: `MessageRole`, `ConversationTurn`, `Message`
//! - `conversation`: `ConversationSession` (bounded history + request composition)

mod conversation;
mod message;

pub use conversation::{
    ATTACHED_FILES_HEADER, ConversationSession, MAX_HISTORY_TURNS, RequestPayload, SYSTEM_PROMPT,
};
pub use message::{ConversationTurn, Message, MessageRole};
