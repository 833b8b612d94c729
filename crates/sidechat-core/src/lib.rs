pub mod chat;
pub mod config;
pub mod error;
pub mod file;
pub mod protocol;
pub mod session;

// Re-export common error types
pub use error::{ChatError, SidechatError};
