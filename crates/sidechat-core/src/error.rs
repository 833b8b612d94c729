//! Error types for the sidechat workspace.
//!
//! Two families live here:
//! - [`SidechatError`]: infrastructure failures (I/O, parsing, configuration).
//! - [`ChatError`]: the outcome taxonomy of a chat send, each variant carrying
//!   the user-facing wording shown in the panel's error banner.

use thiserror::Error;

/// A shared error type for the sidechat crates.
///
/// Provides typed, structured variants with automatic conversion from common
/// error types via `From`.
#[derive(Error, Debug, Clone)]
pub enum SidechatError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SidechatError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for SidechatError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            return Self::NotFound {
                entity_type: "file",
                id: err.to_string(),
            };
        }
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for SidechatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for SidechatError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, SidechatError>`.
pub type Result<T> = std::result::Result<T, SidechatError>;

/// Fallback wording when a failure carries no usable message.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to get AI response. Please try again.";

/// Failure of a chat send, classified for display.
///
/// `Display` yields the exact text the panel shows; it never contains the
/// API credential.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// No usable API credential. Reported before any network attempt.
    #[error("OpenAI API key not configured. Please set it in the sidechat settings.")]
    Configuration,

    /// The API rejected the credential.
    #[error("Invalid OpenAI API key. Please check your configuration.")]
    Auth,

    /// The account ran out of quota.
    #[error("OpenAI API quota exceeded. Please check your usage.")]
    Quota,

    /// Too many requests. Recoverable by resending later; no automatic retry.
    #[error("Rate limit exceeded. Please wait a moment and try again.")]
    RateLimit,

    /// A send was issued while another one is still pending.
    #[error("A response is still being generated. Please wait for it before sending again.")]
    Busy,

    /// Anything else: transport failures, unexpected API errors.
    #[error("{}", unknown_message(.0))]
    Unknown(String),
}

impl ChatError {
    /// Creates an Unknown error
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown(message.into())
    }

    /// The text to show the user.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

fn unknown_message(message: &str) -> &str {
    if message.trim().is_empty() {
        GENERIC_FAILURE_MESSAGE
    } else {
        message
    }
}
