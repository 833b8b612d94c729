//! External chat API clients.

pub mod error_classification;
pub mod openai_api_client;

pub use error_classification::classify_api_error;
pub use openai_api_client::{EMPTY_COMPLETION_REPLY, OpenAIChatClient};
