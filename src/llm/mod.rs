//! LLM provider abstraction and OpenAI-compatible HTTP implementation.

mod openai;
mod provider;
mod service;
mod types;

pub use openai::OpenAiCompatChat;
pub use provider::LlmProvider;
pub use service::LlmService;
pub use types::{ChatMessage, ChatRequest};
