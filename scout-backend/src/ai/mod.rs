pub mod models;
pub mod openai;
pub mod prompts;

pub use openai::OpenAIClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// One completion request against a hosted model
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
    /// Overrides the client's configured limit
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }
}

/// A hosted chat-completions model
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate_text(&self, request: CompletionRequest) -> Result<String, String>;
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use parking_lot::Mutex;

    /// Returns canned replies and records every request it receives
    pub struct FakeChatModel {
        reply: Result<String, String>,
        pub requests: Mutex<Vec<CompletionRequest>>,
    }

    impl FakeChatModel {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(error: &str) -> Self {
            Self {
                reply: Err(error.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for FakeChatModel {
        async fn generate_text(&self, request: CompletionRequest) -> Result<String, String> {
            self.requests.lock().push(request);
            self.reply.clone()
        }
    }
}
