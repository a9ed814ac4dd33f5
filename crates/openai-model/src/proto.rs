use serde::{Deserialize, Serialize};
use taskloom_model::CompletionRequest;

use crate::OpenAIConfig;

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ChatCompletion {
    pub choices: Vec<MessageChoice>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MessageChoice {
    pub message: Option<ChatMessage>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ChatMessage {
    pub content: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ChatCompletionChunk {
    pub choices: Vec<DeltaChoice>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DeltaChoice {
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Delta {
    pub content: Option<String>,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    User { content: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_request(
    req: &CompletionRequest,
    config: &OpenAIConfig,
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: config.model.clone(),
        messages: vec![Message::User {
            content: req.prompt.clone(),
        }],
        temperature: req.temperature,
        max_tokens: req.max_tokens,
        stream: req.stream,
    }
}
