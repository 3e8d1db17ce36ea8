//! Converts between `jrdev_llm`'s generic request and the OpenAI Chat
//! Completions wire format.

use jrdev_llm::request::{GenerateRequest, Role};

use crate::types::{ChatCompletionRequest, ChatMessage, ResponseFormat, StreamOptions};

pub fn to_chat_completion_request(model_id: &str, req: &GenerateRequest) -> ChatCompletionRequest {
    let messages = req
        .messages
        .iter()
        .map(|m| ChatMessage {
            role: match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: m.content.clone(),
        })
        .collect();

    let response_format = req.options.json_output.then_some(ResponseFormat::JsonObject);

    let extra = req
        .extras
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    ChatCompletionRequest {
        model: model_id.to_string(),
        messages,
        stream: true,
        stream_options: StreamOptions {
            include_usage: true,
        },
        temperature: req.options.temperature,
        max_completion_tokens: req.options.max_tokens,
        response_format,
        extra,
    }
}
