//! Converts between `jrdev_llm`'s generic request and the Anthropic
//! Messages API wire format.
//!
//! The Messages API takes the system prompt out-of-band from the message
//! list (spec.md §4.4), unlike the Chat Completions shape's `system` role.

use jrdev_llm::request::{GenerateRequest, Role};

use crate::types::{AnthropicMessage, MessagesRequest};

const DEFAULT_MAX_TOKENS: u32 = 4096;

pub fn to_messages_request(model_id: &str, req: &GenerateRequest) -> MessagesRequest {
    let mut system = Vec::new();
    let mut messages = Vec::new();

    for m in &req.messages {
        match m.role {
            Role::System => system.push(m.content.clone()),
            Role::User => messages.push(AnthropicMessage {
                role: "user",
                content: m.content.clone(),
            }),
            Role::Assistant => messages.push(AnthropicMessage {
                role: "assistant",
                content: m.content.clone(),
            }),
        }
    }

    let extra = req
        .extras
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    MessagesRequest {
        model: model_id.to_string(),
        messages,
        max_tokens: req.options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        stream: true,
        system: (!system.is_empty()).then(|| system.join("\n")),
        temperature: req.options.temperature,
        extra,
    }
}
