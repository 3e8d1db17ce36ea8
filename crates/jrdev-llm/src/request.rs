use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Role / Message — a closed sum type, per spec.md §9's remediation list
// ---------------------------------------------------------------------------

/// The three roles a message in a conversation can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in a conversation.
///
/// Content is always plain text: JrDev's agents parse structured output
/// (JSON plans, file-change envelopes) out of text responses rather than
/// using function calling, so there is no tool-call part to carry here.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level request
// ---------------------------------------------------------------------------

/// Knobs that control generation behavior.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// `None` for reasoning variants that forbid the field (spec.md §4.4).
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// DeepSeek's `json_output` / OpenAI's `response_format: json_object`.
    pub json_output: bool,
}

impl Default for GenerateOptions {
    /// Non-reasoning models get `temperature=0.0` sent explicitly (spec.md
    /// §4.4); callers generating for an `is_think` model clear this back
    /// to `None` before the request goes out.
    fn default() -> Self {
        Self { temperature: Some(0.0), max_tokens: None, json_output: false }
    }
}

/// A request to generate a language model response.
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub messages: Vec<Message>,
    pub options: GenerateOptions,
    /// Provider-specific extras, passed through to the backend as-is.
    ///
    /// Per spec.md §9: quirks like Venice's `include_venice_system_prompt`
    /// are an explicit per-provider extras map, never hardcoded in the
    /// transport.
    pub extras: HashMap<String, serde_json::Value>,
}

impl GenerateRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            options: GenerateOptions::default(),
            extras: HashMap::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }
}

impl From<Vec<Message>> for GenerateRequest {
    fn from(messages: Vec<Message>) -> Self {
        Self::new(messages)
    }
}
