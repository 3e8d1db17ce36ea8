use serde::{Deserialize, Serialize};

/// An event emitted during streaming generation (spec.md §4.4/§4.5).
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A chunk of text output, as it arrives from the wire.
    TextDelta(String),

    /// First chunk arrived; carries the input token estimate for UI progress.
    InputTokenEstimate { tokens: u32 },

    /// Periodic progress update (every N chunks), with live token/sec.
    Progress {
        output_token_estimate: u32,
        tokens_per_second: f64,
    },

    /// Generation is complete.
    Finish {
        reason: FinishReason,
        usage: Option<Usage>,
    },

    /// An error occurred mid-stream.
    Error(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Other(String),
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}
