//! Provider-agnostic LLM transport: request/response types, the
//! `LanguageModel`/`LanguageModelProvider` traits, retry and `<think>`-tag
//! filter middleware, and a process-wide token usage tracker.

pub mod error;
pub mod middleware;
pub mod model;
pub mod provider;
pub mod request;
pub mod response;
pub mod stream;
pub mod usage;

pub use error::Error;
pub use middleware::{filter_think_tags, generate_llm_response, retry, stream_request};
pub use model::{LanguageModel, LanguageModelBackend};
pub use provider::{LanguageModelProvider, LanguageModelProviderBackend};
pub use request::{GenerateOptions, GenerateRequest, Message, Role};
pub use response::{GenerateResult, Response};
pub use stream::{FinishReason, StreamEvent, Usage};
pub use usage::UsageTracker;
