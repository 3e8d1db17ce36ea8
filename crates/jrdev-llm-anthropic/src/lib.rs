mod convert;
mod stream;
mod types;

use jrdev_llm::request::GenerateRequest;
use jrdev_llm::response::Response;
use jrdev_llm::{LanguageModel, LanguageModelBackend, LanguageModelProvider, LanguageModelProviderBackend};
use std::collections::HashMap;
use std::sync::Arc;

/// Configuration for the Anthropic provider.
pub struct AnthropicConfig {
    pub api_key: String,
    pub base_url: String,
    pub extra_headers: HashMap<String, String>,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.anthropic.com".into(),
            extra_headers: HashMap::new(),
        }
    }
}

/// Create an Anthropic provider with the given config.
pub fn provider(config: AnthropicConfig) -> LanguageModelProvider {
    LanguageModelProvider::new(AnthropicProvider {
        state: Arc::new(ProviderState {
            client: reqwest::Client::new(),
            config,
        }),
    })
}

/// Create an Anthropic provider reading `ANTHROPIC_API_KEY` from the environment.
pub fn from_env() -> LanguageModelProvider {
    provider(AnthropicConfig {
        api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
        ..Default::default()
    })
}

struct ProviderState {
    client: reqwest::Client,
    config: AnthropicConfig,
}

struct AnthropicProvider {
    state: Arc<ProviderState>,
}

impl LanguageModelProviderBackend for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self, model_id: &str) -> LanguageModel {
        LanguageModel::new(AnthropicModel {
            model_id: model_id.to_string(),
            state: Arc::clone(&self.state),
        })
    }
}

struct AnthropicModel {
    model_id: String,
    state: Arc<ProviderState>,
}

impl LanguageModelBackend for AnthropicModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn provider(&self) -> &str {
        "anthropic"
    }

    fn generate(&self, request: GenerateRequest) -> Response {
        let body = convert::to_messages_request(&self.model_id, &request);
        let state = Arc::clone(&self.state);
        let event_stream = stream::open(state, body);
        Response::new(event_stream)
    }
}
