use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use jrdev_llm::LanguageModelProvider;

use crate::error::Error;
use crate::provider::{Provider, ProviderShape};

/// Enumerates providers and lazily holds one constructed transport client
/// per active provider, shared across workers (spec.md §4 concurrency
/// model, C5).
pub struct ProviderRegistry {
    providers: HashMap<String, Provider>,
    clients: Mutex<HashMap<String, Arc<LanguageModelProvider>>>,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self {
            providers: providers.into_iter().map(|p| (p.name.clone(), p)).collect(),
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn providers(&self) -> impl Iterator<Item = &Provider> {
        self.providers.values()
    }

    pub fn active_providers(&self) -> Vec<&Provider> {
        self.providers.values().filter(|p| p.is_active()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Provider> {
        self.providers.get(name)
    }

    /// Returns the shared client for `provider_name`, constructing it on
    /// first use. Fails if the provider is unknown or its env key is unset.
    pub fn client_for(&self, provider_name: &str) -> Result<Arc<LanguageModelProvider>, Error> {
        let provider = self
            .providers
            .get(provider_name)
            .ok_or_else(|| Error::ProviderNotFound(provider_name.to_string()))?;

        let mut clients = self.clients.lock().unwrap();
        if let Some(client) = clients.get(provider_name) {
            return Ok(Arc::clone(client));
        }

        let api_key = std::env::var(&provider.env_key)
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::ProviderInactive(provider.name.clone(), provider.env_key.clone()))?;

        let client = Arc::new(build_client(provider, api_key));
        clients.insert(provider_name.to_string(), Arc::clone(&client));
        Ok(client)
    }
}

fn build_client(provider: &Provider, api_key: String) -> LanguageModelProvider {
    match provider.shape {
        ProviderShape::OpenAi => jrdev_llm_openai::provider(jrdev_llm_openai::OpenAIConfig {
            api_key,
            base_url: provider.base_url.clone(),
            extra_headers: HashMap::new(),
        }),
        ProviderShape::Anthropic => {
            jrdev_llm_anthropic::provider(jrdev_llm_anthropic::AnthropicConfig {
                api_key,
                base_url: provider.base_url.clone(),
                extra_headers: HashMap::new(),
            })
        }
    }
}
