use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Which streaming wire shape a provider's client speaks (spec.md §4.4/§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderShape {
    OpenAi,
    Anthropic,
}

/// Provider registration metadata (spec.md §3).
///
/// A provider's client is constructed iff `env_key` is set in the process
/// environment; `required` only affects startup diagnostics (warn rather
/// than hard-fail when an optional provider is inactive).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    pub env_key: String,
    pub base_url: String,
    pub shape: ProviderShape,
    pub required: bool,
    /// Profile defaults this provider recommends when it's the first active
    /// provider found in the preference order (spec.md §4.7).
    #[serde(default)]
    pub default_profiles: Option<HashMap<String, String>>,
}

impl Provider {
    /// Is this provider's API key present in the environment?
    pub fn is_active(&self) -> bool {
        std::env::var(&self.env_key).is_ok_and(|v| !v.is_empty())
    }
}
