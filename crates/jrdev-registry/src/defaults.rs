//! Hardcoded provider and model defaults (spec.md §4.7), used both to seed
//! a fresh install and to reconcile against a user's saved model list.

use crate::model::ModelEntry;
use crate::provider::{Provider, ProviderShape};
use std::collections::HashMap;

/// Preference order used to pick a provider's `default_profiles` on first
/// run, matching the original tool's provider_preference_order.
pub const PROVIDER_PREFERENCE_ORDER: &[&str] =
    &["open_router", "openai", "anthropic", "venice", "deepseek"];

pub fn default_providers() -> Vec<Provider> {
    vec![
        Provider {
            name: "openai".into(),
            env_key: "OPENAI_API_KEY".into(),
            base_url: "https://api.openai.com/v1".into(),
            shape: ProviderShape::OpenAi,
            required: false,
            default_profiles: Some(profile_map(&[
                ("intent_router", "gpt-5-mini"),
                ("advanced_coding", "gpt-5"),
                ("advanced_reasoning", "gpt-5"),
                ("intermediate_coding", "gpt-5-mini"),
                ("quick_reasoning", "gpt-5-mini"),
            ])),
        },
        Provider {
            name: "anthropic".into(),
            env_key: "ANTHROPIC_API_KEY".into(),
            base_url: "https://api.anthropic.com".into(),
            shape: ProviderShape::Anthropic,
            required: false,
            default_profiles: Some(profile_map(&[
                ("intent_router", "claude-haiku-4-5"),
                ("advanced_coding", "claude-opus-4-6"),
                ("advanced_reasoning", "claude-opus-4-6"),
                ("intermediate_coding", "claude-sonnet-4-6"),
                ("quick_reasoning", "claude-haiku-4-5"),
            ])),
        },
        Provider {
            name: "open_router".into(),
            env_key: "OPEN_ROUTER_KEY".into(),
            base_url: "https://openrouter.ai/api/v1".into(),
            shape: ProviderShape::OpenAi,
            required: false,
            default_profiles: Some(profile_map(&[
                ("intent_router", "qwen-2.5-coder-32b"),
                ("advanced_coding", "deepseek-r1-671b"),
                ("advanced_reasoning", "deepseek-r1-671b"),
                ("intermediate_coding", "qwen-2.5-coder-32b"),
                ("quick_reasoning", "qwen-2.5-coder-32b"),
            ])),
        },
        Provider {
            name: "venice".into(),
            env_key: "VENICE_API_KEY".into(),
            base_url: "https://api.venice.ai/api/v1".into(),
            shape: ProviderShape::OpenAi,
            required: false,
            default_profiles: None,
        },
        Provider {
            name: "deepseek".into(),
            env_key: "DEEPSEEK_API_KEY".into(),
            base_url: "https://api.deepseek.com/v1".into(),
            shape: ProviderShape::OpenAi,
            required: false,
            default_profiles: Some(profile_map(&[
                ("intent_router", "deepseek-chat"),
                ("advanced_coding", "deepseek-r1-671b"),
                ("advanced_reasoning", "deepseek-r1-671b"),
                ("intermediate_coding", "deepseek-chat"),
                ("quick_reasoning", "deepseek-chat"),
            ])),
        },
    ]
}

pub fn default_models() -> Vec<ModelEntry> {
    vec![
        ModelEntry {
            name: "gpt-5".into(),
            provider: "openai".into(),
            is_think: true,
            input_cost: 12_500,
            output_cost: 100_000,
            context_tokens: 400_000,
        },
        ModelEntry {
            name: "gpt-5-mini".into(),
            provider: "openai".into(),
            is_think: false,
            input_cost: 2_500,
            output_cost: 20_000,
            context_tokens: 400_000,
        },
        ModelEntry {
            name: "claude-opus-4-6".into(),
            provider: "anthropic".into(),
            is_think: true,
            input_cost: 150_000,
            output_cost: 750_000,
            context_tokens: 200_000,
        },
        ModelEntry {
            name: "claude-sonnet-4-6".into(),
            provider: "anthropic".into(),
            is_think: false,
            input_cost: 30_000,
            output_cost: 150_000,
            context_tokens: 200_000,
        },
        ModelEntry {
            name: "claude-haiku-4-5".into(),
            provider: "anthropic".into(),
            is_think: false,
            input_cost: 8_000,
            output_cost: 40_000,
            context_tokens: 200_000,
        },
        ModelEntry {
            name: "deepseek-r1-671b".into(),
            provider: "open_router".into(),
            is_think: true,
            input_cost: 5_500,
            output_cost: 21_500,
            context_tokens: 128_000,
        },
        ModelEntry {
            name: "qwen-2.5-coder-32b".into(),
            provider: "open_router".into(),
            is_think: false,
            input_cost: 900,
            output_cost: 900,
            context_tokens: 32_000,
        },
        ModelEntry {
            name: "deepseek-chat".into(),
            provider: "deepseek".into(),
            is_think: false,
            input_cost: 2_700,
            output_cost: 11_000,
            context_tokens: 64_000,
        },
    ]
}

/// Ultimate fallback when no provider is active at all, matching the
/// original tool's hardcoded_fallback_config.
pub fn hardcoded_fallback_profiles() -> HashMap<String, String> {
    profile_map(&[
        ("intent_router", "qwen-2.5-coder-32b"),
        ("advanced_reasoning", "deepseek-r1-671b"),
        ("advanced_coding", "deepseek-r1-671b"),
        ("intermediate_coding", "qwen-2.5-coder-32b"),
        ("quick_reasoning", "qwen-2.5-coder-32b"),
    ])
}

pub const HARDCODED_FALLBACK_DEFAULT_PROFILE: &str = "advanced_coding";

fn profile_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(role, model)| (role.to_string(), model.to_string()))
        .collect()
}
