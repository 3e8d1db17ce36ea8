use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::defaults::{self, PROVIDER_PREFERENCE_ORDER};
use crate::error::Error;
use crate::model_list::ModelList;
use crate::provider::Provider;

/// Named role → model mapping, with one role designated default and also
/// used as the active chat model (spec.md §3/§4.7, C9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileManager {
    pub profiles: HashMap<String, String>,
    pub default_profile: String,
    pub chat_model: String,
}

impl ProfileManager {
    /// First-run selection (spec.md §4.7): prefer the `default_profiles` of
    /// the first active provider in preference order; else the hardcoded
    /// fallback.
    pub fn first_run(providers: &[Provider]) -> Self {
        for name in PROVIDER_PREFERENCE_ORDER {
            let Some(provider) = providers.iter().find(|p| p.name == *name) else {
                continue;
            };
            if !provider.is_active() {
                continue;
            }
            let Some(profiles) = &provider.default_profiles else {
                continue;
            };
            if profiles.is_empty() {
                continue;
            }
            let default_profile = defaults::HARDCODED_FALLBACK_DEFAULT_PROFILE.to_string();
            let chat_model = profiles
                .get(&default_profile)
                .cloned()
                .unwrap_or_else(|| profiles.values().next().cloned().unwrap());
            return Self {
                profiles: profiles.clone(),
                default_profile,
                chat_model,
            };
        }

        let profiles = defaults::hardcoded_fallback_profiles();
        let default_profile = defaults::HARDCODED_FALLBACK_DEFAULT_PROFILE.to_string();
        let chat_model = profiles
            .get(&default_profile)
            .cloned()
            .unwrap_or_else(|| "deepseek-r1-671b".to_string());
        Self {
            profiles,
            default_profile,
            chat_model,
        }
    }

    pub fn model_for(&self, role: &str) -> Option<&str> {
        self.profiles.get(role).map(String::as_str)
    }

    /// Assigns `model` to `role`, validating it exists in `model_list` or is
    /// already used by another profile (spec.md §4.7).
    pub fn set_profile(
        &mut self,
        model_list: &ModelList,
        role: &str,
        model: &str,
    ) -> Result<(), Error> {
        let already_in_use = self.profiles.values().any(|m| m == model);
        if !already_in_use && !model_list.validate_exists(model) {
            return Err(Error::ModelNotUsable(model.to_string()));
        }
        self.profiles.insert(role.to_string(), model.to_string());
        if role == self.default_profile {
            self.chat_model = model.to_string();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelEntry;
    use std::collections::HashSet;

    #[test]
    fn set_profile_rejects_unknown_model() {
        let list = ModelList::new(Vec::new(), HashSet::new());
        let mut manager = ProfileManager {
            profiles: HashMap::new(),
            default_profile: "advanced_coding".into(),
            chat_model: "x".into(),
        };
        assert!(matches!(
            manager.set_profile(&list, "advanced_coding", "nonexistent"),
            Err(Error::ModelNotUsable(_))
        ));
    }

    #[test]
    fn set_profile_allows_model_already_used_by_another_profile() {
        let list = ModelList::new(Vec::new(), HashSet::new());
        let mut manager = ProfileManager {
            profiles: [("quick_reasoning".to_string(), "gpt-5-mini".to_string())].into(),
            default_profile: "advanced_coding".into(),
            chat_model: "gpt-5".into(),
        };
        manager
            .set_profile(&list, "advanced_coding", "gpt-5-mini")
            .unwrap();
        assert_eq!(manager.chat_model, "gpt-5-mini");
    }

    #[test]
    fn set_profile_accepts_model_in_list() {
        let list = ModelList::new(
            vec![ModelEntry {
                name: "gpt-5".into(),
                provider: "openai".into(),
                is_think: true,
                input_cost: 1,
                output_cost: 1,
                context_tokens: 1,
            }],
            HashSet::new(),
        );
        let mut manager = ProfileManager {
            profiles: HashMap::new(),
            default_profile: "advanced_coding".into(),
            chat_model: String::new(),
        };
        manager.set_profile(&list, "advanced_coding", "gpt-5").unwrap();
        assert_eq!(manager.profiles["advanced_coding"], "gpt-5");
    }
}
