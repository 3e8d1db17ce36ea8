/// Errors produced by the model/provider registry.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A provider with the given name was not found.
    #[error("provider not found: {0}")]
    ProviderNotFound(String),

    /// A model with the given name was not found in the active list.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// Adding a model whose name is already present in the active list.
    #[error("model already exists: {0}")]
    DuplicateModel(String),

    /// `set_profile` was given a model that neither exists in the model list
    /// nor is already assigned to another profile.
    #[error("model not usable for a profile: {0}")]
    ModelNotUsable(String),

    /// The provider's environment key is unset; no client can be constructed.
    #[error("provider {0} has no client: missing environment variable {1}")]
    ProviderInactive(String, String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
