//! Agent control flow (C12-C14): router, code, and research agents.
//!
//! Each agent builds a request from state under a lock, streams it, records
//! the turn to history, and loops on any follow-up work of its own.

pub mod code;
pub mod research;
pub mod router;

use std::sync::Arc;
use std::time::Duration;

use jrdev_llm::{GenerateRequest, UsageTracker};
use jrdev_registry::{ModelList, ProviderRegistry};

use crate::confirm::Confirmer;
use crate::task_monitor::TaskMonitor;

const RETRY_MAX_ATTEMPTS: u32 = 2;
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// What every agent needs, handed down from the Application kernel
/// (spec.md §3: "Agents are transient objects... holding a back-reference
/// to the kernel"). Bundled into one struct here since the concrete
/// kernel lives above this crate, in the CLI binary.
pub struct AgentContext {
    pub registry: Arc<ProviderRegistry>,
    pub models: Arc<ModelList>,
    pub usage: Arc<UsageTracker>,
    pub task_monitor: Arc<TaskMonitor>,
    pub confirmer: Arc<dyn Confirmer>,
    pub worker_id: String,
}

impl AgentContext {
    /// Send a single request through C7's retry + `<think>`-filter
    /// middleware and return the concatenated text (spec.md §4.5).
    ///
    /// `model_name` is resolved against the model list to find its
    /// provider, then a fresh model handle is asked to generate on each
    /// retry attempt, since a consumed stream can't be rewound.
    pub async fn generate(&self, model_name: &str, mut request: GenerateRequest) -> Result<String, jrdev_llm::Error> {
        let entry = self
            .models
            .get(model_name)
            .ok_or_else(|| jrdev_llm::Error::Other(format!("unknown model: {model_name}")))?;
        let provider = self
            .registry
            .client_for(&entry.provider)
            .map_err(|e| jrdev_llm::Error::Other(e.to_string()))?;
        let model_id = entry.name.clone();

        if entry.is_think {
            request.options.temperature = None;
        }

        jrdev_llm::generate_llm_response(model_name, &self.usage, RETRY_MAX_ATTEMPTS, RETRY_BACKOFF, move || {
            provider.model(&model_id).generate(request.clone()).events()
        })
        .await
    }
}
