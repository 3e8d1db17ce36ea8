//! The Application kernel: wires the provider registry, model list,
//! profiles, thread store, context index, and task monitor together, and
//! owns the persistence glue neither `jrdev-registry` nor `jrdev-store`
//! can own without introducing a dependency cycle between them.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use jrdev_core::agent::AgentContext;
use jrdev_core::{ContextIndex, TaskMonitor, Thread, ThreadStore};
use jrdev_llm::UsageTracker;
use jrdev_registry::{defaults, ModelEntry, ModelList, ProfileManager, ProviderRegistry};
use jrdev_store::{ProjectPaths, UserPaths};

use crate::confirm::TerminalConfirmer;

const ROUTER_THREAD_ID: &str = "router";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    AppDirs(#[from] jrdev_app::Error),
    #[error(transparent)]
    Store(#[from] jrdev_store::Error),
    #[error(transparent)]
    Registry(#[from] jrdev_registry::Error),
    #[error(transparent)]
    Llm(#[from] jrdev_llm::Error),
    #[error(transparent)]
    Thread(#[from] jrdev_core::thread::StoreError),
    #[error("{0}")]
    Other(String),
}

/// `~/.jrdev/user_model_config.json` (spec.md §6). `ModelList` itself isn't
/// `Serialize`/`Deserialize` (it's a mutex-guarded runtime type) so the
/// on-disk shape is mirrored here and converted at load/save time.
#[derive(Debug, Serialize, Deserialize, Default)]
struct UserModelConfig {
    user_models: Vec<ModelEntry>,
    ignored_model_names: Vec<String>,
}

pub struct Application {
    pub registry: Arc<ProviderRegistry>,
    pub models: Arc<ModelList>,
    pub profiles: Mutex<ProfileManager>,
    pub usage: Arc<UsageTracker>,
    pub task_monitor: Arc<TaskMonitor>,
    pub confirmer: Arc<dyn jrdev_core::Confirmer>,
    pub thread_store: Arc<ThreadStore>,
    pub context_index: ContextIndex,
    pub router_thread: Arc<Mutex<Thread>>,
    pub cwd: PathBuf,
    pub user_paths: UserPaths,
    pub project_paths: ProjectPaths,
    pub accept_all: bool,
}

impl Application {
    pub fn new(cwd: PathBuf, accept_all: bool) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let registry = Arc::new(ProviderRegistry::new(defaults::default_providers()));
        let user_paths = UserPaths::resolve()?;
        let models = Arc::new(load_model_list(&user_paths)?);
        let providers: Vec<_> = registry.providers().cloned().collect();
        let profiles = Mutex::new(load_profiles(&user_paths, &providers)?);

        let project_paths = ProjectPaths::resolve(&cwd)?;
        jrdev_app::ensure_gitignore_entry(&cwd)?;

        let thread_store = Arc::new(ThreadStore::new(ProjectPaths::resolve(&cwd)?));
        if thread_store.get_current_thread()?.is_none() {
            thread_store.create_thread(None)?;
        }

        let router_thread = match thread_store.get_thread(ROUTER_THREAD_ID)? {
            Some(thread) => thread,
            None => {
                let thread = Thread::new(ROUTER_THREAD_ID.to_string());
                thread_store.save(&thread)?;
                Arc::new(Mutex::new(thread))
            }
        };

        let context_index = ContextIndex::new(cwd.clone(), ProjectPaths::resolve(&cwd)?);

        Ok(Self {
            registry,
            models,
            profiles,
            usage: Arc::new(UsageTracker::new()),
            task_monitor: Arc::new(TaskMonitor::new()),
            confirmer: Arc::new(TerminalConfirmer),
            thread_store,
            context_index,
            router_thread,
            cwd,
            user_paths,
            project_paths,
            accept_all,
        })
    }

    /// Persist the model list back to `user_model_config.json` (spec.md
    /// §6), called after any `/model add|remove` mutation.
    pub fn save_models(&self) -> Result<(), AppError> {
        let config = UserModelConfig {
            user_models: self.models.list(),
            ignored_model_names: self.models.ignored().into_iter().collect(),
        };
        jrdev_store::write_json(&self.user_paths.user_model_config(), &config)?;
        Ok(())
    }

    pub fn save_profiles(&self) -> Result<(), AppError> {
        jrdev_store::write_json(&self.user_paths.model_profiles(), &*self.profiles.lock())?;
        Ok(())
    }

    pub fn current_thread(&self) -> Result<Arc<Mutex<Thread>>, AppError> {
        self.thread_store
            .get_current_thread()?
            .ok_or_else(|| AppError::Other("no current thread".to_string()))
    }

    /// Resolve which model backs a role (spec.md §4.7): `chat_model` is the
    /// active default unless the caller names a profile role explicitly.
    pub fn model_for(&self, role: Option<&str>) -> String {
        let profiles = self.profiles.lock();
        match role.and_then(|r| profiles.model_for(r)) {
            Some(model) => model.to_string(),
            None => profiles.chat_model.clone(),
        }
    }

    pub fn new_worker_id(&self, prefix: &str) -> String {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        format!("{prefix}-{nanos:x}")
    }

    pub fn agent_context(&self, worker_id: String) -> AgentContext {
        AgentContext {
            registry: Arc::clone(&self.registry),
            models: Arc::clone(&self.models),
            usage: Arc::clone(&self.usage),
            task_monitor: Arc::clone(&self.task_monitor),
            confirmer: Arc::clone(&self.confirmer),
            worker_id,
        }
    }
}

fn load_model_list(paths: &UserPaths) -> Result<ModelList, AppError> {
    let config: UserModelConfig = jrdev_store::read_json(&paths.user_model_config())?.unwrap_or_default();
    let ignored: HashSet<String> = config.ignored_model_names.into_iter().collect();
    let list = ModelList::new(config.user_models, ignored);
    list.reconcile_with_defaults(&defaults::default_models());
    Ok(list)
}

fn load_profiles(paths: &UserPaths, providers: &[jrdev_registry::Provider]) -> Result<ProfileManager, AppError> {
    if let Some(saved) = jrdev_store::read_json::<ProfileManager>(&paths.model_profiles())? {
        return Ok(saved);
    }
    let profiles = ProfileManager::first_run(providers);
    jrdev_store::write_json(&paths.model_profiles(), &profiles)?;
    Ok(profiles)
}
