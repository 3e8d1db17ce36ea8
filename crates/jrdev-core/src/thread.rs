//! Per-conversation message history and staged/embedded context
//! (spec.md §3, §4.8).

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMetadata {
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

/// A persistent conversation unit. A file path is in exactly one of
/// `staged_context`/`embedded_files` at any time (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub name: Option<String>,
    pub messages: Vec<ThreadMessage>,
    pub staged_context: BTreeSet<String>,
    pub embedded_files: BTreeSet<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub metadata: ThreadMetadata,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("thread name must be 3-20 chars of [A-Za-z0-9_-]")]
    InvalidName,
    #[error("a thread named `{0}` already exists")]
    NameCollision(String),
}

fn is_valid_name(name: &str) -> bool {
    (3..=20).contains(&name.len())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl Thread {
    pub fn new(id: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: None,
            messages: Vec::new(),
            staged_context: BTreeSet::new(),
            embedded_files: BTreeSet::new(),
            input_tokens: 0,
            output_tokens: 0,
            metadata: ThreadMetadata { created_at: now, last_modified: now },
        }
    }

    pub fn rename(&mut self, name: &str) -> Result<(), Error> {
        if !is_valid_name(name) {
            return Err(Error::InvalidName);
        }
        self.name = Some(name.to_string());
        self.touch();
        Ok(())
    }

    pub fn stage(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.embedded_files.contains(&path) {
            self.staged_context.insert(path);
        }
    }

    pub fn clear_context(&mut self) {
        self.staged_context.clear();
        self.embedded_files.clear();
        self.touch();
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
        self.touch();
    }

    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(ThreadMessage { role, content: content.into() });
        self.touch();
    }

    /// Append a streamed chunk to the last assistant message, or start a
    /// new one if the last message isn't an in-progress assistant turn.
    pub fn append_assistant_chunk(&mut self, chunk: &str) {
        if let Some(last) = self.messages.last_mut() {
            if last.role == Role::Assistant {
                last.content.push_str(chunk);
                self.metadata.last_modified = Utc::now();
                return;
            }
        }
        self.append(Role::Assistant, chunk.to_string());
    }

    /// Finalize the in-progress assistant message to a full string,
    /// replacing any partial-chunk content accumulated so far.
    pub fn finalize_assistant_message(&mut self, content: impl Into<String>) {
        match self.messages.last_mut() {
            Some(last) if last.role == Role::Assistant => last.content = content.into(),
            _ => self.append(Role::Assistant, content),
        }
        self.touch();
    }

    /// Mark a successful send: the staged set empties and its members are
    /// unioned into `embedded_files` (spec.md §8 property 1).
    pub fn commit_send(&mut self) {
        self.embedded_files.append(&mut self.staged_context.clone());
        self.staged_context.clear();
        self.touch();
    }

    pub fn record_usage(&mut self, input: u64, output: u64) {
        self.input_tokens += input;
        self.output_tokens += output;
        self.touch();
    }

    fn touch(&mut self) {
        self.metadata.last_modified = Utc::now();
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Store(#[from] jrdev_store::Error),
    #[error(transparent)]
    Thread(#[from] Error),
    #[error("no such thread `{0}`")]
    NotFound(String),
}

/// Kernel-owned collection of threads, serialized per-thread (spec.md §5).
pub struct ThreadStore {
    paths: jrdev_store::ProjectPaths,
    threads: Mutex<std::collections::HashMap<String, Arc<Mutex<Thread>>>>,
    current: Mutex<Option<String>>,
}

impl ThreadStore {
    pub fn new(paths: jrdev_store::ProjectPaths) -> Self {
        Self { paths, threads: Mutex::new(std::collections::HashMap::new()), current: Mutex::new(None) }
    }

    pub fn create_thread(&self, id: Option<String>) -> Result<String, StoreError> {
        let id = id.unwrap_or_else(|| uuid_like_id());
        let thread = Thread::new(id.clone());
        self.save(&thread)?;
        self.threads.lock().insert(id.clone(), Arc::new(Mutex::new(thread)));
        *self.current.lock() = Some(id.clone());
        Ok(id)
    }

    pub fn switch_thread(&self, id: &str) -> Result<(), StoreError> {
        if self.get_thread(id)?.is_none() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        *self.current.lock() = Some(id.to_string());
        Ok(())
    }

    pub fn get_thread(&self, id: &str) -> Result<Option<Arc<Mutex<Thread>>>, StoreError> {
        if let Some(thread) = self.threads.lock().get(id).cloned() {
            return Ok(Some(thread));
        }
        let loaded: Option<Thread> = jrdev_store::read_json(&self.paths.thread(id))?;
        Ok(loaded.map(|thread| {
            let handle = Arc::new(Mutex::new(thread));
            self.threads.lock().insert(id.to_string(), handle.clone());
            handle
        }))
    }

    pub fn get_current_thread(&self) -> Result<Option<Arc<Mutex<Thread>>>, StoreError> {
        match self.current.lock().clone() {
            Some(id) => self.get_thread(&id),
            None => Ok(None),
        }
    }

    /// Names already in use, across both the in-memory cache and any
    /// persisted thread that hasn't been loaded into it yet, so a rename
    /// can't collide with a thread just because it's never been opened
    /// this session.
    fn all_known_names(&self) -> Vec<Option<String>> {
        let mut names: Vec<Option<String>> = self.threads.lock().values().map(|t| t.lock().name.clone()).collect();
        if let Ok(entries) = std::fs::read_dir(self.paths.threads_dir()) {
            for entry in entries.flatten() {
                let Some(other_id) = entry.path().file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                    continue;
                };
                if self.threads.lock().contains_key(&other_id) {
                    continue;
                }
                if let Ok(Some(thread)) = self.get_thread(&other_id) {
                    names.push(thread.lock().name.clone());
                }
            }
        }
        names
    }

    pub fn rename_thread(&self, id: &str, name: &str) -> Result<(), StoreError> {
        if self.all_known_names().iter().any(|n| n.as_deref() == Some(name)) {
            return Err(StoreError::Thread(Error::NameCollision(name.to_string())));
        }
        let Some(thread) = self.get_thread(id)? else { return Err(StoreError::NotFound(id.to_string())) };
        {
            let mut guard = thread.lock();
            guard.rename(name)?;
        }
        self.save(&thread.lock())?;
        Ok(())
    }

    pub fn save(&self, thread: &Thread) -> Result<(), StoreError> {
        jrdev_store::write_json(&self.paths.thread(&thread.id), thread)?;
        Ok(())
    }
}

fn uuid_like_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    format!("thread-{nanos:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_send_unions_staged_into_embedded_and_clears_staged() {
        let mut thread = Thread::new("t1".to_string());
        thread.stage("a.rs");
        thread.stage("b.rs");
        thread.commit_send();
        assert!(thread.staged_context.is_empty());
        assert!(thread.embedded_files.contains("a.rs"));
        assert!(thread.embedded_files.contains("b.rs"));
    }

    #[test]
    fn staging_an_already_embedded_file_is_a_no_op() {
        let mut thread = Thread::new("t1".to_string());
        thread.embedded_files.insert("a.rs".to_string());
        thread.stage("a.rs");
        assert!(thread.staged_context.is_empty());
    }

    #[test]
    fn assistant_chunks_accumulate_then_finalize_replaces() {
        let mut thread = Thread::new("t1".to_string());
        thread.append(Role::User, "hi");
        thread.append_assistant_chunk("Hel");
        thread.append_assistant_chunk("lo");
        assert_eq!(thread.messages.last().unwrap().content, "Hello");
        thread.finalize_assistant_message("Hello there");
        assert_eq!(thread.messages.last().unwrap().content, "Hello there");
        assert_eq!(thread.messages.len(), 2);
    }

    #[test]
    fn rename_rejects_invalid_names() {
        let mut thread = Thread::new("t1".to_string());
        assert!(thread.rename("ab").is_err());
        assert!(thread.rename("has space").is_err());
        assert!(thread.rename("valid-name_1").is_ok());
    }

    #[test]
    fn rename_rejects_collision_with_an_unloaded_persisted_thread() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = jrdev_store::ProjectPaths::resolve(tmp.path()).unwrap();
        let store = ThreadStore::new(paths);

        let other_id = store.create_thread(Some("other".to_string())).unwrap();
        {
            let other = store.get_thread(&other_id).unwrap().unwrap();
            other.lock().rename("taken").unwrap();
            store.save(&other.lock()).unwrap();
        }
        // Force the in-memory cache to forget it, so the check must fall
        // back to the persisted file to see the name.
        store.threads.lock().remove(&other_id);

        let mine = store.create_thread(Some("mine".to_string())).unwrap();
        let result = store.rename_thread(&mine, "taken");
        assert!(matches!(result, Err(StoreError::Thread(Error::NameCollision(_)))));
    }
}
