//! Background task monitor (C15): tracks async work units and surfaces
//! status to the UI (spec.md §4.13).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Active,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub task_name: String,
    pub model: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub tokens_per_second: f64,
    pub start_time: Instant,
    pub state: TaskState,
}

/// In-memory `worker_id -> TaskInfo` map with a one-second sweep
/// (spec.md §4.13). Sub-tasks share the parent id prefix joined by `":"`.
pub struct TaskMonitor {
    tasks: Mutex<HashMap<String, TaskInfo>>,
}

impl Default for TaskMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskMonitor {
    pub fn new() -> Self {
        Self { tasks: Mutex::new(HashMap::new()) }
    }

    pub fn add_task(&self, worker_id: impl Into<String>, task_name: impl Into<String>, model: Option<String>) {
        self.tasks.lock().insert(
            worker_id.into(),
            TaskInfo {
                task_name: task_name.into(),
                model,
                input_tokens: 0,
                output_tokens: 0,
                tokens_per_second: 0.0,
                start_time: Instant::now(),
                state: TaskState::Active,
            },
        );
    }

    pub fn update_input_tokens(&self, worker_id: &str, tokens: u64) {
        if let Some(task) = self.tasks.lock().get_mut(worker_id) {
            task.input_tokens = tokens;
        }
    }

    pub fn update_output_tokens(&self, worker_id: &str, tokens: u64) {
        if let Some(task) = self.tasks.lock().get_mut(worker_id) {
            task.output_tokens = tokens;
            let elapsed = task.start_time.elapsed().as_secs_f64().max(0.001);
            task.tokens_per_second = tokens as f64 / elapsed;
        }
    }

    pub fn mark_done(&self, worker_id: &str, failed: bool) {
        if let Some(task) = self.tasks.lock().get_mut(worker_id) {
            task.state = if failed { TaskState::Failed } else { TaskState::Done };
        }
    }

    /// Allocate a sub-task id: `"<parent>:<n>"`, preserving traceability
    /// to the parent worker.
    pub fn new_sub_task(&self, parent_id: &str, description: impl Into<String>) -> String {
        let mut tasks = self.tasks.lock();
        let mut n = 1;
        let mut child_id = format!("{parent_id}:{n}");
        while tasks.contains_key(&child_id) {
            n += 1;
            child_id = format!("{parent_id}:{n}");
        }
        tasks.insert(
            child_id.clone(),
            TaskInfo {
                task_name: description.into(),
                model: None,
                input_tokens: 0,
                output_tokens: 0,
                tokens_per_second: 0.0,
                start_time: Instant::now(),
                state: TaskState::Active,
            },
        );
        child_id
    }

    pub fn snapshot(&self) -> HashMap<String, TaskInfo> {
        self.tasks.lock().clone()
    }

    pub fn cancel(&self, worker_id: &str) {
        self.mark_done(worker_id, true);
    }

    /// One-second sweep removing tasks that are done/failed. Spawned once
    /// by the kernel at startup.
    pub async fn run_sweep(monitor: std::sync::Arc<Self>) {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            monitor.tasks.lock().retain(|_, task| task.state == TaskState::Active);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_task_ids_are_prefixed_by_parent() {
        let monitor = TaskMonitor::new();
        monitor.add_task("w1", "code task", None);
        let child = monitor.new_sub_task("w1", "summarize a.rs");
        assert_eq!(child, "w1:1");
        let second = monitor.new_sub_task("w1", "summarize b.rs");
        assert_eq!(second, "w1:2");
    }

    #[test]
    fn mark_done_updates_state() {
        let monitor = TaskMonitor::new();
        monitor.add_task("w1", "task", None);
        monitor.mark_done("w1", false);
        assert_eq!(monitor.snapshot()["w1"].state, TaskState::Done);
    }
}
