//! JrDev's agentic task engine: router/code/research agents, the
//! file-edit primitives they drive, conversation threads, and the
//! project context index (spec.md §2 components C1-C4, C10-C15).

pub mod agent;
pub mod confirm;
pub mod context;
pub mod edit;
pub mod event;
pub mod fenced;
pub mod file_change;
pub mod lang;
pub mod lines;
pub mod message;
pub mod prompts;
pub mod step;
pub mod task_monitor;
pub mod thread;
pub mod tool_call;

pub use agent::AgentContext;
pub use confirm::{ConfirmChoice, ConfirmResponse, Confirmer, PlanChoice, PlanResponse};
pub use context::ContextIndex;
pub use event::{AgentEvent, DisplayBody, StepDisplay};
pub use file_change::{ChangeSet, FileChange};
pub use message::MessageBuilder;
pub use step::{Plan, Step};
pub use task_monitor::TaskMonitor;
pub use thread::{Thread, ThreadStore};
pub use tool_call::{ToolCall, ToolCallHistory};
