//! Progress events agents emit for the UI to render, tagged with the
//! originating worker id (spec.md §5: "the Application kernel must tag
//! every UI update with its originating worker id").

use jrdev_llm::Usage;

use crate::step::Step;

/// Structured content for display. Frontends can use this to apply
/// syntax highlighting, diff rendering, etc.
#[derive(Debug, Clone)]
pub enum DisplayBody {
    Text(String),
    Code { language: Option<String>, content: String },
    Diff { file: String, unified: String },
}

/// How to display one step's progress to the user.
#[derive(Debug, Clone)]
pub struct StepDisplay {
    pub title: String,
    pub body: Option<DisplayBody>,
}

/// Events emitted by an agent during a turn, each tagged with the
/// originating worker id so concurrent workers' updates don't collide.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    UserMessage { worker_id: String, content: String },
    TextDelta { worker_id: String, delta: String },
    PlanReady { worker_id: String, steps: Vec<Step> },
    StepStart { worker_id: String, display: StepDisplay },
    StepDone { worker_id: String, display: StepDisplay },
    TurnComplete { worker_id: String, usage: Usage },
    Error { worker_id: String, message: String },
}

impl AgentEvent {
    pub fn worker_id(&self) -> &str {
        match self {
            AgentEvent::UserMessage { worker_id, .. }
            | AgentEvent::TextDelta { worker_id, .. }
            | AgentEvent::PlanReady { worker_id, .. }
            | AgentEvent::StepStart { worker_id, .. }
            | AgentEvent::StepDone { worker_id, .. }
            | AgentEvent::TurnComplete { worker_id, .. }
            | AgentEvent::Error { worker_id, .. } => worker_id,
        }
    }
}
