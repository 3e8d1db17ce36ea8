//! The confirmation capability (spec.md §4.12) — the only user-facing
//! prompts the core demands. Implemented by the terminal UI collaborator.

use crate::step::Step;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmChoice {
    Yes,
    No,
    RequestChange,
    Edit,
    AcceptAll,
}

#[derive(Debug, Clone, Default)]
pub struct ConfirmResponse {
    pub choice: Option<ConfirmChoice>,
    pub message: Option<String>,
    pub edited_content: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanChoice {
    Accept,
    Edit,
    Reprompt,
    Cancel,
}

#[derive(Debug, Clone, Default)]
pub struct PlanResponse {
    pub choice: Option<PlanChoice>,
    pub steps: Option<Vec<Step>>,
    pub prompt: Option<String>,
}

/// Capability asked of the UI layer for every human-in-the-loop decision
/// the core demands (diff confirmation, plan confirmation, command
/// confirmation).
#[async_trait::async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &str, diff_lines: &[String]) -> ConfirmResponse;
    async fn confirm_plan(&self, steps: &[Step]) -> PlanResponse;
    async fn confirm_command(&self, command: &str) -> bool;
}
