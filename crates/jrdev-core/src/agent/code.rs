//! Code agent (C12) — the multi-step plan-then-apply executor
//! (spec.md §4.10, the hardest component in the system).

use std::path::Path;

use jrdev_llm::{GenerateRequest, Message};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::confirm::PlanChoice;
use crate::context::ContextIndex;
use crate::edit::{self, AcceptAllState, ApplyStatus};
use crate::fenced;
use crate::file_change::FileChange;
use crate::message::MessageBuilder;
use crate::prompts;
use crate::step::{Plan, Step};
use crate::thread::{Role, Thread};

use super::AgentContext;

const MAX_STEP_RETRIES: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeAgentStatus {
    Completed,
    Cancelled,
    /// No `get_files` token in the intent response, or the plan never
    /// produced conformant steps.
    Aborted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(String),
    Indeterminate,
}

#[derive(Debug, Clone)]
pub struct CodeAgentResult {
    pub status: CodeAgentStatus,
    pub files_changed: Vec<String>,
    pub validation: Option<ValidationOutcome>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct StepsBlock {
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
struct ChangesBlock {
    changes: Vec<FileChange>,
}

/// Parses a `get_files ["a.rs", "b.rs"]` token out of the intent response
/// (spec.md §4.10 phase 2). Accepts an empty list; absent token is `None`.
fn parse_get_files(text: &str) -> Option<Vec<String>> {
    let start = text.find("get_files")?;
    let rest = &text[start + "get_files".len()..];
    let bracket_start = rest.find('[')?;
    let bracket_end = rest[bracket_start..].find(']')? + bracket_start;
    let list = &rest[bracket_start..=bracket_end];
    serde_json::from_str::<Vec<String>>(list).ok()
}

fn read_files(cwd: &Path, paths: &[String]) -> String {
    let mut out = String::new();
    for path in paths {
        match std::fs::read_to_string(cwd.join(path)) {
            Ok(content) => out.push_str(&format!("\n--- {path} ---\n{content}\n")),
            Err(e) => out.push_str(&format!("\n--- {path} ---\n(failed to read: {e})\n")),
        }
    }
    out
}

/// Run one `/code` invocation to completion (spec.md §4.10).
pub async fn run(
    ctx: &AgentContext,
    thread: &Mutex<Thread>,
    cwd: &Path,
    index: Option<&ContextIndex>,
    model: &str,
    task: &str,
) -> CodeAgentResult {
    ctx.task_monitor.add_task(ctx.worker_id.clone(), format!("code: {task}"), Some(model.to_string()));

    // Phase 1-2: intent message, file request.
    let mut builder = MessageBuilder::new(cwd);
    if let Ok(prompt) = prompts::load("intent") {
        builder.add_system_message(prompt);
    }
    if let Some(index) = index {
        builder.add_project_files(index);
    }
    builder.start_user_section();
    builder.append_to_user_section(task);
    builder.finalize_user_section();

    let intent_response = match ctx.generate(model, builder.build()).await {
        Ok(text) => text,
        Err(e) => {
            ctx.task_monitor.mark_done(&ctx.worker_id, true);
            return aborted(format!("intent request failed: {e}"));
        }
    };

    let Some(requested_files) = parse_get_files(&intent_response) else {
        ctx.task_monitor.mark_done(&ctx.worker_id, true);
        return aborted("no code action requested".to_string());
    };

    // Phase 3-4: plan generation and confirmation, looping on reprompt.
    let mut extra_instruction: Option<String> = None;
    let steps = loop {
        let files_block = read_files(cwd, &requested_files);
        let prompt = match prompts::render(
            "create_steps",
            &json!({ "task": task, "files": files_block, "extra_instruction": extra_instruction }),
        ) {
            Ok(p) => p,
            Err(e) => return aborted(format!("prompt render failed: {e}")),
        };

        let mut plan_builder = MessageBuilder::new(cwd);
        plan_builder.add_system_message(prompt);
        plan_builder.start_user_section();
        plan_builder.append_to_user_section(task);
        plan_builder.finalize_user_section();

        let response = match ctx.generate(model, plan_builder.build()).await {
            Ok(text) => text,
            Err(e) => {
                ctx.task_monitor.mark_done(&ctx.worker_id, true);
                return aborted(format!("plan request failed: {e}"));
            }
        };

        let parsed: StepsBlock = match fenced::extract_parsed(&response) {
            Ok(block) => block,
            Err(_) => {
                ctx.task_monitor.mark_done(&ctx.worker_id, true);
                return aborted("plan response had no parseable steps".to_string());
            }
        };

        if !parsed.steps.iter().all(Step::is_conformant) {
            ctx.task_monitor.mark_done(&ctx.worker_id, true);
            return aborted("plan contained non-conformant steps".to_string());
        }

        let plan_response = ctx.confirmer.confirm_plan(&parsed.steps).await;
        match plan_response.choice {
            Some(PlanChoice::Accept) | None => break parsed.steps,
            Some(PlanChoice::Edit) => break plan_response.steps.unwrap_or(parsed.steps),
            Some(PlanChoice::Cancel) => {
                ctx.task_monitor.mark_done(&ctx.worker_id, false);
                return CodeAgentResult {
                    status: CodeAgentStatus::Cancelled,
                    files_changed: Vec::new(),
                    validation: None,
                    warnings: Vec::new(),
                };
            }
            Some(PlanChoice::Reprompt) => {
                extra_instruction = plan_response.prompt;
                continue;
            }
        }
    };

    // Phase 5: per-step execution, with a bounded retry-on-feedback loop.
    let mut files_changed = Vec::new();
    let mut warnings = Vec::new();
    let mut accept_all = AcceptAllState::default();
    let mut zero_change_steps = Vec::new();

    for step in &steps {
        match execute_step(ctx, cwd, model, step, None, &mut accept_all).await {
            StepOutcome::Applied(mut files) => {
                if files.is_empty() {
                    zero_change_steps.push(step.clone());
                } else {
                    files_changed.append(&mut files);
                }
            }
            StepOutcome::Cancelled => {
                ctx.task_monitor.mark_done(&ctx.worker_id, false);
                return CodeAgentResult {
                    status: CodeAgentStatus::Cancelled,
                    files_changed,
                    validation: None,
                    warnings,
                };
            }
            StepOutcome::Aborted(reason) => {
                ctx.task_monitor.mark_done(&ctx.worker_id, true);
                return CodeAgentResult {
                    status: CodeAgentStatus::Aborted(format!("{}: {reason}", step.filename)),
                    files_changed,
                    validation: None,
                    warnings,
                };
            }
            StepOutcome::Failed(reason) => warnings.push(format!("{}: {reason}", step.filename)),
        }
    }

    // Phase 6: retry pass for steps that produced zero changes.
    for step in zero_change_steps {
        match execute_step(ctx, cwd, model, &step, Some("the previous attempt produced no changes, please try again"), &mut accept_all).await {
            StepOutcome::Applied(mut files) => files_changed.append(&mut files),
            StepOutcome::Cancelled => {
                ctx.task_monitor.mark_done(&ctx.worker_id, false);
                return CodeAgentResult {
                    status: CodeAgentStatus::Cancelled,
                    files_changed,
                    validation: None,
                    warnings,
                };
            }
            StepOutcome::Aborted(reason) => {
                ctx.task_monitor.mark_done(&ctx.worker_id, true);
                return CodeAgentResult {
                    status: CodeAgentStatus::Aborted(format!("{}: {reason}", step.filename)),
                    files_changed,
                    validation: None,
                    warnings,
                };
            }
            StepOutcome::Failed(reason) => warnings.push(format!("{}: {reason}", step.filename)),
        }
    }

    // Phase 7: validation.
    let validation = if files_changed.is_empty() {
        None
    } else {
        let contents = read_files(cwd, &files_changed);
        let prompt = prompts::render("validate", &json!({ "contents": contents })).unwrap_or_default();
        match ctx.generate(model, GenerateRequest::new(vec![Message::system(prompt)])).await {
            Ok(response) => Some(interpret_validation(&response)),
            Err(_) => Some(ValidationOutcome::Indeterminate),
        }
    };

    {
        let mut guard = thread.lock();
        guard.append(Role::User, task);
        guard.append(Role::Assistant, summarize_result(&files_changed, &warnings));
        guard.commit_send();
    }

    ctx.task_monitor.mark_done(&ctx.worker_id, false);
    CodeAgentResult { status: CodeAgentStatus::Completed, files_changed, validation, warnings }
}

enum StepOutcome {
    Applied(Vec<String>),
    Cancelled,
    Failed(String),
    /// The step exhausted its retry budget against rejection feedback
    /// (spec.md §4.10 phase 5); the whole run gives up rather than
    /// continuing to the next step.
    Aborted(String),
}

/// Execute one step, parsing its fenced `{changes: [FileChange]}` block
/// and handing it to C2, retrying on `request_change` feedback up to
/// [`MAX_STEP_RETRIES`] (spec.md §4.10 phase 5 state machine).
async fn execute_step(
    ctx: &AgentContext,
    cwd: &Path,
    model: &str,
    step: &Step,
    extra_note: Option<&str>,
    accept_all: &mut AcceptAllState,
) -> StepOutcome {
    let op_key = format!("operations/{}", step.operation_type.to_lowercase());
    let Ok(system_prompt) = prompts::render(
        &op_key,
        &json!({ "filename": step.filename, "target_location": step.target_location, "description": step.description }),
    ) else {
        return StepOutcome::Failed(format!("unknown operation type `{}`", step.operation_type));
    };

    let mut feedback: Option<String> = None;
    let mut parse_failures = 0u32;
    let mut rejection_retries = 0u32;

    loop {
        let mut builder = MessageBuilder::new(cwd);
        builder.add_system_message(system_prompt.clone());
        builder.start_user_section();
        builder.append_to_user_section(&format!(
            "apply {} to {}@{} to {}",
            step.operation_type, step.filename, step.target_location, step.description
        ));
        if let Some(note) = extra_note {
            builder.append_to_user_section(note);
        }
        if let Some(fb) = &feedback {
            builder.append_to_user_section(&format!("previous attempt was rejected with feedback: {fb}"));
        }
        builder.add_context([step.filename.clone()]);
        builder.finalize_user_section();

        let response = match ctx.generate(model, builder.build()).await {
            Ok(text) => text,
            Err(e) => return StepOutcome::Failed(format!("request failed: {e}")),
        };

        let changes: ChangesBlock = match fenced::extract_parsed(&response) {
            Ok(c) => c,
            Err(_) => {
                parse_failures += 1;
                if parse_failures >= 2 {
                    return StepOutcome::Failed("could not parse a changes block after two attempts".to_string());
                }
                continue;
            }
        };

        let result = edit::apply(changes.changes, cwd, ctx.confirmer.as_ref(), accept_all).await;
        match result.status {
            Some(ApplyStatus::Accepted) => return StepOutcome::Applied(result.files_changed),
            Some(ApplyStatus::Cancelled) => return StepOutcome::Cancelled,
            Some(ApplyStatus::Rejected) => match result.rejection_reason {
                Some(message) => {
                    rejection_retries += 1;
                    if rejection_retries > MAX_STEP_RETRIES {
                        return StepOutcome::Aborted(format!(
                            "change rejected after {MAX_STEP_RETRIES} retries: {message}"
                        ));
                    }
                    feedback = Some(message);
                    continue;
                }
                None => return StepOutcome::Failed("change rejected without feedback".to_string()),
            },
            None => return StepOutcome::Failed("no applicable changes".to_string()),
        }
    }
}

fn interpret_validation(response: &str) -> ValidationOutcome {
    let trimmed = response.trim_start();
    if trimmed.starts_with("VALID") {
        ValidationOutcome::Valid
    } else if let Some(idx) = trimmed.find("INVALID:") {
        ValidationOutcome::Invalid(trimmed[idx + "INVALID:".len()..].trim().to_string())
    } else {
        ValidationOutcome::Indeterminate
    }
}

fn summarize_result(files_changed: &[String], warnings: &[String]) -> String {
    if files_changed.is_empty() {
        return "No files were changed.".to_string();
    }
    let mut out = format!("Changed: {}", files_changed.join(", "));
    if !warnings.is_empty() {
        out.push_str(&format!("\nWarnings: {}", warnings.join("; ")));
    }
    out
}

fn aborted(reason: String) -> CodeAgentResult {
    CodeAgentResult {
        status: CodeAgentStatus::Aborted(reason),
        files_changed: Vec::new(),
        validation: None,
        warnings: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_get_files_token() {
        let text = "I need to see these: get_files [\"src/a.rs\", \"src/b.rs\"]";
        assert_eq!(parse_get_files(text), Some(vec!["src/a.rs".to_string(), "src/b.rs".to_string()]));
    }

    #[test]
    fn parses_empty_get_files_token() {
        let text = "No files needed.\nget_files []";
        assert_eq!(parse_get_files(text), Some(Vec::new()));
    }

    #[test]
    fn missing_token_is_none() {
        assert_eq!(parse_get_files("just chatting"), None);
    }

    #[test]
    fn validation_response_is_interpreted() {
        assert_eq!(interpret_validation("VALID, looks good"), ValidationOutcome::Valid);
        assert_eq!(
            interpret_validation("INVALID: missing semicolon"),
            ValidationOutcome::Invalid("missing semicolon".to_string())
        );
        assert_eq!(interpret_validation("not sure"), ValidationOutcome::Indeterminate);
    }
}
