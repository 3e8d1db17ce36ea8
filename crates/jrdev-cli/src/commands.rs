//! Individual `/`-prefixed command handlers (spec.md §6 command surface).
//! Each handler takes the parsed argument string and the kernel, and
//! returns the text to show the user.

use std::time::Duration;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;

use jrdev_core::agent::{code, research, router::CommandSummary};
use jrdev_core::thread::Role;
use jrdev_core::{prompts, MessageBuilder};
use jrdev_registry::ModelEntry;

use crate::app::{AppError, Application};

pub enum CommandOutcome {
    Text(String),
    Exit,
}

fn text(s: impl Into<String>) -> Result<CommandOutcome, AppError> {
    Ok(CommandOutcome::Text(s.into()))
}

/// The catalogue handed to the router (spec.md §4.11): name plus a short
/// one-line summary, mirroring each handler's doc comment below.
pub fn catalogue() -> Vec<CommandSummary> {
    let entries: &[(&str, &str)] = &[
        ("/addcontext", "stage a file or glob into the current thread's context"),
        ("/viewcontext", "show staged and embedded context files"),
        ("/clearcontext", "clear the current thread's staged and embedded context"),
        ("/clearmessages", "clear the current thread's message history"),
        ("/code", "run the multi-step code-editing agent on a task"),
        ("/cost", "report accumulated token usage and cost"),
        ("/exit", "exit JrDev"),
        ("/help", "list available commands"),
        ("/init", "build or refresh the project context index"),
        ("/model", "list, set, remove, or add models"),
        ("/models", "list known models"),
        ("/projectcontext", "toggle or inspect automatic project context"),
        ("/stateinfo", "show thread and task state"),
        ("/tasks", "list background tasks"),
        ("/cancel", "cancel a background task"),
        ("/asyncsend", "send a message with optional file context, fire-and-forget"),
        ("/thread", "manage conversation threads"),
        ("/git", "git helper commands: pr summary|review, config get|set|list"),
        ("/login", "show provider credential status"),
        ("/research", "run the research agent on a query"),
    ];
    entries.iter().map(|(name, summary)| CommandSummary { name: name.to_string(), summary: summary.to_string() }).collect()
}

pub async fn dispatch(app: &Application, name: &str, args: &str) -> Result<CommandOutcome, AppError> {
    match name {
        "/addcontext" => addcontext(app, args),
        "/viewcontext" => viewcontext(app, args),
        "/clearcontext" => clearcontext(app),
        "/clearmessages" => clearmessages(app),
        "/code" => code_cmd(app, args).await,
        "/cost" => cost(app),
        "/exit" => Ok(CommandOutcome::Exit),
        "/help" => help(),
        "/init" => init(app).await,
        "/model" => model_cmd(app, args),
        "/models" => model_cmd(app, "list"),
        "/projectcontext" => projectcontext(app, args).await,
        "/stateinfo" => stateinfo(app),
        "/tasks" => tasks(app),
        "/cancel" => cancel(app, args),
        "/asyncsend" => asyncsend(app, args).await,
        "/thread" => thread_cmd(app, args),
        "/git" => git_cmd(app, args).await,
        "/login" => login(app),
        "/research" => research_cmd(app, args).await,
        other => text(format!("unknown command: {other}")),
    }
}

fn glob_match(pattern: &str, candidate: &str) -> bool {
    glob::Pattern::new(pattern).map(|p| p.matches(candidate)).unwrap_or(false)
}

/// Stage a literal path, or every tracked path matching a `*`-glob.
fn addcontext(app: &Application, args: &str) -> Result<CommandOutcome, AppError> {
    let pattern = args.trim();
    if pattern.is_empty() {
        return text("usage: /addcontext <glob|path>");
    }
    let direct = app.cwd.join(pattern);
    let matches: Vec<String> = if direct.is_file() {
        vec![pattern.to_string()]
    } else {
        app.context_index
            .get_file_paths()
            .into_iter()
            .map(|p| p.to_string_lossy().into_owned())
            .filter(|p| glob_match(pattern, p))
            .collect()
    };
    if matches.is_empty() {
        return text(format!("no files matched `{pattern}`"));
    }
    let thread = app.current_thread()?;
    {
        let mut guard = thread.lock();
        for path in &matches {
            guard.stage(path.clone());
        }
        app.thread_store.save(&guard)?;
    }
    text(format!("staged {} file(s): {}", matches.len(), matches.join(", ")))
}

fn viewcontext(app: &Application, args: &str) -> Result<CommandOutcome, AppError> {
    let limit: Option<usize> = args.trim().parse().ok();
    let thread = app.current_thread()?;
    let guard = thread.lock();
    let mut staged: Vec<_> = guard.staged_context.iter().cloned().collect();
    let mut embedded: Vec<_> = guard.embedded_files.iter().cloned().collect();
    if let Some(n) = limit {
        staged.truncate(n);
        embedded.truncate(n);
    }
    text(format!(
        "staged ({}): {}\nembedded ({}): {}",
        staged.len(),
        staged.join(", "),
        embedded.len(),
        embedded.join(", ")
    ))
}

fn clearcontext(app: &Application) -> Result<CommandOutcome, AppError> {
    let thread = app.current_thread()?;
    {
        let mut guard = thread.lock();
        guard.clear_context();
        app.thread_store.save(&guard)?;
    }
    text("context cleared")
}

fn clearmessages(app: &Application) -> Result<CommandOutcome, AppError> {
    let thread = app.current_thread()?;
    {
        let mut guard = thread.lock();
        guard.clear_messages();
        app.thread_store.save(&guard)?;
    }
    text("messages cleared")
}

async fn code_cmd(app: &Application, args: &str) -> Result<CommandOutcome, AppError> {
    let task = args.trim();
    if task.is_empty() {
        return text("usage: /code <task>");
    }
    let thread = app.current_thread()?;
    let model = app.model_for(Some("advanced_coding"));
    let worker_id = app.new_worker_id("code");
    let ctx = app.agent_context(worker_id);
    let result = code::run(&ctx, &thread, &app.cwd, Some(&app.context_index), &model, task).await;
    app.thread_store.save(&thread.lock())?;

    Ok(CommandOutcome::Text(match result.status {
        code::CodeAgentStatus::Completed => {
            let mut out = if result.files_changed.is_empty() {
                "No files were changed.".to_string()
            } else {
                format!("Changed: {}", result.files_changed.join(", "))
            };
            if let Some(validation) = result.validation {
                out.push_str(&match validation {
                    code::ValidationOutcome::Valid => "\nValidation: OK".to_string(),
                    code::ValidationOutcome::Invalid(reason) => format!("\nValidation FAILED: {reason}"),
                    code::ValidationOutcome::Indeterminate => "\nValidation: indeterminate".to_string(),
                });
            }
            if !result.warnings.is_empty() {
                out.push_str(&format!("\nWarnings: {}", result.warnings.join("; ")));
            }
            out
        }
        code::CodeAgentStatus::Cancelled => "cancelled".to_string(),
        code::CodeAgentStatus::Aborted(reason) => format!("aborted: {reason}"),
    }))
}

/// Total spend across all models with recorded usage (spec.md §8 property
/// 7): `(input_tokens * input_cost + output_tokens * output_cost) / 1e7`.
fn cost(app: &Application) -> Result<CommandOutcome, AppError> {
    let usage = app.usage.get_usage();
    if usage.is_empty() {
        return text("no usage recorded yet");
    }
    let mut total = 0.0;
    let mut lines = Vec::new();
    for (model_name, tokens) in &usage {
        let rate = app.models.get(model_name);
        let model_cost = rate
            .map(|entry| {
                (tokens.input_tokens as f64 * entry.input_cost as f64
                    + tokens.output_tokens as f64 * entry.output_cost as f64)
                    / 10_000_000.0
            })
            .unwrap_or(0.0);
        total += model_cost;
        lines.push(format!(
            "{model_name}: {} in / {} out -> ${model_cost:.4}",
            tokens.input_tokens, tokens.output_tokens
        ));
    }
    lines.push(format!("total: ${total:.4}"));
    text(lines.join("\n"))
}

fn help() -> Result<CommandOutcome, AppError> {
    let lines: Vec<String> = catalogue().into_iter().map(|c| format!("{} - {}", c.name, c.summary)).collect();
    text(lines.join("\n"))
}

/// Bound on concurrent per-file summarization requests in `/init`, gathered
/// at a single join point rather than sent one at a time.
const INIT_SUMMARY_CONCURRENCY: usize = 5;

async fn init(app: &Application) -> Result<CommandOutcome, AppError> {
    let tree = app.context_index.write_filetree().map_err(|e| AppError::Other(e.to_string()))?;

    let worker_id = app.new_worker_id("init");
    let ctx = app.agent_context(worker_id);
    let model = app.model_for(Some("intermediate_coding"));

    let recommend_prompt = prompts::render("recommend_summary_set", &json!({ "tree": tree })).unwrap_or_default();
    let recommended = ctx
        .generate(&model, MessageBuilder::new(&app.cwd).add_system_message(recommend_prompt).start_user_section().append_to_user_section("go").finalize_user_section().build())
        .await
        .unwrap_or_default();

    let paths: Vec<String> = recommended.lines().filter(|l| !l.trim().is_empty()).take(25).map(|l| l.trim().to_string()).collect();
    let summarized: Vec<(String, String)> = futures::stream::iter(paths)
        .map(|path| async {
            let full = app.cwd.join(&path);
            let content = std::fs::read_to_string(&full).ok()?;
            let prompt = prompts::render("summarize_file", &json!({ "path": path, "content": content })).unwrap_or_default();
            let summary = ctx.generate(&model, jrdev_llm::GenerateRequest::new(vec![jrdev_llm::Message::system(prompt)])).await.ok()?;
            let _ = app.context_index.record_summary(std::path::Path::new(&path), &summary);
            Some((path, summary))
        })
        .buffer_unordered(INIT_SUMMARY_CONCURRENCY)
        .filter_map(|entry| async move { entry })
        .collect()
        .await;

    let mut summaries = String::new();
    for (path, summary) in summarized {
        summaries.push_str(&format!("\n- {path}: {summary}"));
    }

    let conventions_prompt = prompts::render("conventions", &json!({ "tree": tree })).unwrap_or_default();
    let conventions = ctx.generate(&model, jrdev_llm::GenerateRequest::new(vec![jrdev_llm::Message::system(conventions_prompt)])).await.unwrap_or_default();
    app.context_index.write_conventions(&conventions).map_err(|e| AppError::Other(e.to_string()))?;

    let overview_prompt = prompts::render("overview", &json!({ "tree": tree, "summaries": summaries, "conventions": conventions })).unwrap_or_default();
    let overview = ctx.generate(&model, jrdev_llm::GenerateRequest::new(vec![jrdev_llm::Message::system(overview_prompt)])).await.unwrap_or_default();
    app.context_index.write_overview(&overview).map_err(|e| AppError::Other(e.to_string()))?;

    text(format!("indexed {} files", app.context_index.get_file_paths().len()))
}

fn model_cmd(app: &Application, args: &str) -> Result<CommandOutcome, AppError> {
    let mut parts = args.trim().splitn(2, char::is_whitespace);
    match parts.next().unwrap_or("list") {
        "list" | "" => {
            let lines: Vec<String> = app
                .models
                .list()
                .into_iter()
                .map(|m| format!("{} ({}) think={} in=${:.2}/M out=${:.2}/M ctx={}", m.name, m.provider, m.is_think, m.input_cost_per_million(), m.output_cost_per_million(), m.context_tokens))
                .collect();
            text(lines.join("\n"))
        }
        "set" => {
            let rest = parts.next().unwrap_or("").trim();
            let mut it = rest.splitn(2, char::is_whitespace);
            let role = it.next().unwrap_or("advanced_coding");
            let name = it.next().unwrap_or("").trim();
            let (role, name) = if rest.split_whitespace().count() == 1 { ("advanced_coding", role) } else { (role, name) };
            if name.is_empty() {
                return text("usage: /model set <name> (sets the default profile's model)");
            }
            let mut profiles = app.profiles.lock();
            profiles.set_profile(&app.models, role, name).map_err(AppError::Registry)?;
            drop(profiles);
            app.save_profiles()?;
            text(format!("{role} -> {name}"))
        }
        "remove" => {
            let name = parts.next().unwrap_or("").trim();
            app.models.remove_model(name).map_err(AppError::Registry)?;
            app.save_models()?;
            text(format!("removed {name}"))
        }
        "add" => {
            let rest = parts.next().unwrap_or("");
            let fields: Vec<&str> = rest.split_whitespace().collect();
            if fields.len() != 6 {
                return text("usage: /model add <name> <provider> <think:true|false> <in$/M> <out$/M> <ctx>");
            }
            let name = fields[0].to_string();
            let provider = fields[1].to_string();
            let is_think: bool = fields[2].parse().unwrap_or(false);
            let input_per_million: f64 = fields[3].parse().unwrap_or(0.0);
            let output_per_million: f64 = fields[4].parse().unwrap_or(0.0);
            let context_tokens: u32 = fields[5].parse().unwrap_or(0);
            let entry = ModelEntry {
                name: name.clone(),
                provider,
                is_think,
                input_cost: (input_per_million * 10.0).round() as u64,
                output_cost: (output_per_million * 10.0).round() as u64,
                context_tokens,
            };
            app.models.add_model(entry).map_err(AppError::Registry)?;
            app.save_models()?;
            text(format!("added {name}"))
        }
        other => text(format!("unknown /model subcommand: {other}")),
    }
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct ProjectContextState {
    enabled: bool,
}

async fn projectcontext(app: &Application, args: &str) -> Result<CommandOutcome, AppError> {
    let path = app.project_paths.project_context_state();
    let mut parts = args.trim().splitn(2, char::is_whitespace);
    match parts.next().unwrap_or("status") {
        "on" => {
            jrdev_store::write_json(&path, &ProjectContextState { enabled: true })?;
            text("project context enabled")
        }
        "off" => {
            jrdev_store::write_json(&path, &ProjectContextState { enabled: false })?;
            text("project context disabled")
        }
        "status" | "" => {
            let state: ProjectContextState = jrdev_store::read_json(&path)?.unwrap_or_default();
            text(format!("project context: {}", if state.enabled { "on" } else { "off" }))
        }
        "list" => {
            let files = app.context_index.get_file_paths();
            text(files.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>().join("\n"))
        }
        "view" => {
            let target = parts.next().unwrap_or("").trim();
            if target.is_empty() {
                return text("usage: /projectcontext view <path>");
            }
            let name = target.replace(['/', '\\'], "_");
            match std::fs::read_to_string(app.project_paths.context_summary(&name)) {
                Ok(content) => text(content),
                Err(_) => text(format!("no summary recorded for {target}")),
            }
        }
        "refresh" => {
            let target = parts.next().unwrap_or("").trim();
            if target.is_empty() {
                return text("usage: /projectcontext refresh <path>");
            }
            let full = app.cwd.join(target);
            let Ok(content) = std::fs::read_to_string(&full) else {
                return text(format!("could not read {target}"));
            };
            let worker_id = app.new_worker_id("refresh");
            let ctx = app.agent_context(worker_id);
            let model = app.model_for(Some("intermediate_coding"));
            let prompt = prompts::render("summarize_file", &json!({ "path": target, "content": content })).unwrap_or_default();
            let summary = ctx
                .generate(&model, jrdev_llm::GenerateRequest::new(vec![jrdev_llm::Message::system(prompt)]))
                .await
                .map_err(AppError::Llm)?;
            app.context_index.record_summary(std::path::Path::new(target), &summary).map_err(|e| AppError::Other(e.to_string()))?;
            text(format!("refreshed {target}"))
        }
        other => text(format!("unknown /projectcontext subcommand: {other}")),
    }
}

fn stateinfo(app: &Application) -> Result<CommandOutcome, AppError> {
    let thread = app.current_thread()?;
    let guard = thread.lock();
    let tasks = app.task_monitor.snapshot();
    text(format!(
        "thread {} ({} messages, {} staged, {} embedded, {} in / {} out tokens)\n{} active task(s)",
        guard.id,
        guard.messages.len(),
        guard.staged_context.len(),
        guard.embedded_files.len(),
        guard.input_tokens,
        guard.output_tokens,
        tasks.len()
    ))
}

fn tasks(app: &Application) -> Result<CommandOutcome, AppError> {
    let tasks = app.task_monitor.snapshot();
    if tasks.is_empty() {
        return text("no tasks");
    }
    let lines: Vec<String> = tasks
        .into_iter()
        .map(|(id, info)| format!("{id}: {} [{:?}] {:.1} tok/s", info.task_name, info.state, info.tokens_per_second))
        .collect();
    text(lines.join("\n"))
}

fn cancel(app: &Application, args: &str) -> Result<CommandOutcome, AppError> {
    let target = args.trim();
    if target.is_empty() {
        return text("usage: /cancel <id|all>");
    }
    if target == "all" {
        for id in app.task_monitor.snapshot().keys() {
            app.task_monitor.cancel(id);
        }
        return text("cancelled all tasks");
    }
    app.task_monitor.cancel(target);
    text(format!("cancelled {target}"))
}

async fn asyncsend(app: &Application, args: &str) -> Result<CommandOutcome, AppError> {
    let trimmed = args.trim();
    let (filepath, prompt_text) = match trimmed.split_once(char::is_whitespace) {
        Some((maybe_path, rest)) if app.cwd.join(maybe_path).is_file() => (Some(maybe_path.to_string()), rest),
        _ => (None, trimmed),
    };
    if prompt_text.is_empty() {
        return text("usage: /asyncsend [filepath] <prompt>");
    }

    let thread = app.current_thread()?;
    let embedded = thread.lock().embedded_files.clone();
    let mut builder = MessageBuilder::new(&app.cwd);
    builder.set_embedded_files(embedded);
    builder.load_system_prompt("intent").ok();
    builder.start_user_section();
    builder.append_to_user_section(prompt_text);
    if let Some(path) = &filepath {
        builder.add_context([path.clone()]);
    }
    builder.finalize_user_section();
    let newly_embedded = builder.get_files();

    let model = app.model_for(None);
    let worker_id = app.new_worker_id("asyncsend");
    let ctx = app.agent_context(worker_id);
    let response = ctx.generate(&model, builder.build()).await.map_err(AppError::Llm)?;

    {
        let mut guard = thread.lock();
        guard.append(Role::User, prompt_text);
        guard.append(Role::Assistant, response.clone());
        for path in newly_embedded {
            guard.stage(path);
        }
        guard.commit_send();
        app.thread_store.save(&guard)?;
    }
    text(response)
}

fn thread_cmd(app: &Application, args: &str) -> Result<CommandOutcome, AppError> {
    let mut parts = args.trim().splitn(2, char::is_whitespace);
    match parts.next().unwrap_or("info") {
        "new" => {
            let id = app.thread_store.create_thread(None)?;
            text(format!("created and switched to thread {id}"))
        }
        "switch" => {
            let id = parts.next().unwrap_or("").trim();
            app.thread_store.switch_thread(id)?;
            text(format!("switched to {id}"))
        }
        "rename" => {
            let name = parts.next().unwrap_or("").trim();
            let thread = app.current_thread()?;
            let id = thread.lock().id.clone();
            app.thread_store.rename_thread(&id, name)?;
            text(format!("renamed {id} -> {name}"))
        }
        "info" | "" => {
            let thread = app.current_thread()?;
            let guard = thread.lock();
            text(format!("{} ({} messages)", guard.name.as_deref().unwrap_or(&guard.id), guard.messages.len()))
        }
        "view" => {
            let thread = app.current_thread()?;
            let guard = thread.lock();
            let lines: Vec<String> = guard.messages.iter().map(|m| format!("{:?}: {}", m.role, m.content)).collect();
            text(lines.join("\n"))
        }
        "list" => {
            let dir = app.project_paths.threads_dir();
            let mut ids = Vec::new();
            if let Ok(entries) = std::fs::read_dir(dir) {
                for entry in entries.flatten() {
                    if let Some(stem) = entry.path().file_stem() {
                        ids.push(stem.to_string_lossy().into_owned());
                    }
                }
            }
            ids.sort();
            text(ids.join("\n"))
        }
        other => text(format!("unknown /thread subcommand: {other}")),
    }
}

async fn run_git(app: &Application, args: &[&str], timeout: Duration) -> Result<String, AppError> {
    let output = tokio::time::timeout(timeout, tokio::process::Command::new("git").args(args).current_dir(&app.cwd).output())
        .await
        .map_err(|_| AppError::Other(format!("git {} timed out", args.join(" "))))?
        .map_err(|e| AppError::Other(e.to_string()))?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

async fn git_cmd(app: &Application, args: &str) -> Result<CommandOutcome, AppError> {
    let mut parts = args.trim().splitn(2, char::is_whitespace);
    match parts.next().unwrap_or("") {
        "pr" => {
            let config = jrdev_store::GitConfig::load(&app.project_paths)?;
            let diff = run_git(app, &["diff", &format!("{}...HEAD", config.base_branch)], Duration::from_secs(30)).await?;
            if diff.trim().is_empty() {
                return text("no diff against base branch");
            }
            let worker_id = app.new_worker_id("git");
            let ctx = app.agent_context(worker_id);
            let model = app.model_for(Some("advanced_reasoning"));
            let key = match parts.next().unwrap_or("summary").trim() {
                "review" => "git_pr_review",
                _ => "git_pr_summary",
            };
            let prompt = prompts::render(key, &json!({ "diff": diff })).unwrap_or_default();
            let response = ctx.generate(&model, jrdev_llm::GenerateRequest::new(vec![jrdev_llm::Message::system(prompt)])).await.map_err(AppError::Llm)?;
            text(response)
        }
        "config" => {
            let mut config = jrdev_store::GitConfig::load(&app.project_paths)?;
            let rest = parts.next().unwrap_or("list").trim();
            let mut sub = rest.splitn(2, char::is_whitespace);
            match sub.next().unwrap_or("list") {
                "get" | "list" | "" => text(format!("base_branch = {}", config.base_branch)),
                "set" => {
                    let value = sub.next().unwrap_or("").trim();
                    if value.is_empty() {
                        return text("usage: /git config set <base_branch>");
                    }
                    config.base_branch = value.to_string();
                    config.save(&app.project_paths)?;
                    text(format!("base_branch = {}", config.base_branch))
                }
                other => text(format!("unknown /git config subcommand: {other}")),
            }
        }
        other => text(format!("unknown /git subcommand: {other}")),
    }
}

fn login(app: &Application) -> Result<CommandOutcome, AppError> {
    let lines: Vec<String> = app
        .registry
        .providers()
        .map(|p| format!("{}: {} ({})", p.name, if p.is_active() { "active" } else { "inactive" }, p.env_key))
        .collect();
    text(format!("{}\n\nset the provider's env key (directly or via .env) and restart to activate it", lines.join("\n")))
}

async fn research_cmd(app: &Application, args: &str) -> Result<CommandOutcome, AppError> {
    let query = args.trim();
    if query.is_empty() {
        return text("usage: /research <query>");
    }
    let model = app.model_for(Some("advanced_reasoning"));
    let worker_id = app.new_worker_id("research");
    let ctx = app.agent_context(worker_id);
    let result = research::run(&ctx, &app.cwd, &model, query).await.map_err(AppError::Llm)?;
    text(format!("{}\n\n({} tool call(s))", result.summary, result.calls_made))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_match_wildcards() {
        assert!(glob_match("*.rs", "src/main.rs"));
        assert!(glob_match("src/*.rs", "src/main.rs"));
        assert!(glob_match("*", "anything"));
        assert!(!glob_match("*.rs", "src/main.toml"));
    }

    #[test]
    fn glob_match_is_literal_without_wildcards() {
        assert!(glob_match("src/main.rs", "src/main.rs"));
        assert!(!glob_match("src/main.rs", "src/lib.rs"));
    }

    #[test]
    fn catalogue_has_one_entry_per_top_level_command() {
        let names: Vec<String> = catalogue().into_iter().map(|c| c.name).collect();
        assert!(names.contains(&"/code".to_string()));
        assert!(names.contains(&"/exit".to_string()));
        let unique: std::collections::HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len(), "catalogue must not repeat a command name");
    }
}
