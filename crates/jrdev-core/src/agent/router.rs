//! Router agent (C13): decides whether free-form user input should
//! dispatch a command, ask for clarification, or just chat
//! (spec.md §4.11).

use std::path::Path;

use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;

use crate::fenced;
use crate::message::MessageBuilder;
use crate::prompts;
use crate::thread::{Role, Thread};

use super::AgentContext;

/// One entry in the command catalogue the router is shown: name plus the
/// first line of the command's docstring.
#[derive(Debug, Clone)]
pub struct CommandSummary {
    pub name: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterDecision {
    /// Reconstructed as `"<name> <args joined>"` for the kernel to dispatch.
    ExecuteCommand(String),
    Clarify(String),
    Chat(String),
}

#[derive(Debug, Deserialize)]
struct RawDecision {
    decision: String,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    args: Option<Vec<String>>,
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    response: Option<String>,
}

fn render_catalogue(commands: &[CommandSummary]) -> String {
    commands.iter().map(|c| format!("{} - {}", c.name, c.summary)).collect::<Vec<_>>().join("\n")
}

/// Route one turn of user input (spec.md §4.11). `router_thread` is the
/// router's own private, persisted history; `user_thread` is the
/// user-facing thread, only touched on a `chat` decision.
pub async fn route(
    ctx: &AgentContext,
    router_thread: &Mutex<Thread>,
    user_thread: &Mutex<Thread>,
    cwd: &Path,
    model: &str,
    commands: &[CommandSummary],
    input: &str,
) -> Result<RouterDecision, jrdev_llm::Error> {
    let catalogue = render_catalogue(commands);
    let prompt = prompts::render("select_command", &json!({ "catalogue": catalogue, "input": input }))
        .unwrap_or_default();

    let history = router_thread.lock().messages.clone();
    let mut builder = MessageBuilder::new(cwd);
    builder.add_system_message(prompt);
    builder.add_historical_messages(&history);
    builder.start_user_section();
    builder.append_to_user_section(input);
    builder.finalize_user_section();

    let response = ctx.generate(model, builder.build()).await?;

    {
        let mut guard = router_thread.lock();
        guard.append(Role::User, input);
        guard.append(Role::Assistant, response.clone());
    }

    let raw: RawDecision = match fenced::extract_parsed(&response) {
        Ok(d) => d,
        Err(_) => {
            return Ok(RouterDecision::Clarify(
                "I couldn't interpret that — could you rephrase it?".to_string(),
            ));
        }
    };

    Ok(match raw.decision.as_str() {
        "execute_command" => {
            let name = raw.command.unwrap_or_default();
            let args = raw.args.unwrap_or_default().join(" ");
            let reconstructed = if args.is_empty() { name } else { format!("{name} {args}") };
            RouterDecision::ExecuteCommand(reconstructed)
        }
        "clarify" => RouterDecision::Clarify(raw.question.unwrap_or_default()),
        _ => {
            let reply = raw.response.unwrap_or(response);
            let mut guard = user_thread.lock();
            guard.append(Role::User, input);
            guard.append(Role::Assistant, reply.clone());
            RouterDecision::Chat(reply)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_renders_name_and_summary() {
        let commands = vec![
            CommandSummary { name: "/code".to_string(), summary: "run the code agent".to_string() },
            CommandSummary { name: "/init".to_string(), summary: "build project context".to_string() },
        ];
        let rendered = render_catalogue(&commands);
        assert_eq!(rendered, "/code - run the code agent\n/init - build project context");
    }
}
