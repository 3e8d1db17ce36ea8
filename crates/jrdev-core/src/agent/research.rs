//! Research agent (C14): drives a web_search/web_scrape tool loop and
//! summarizes findings (spec.md §4/4.13's referenced research flow).

use std::path::Path;

use select::document::Document;
use select::node::Node;
use select::predicate::Name;
use serde::Deserialize;
use serde_json::json;

use crate::fenced;
use crate::message::MessageBuilder;
use crate::prompts;
use crate::tool_call::{ToolCall, ToolCallHistory};

use super::AgentContext;

const MAX_ROUNDS: u32 = 6;

#[derive(Debug, Deserialize)]
struct NextAction {
    action_type: String,
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    has_next: bool,
}

#[derive(Debug, Clone)]
pub struct ResearchResult {
    pub summary: String,
    pub calls_made: usize,
}

/// Runs the research loop for `query`, issuing web_search/web_scrape
/// tool calls the model asks for, deduplicating repeats, until the model
/// signals `has_next: false` or [`MAX_ROUNDS`] is reached.
pub async fn run(ctx: &AgentContext, cwd: &Path, model: &str, query: &str) -> Result<ResearchResult, jrdev_llm::Error> {
    ctx.task_monitor.add_task(ctx.worker_id.clone(), format!("research: {query}"), Some(model.to_string()));

    let system_prompt = prompts::render("research", &json!({ "query": query })).unwrap_or_default();
    let mut history = ToolCallHistory::new();
    let mut transcript = String::new();

    for round in 0..MAX_ROUNDS {
        let mut builder = MessageBuilder::new(cwd);
        builder.add_system_message(system_prompt.clone());
        builder.start_user_section();
        builder.append_to_user_section(query);
        if !transcript.is_empty() {
            builder.append_to_user_section(&format!("Findings so far:\n{transcript}"));
        }
        builder.append_to_user_section(
            "Respond with a fenced json block describing the next tool call: \
             {\"action_type\": \"web_search\"|\"web_scrape\", \"command\": ..., \"args\": [...], \
             \"reasoning\": ..., \"has_next\": bool}. Set has_next to false once you have enough \
             information to answer.",
        );
        builder.finalize_user_section();

        let response = ctx.generate(model, builder.build()).await?;

        let Ok(next) = fenced::extract_parsed::<NextAction>(&response) else {
            transcript.push_str(&response);
            break;
        };

        let call = ToolCall {
            action_type: next.action_type.clone(),
            command: next.command.clone(),
            args: next.args.clone(),
            reasoning: next.reasoning.clone(),
            result: None,
            has_next: next.has_next,
        };

        if history.is_duplicate(&call) {
            transcript.push_str(&format!("\n(skipped duplicate {} call)\n", call.action_type));
            if !next.has_next {
                break;
            }
            continue;
        }

        let result = match next.action_type.as_str() {
            "web_search" => web_search(&next.command).await,
            "web_scrape" => web_scrape(&next.command).await,
            other => format!("unknown action type `{other}`"),
        };

        transcript.push_str(&format!("\n--- {} {} ---\n{result}\n", next.action_type, next.command));
        history.push(ToolCall { result: Some(result), ..call });

        if !next.has_next || round + 1 == MAX_ROUNDS {
            break;
        }
    }

    let mut summarize_builder = MessageBuilder::new(cwd);
    summarize_builder.add_system_message("Summarize the research findings below, concisely, for the user.");
    summarize_builder.start_user_section();
    summarize_builder.append_to_user_section(&transcript);
    summarize_builder.finalize_user_section();
    let summary = ctx.generate(model, summarize_builder.build()).await?;

    ctx.task_monitor.mark_done(&ctx.worker_id, false);
    Ok(ResearchResult { summary, calls_made: history.calls().len() })
}

async fn web_search(query: &str) -> String {
    let url = format!("https://duckduckgo.com/html/?q={}", urlencode(query));
    match reqwest::get(&url).await {
        Ok(response) => match response.text().await {
            Ok(body) => extract_text(&body).chars().take(4000).collect(),
            Err(e) => format!("search fetch failed while reading body: {e}"),
        },
        Err(e) => format!("search request failed: {e}"),
    }
}

async fn web_scrape(url: &str) -> String {
    match reqwest::get(url).await {
        Ok(response) => match response.text().await {
            Ok(body) => extract_text(&body).chars().take(8000).collect(),
            Err(e) => format!("scrape fetch failed while reading body: {e}"),
        },
        Err(e) => format!("scrape request failed: {e}"),
    }
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        if byte.is_ascii_alphanumeric() {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Walk the parsed document and collect visible text, dropping
/// `<script>`/`<style>` subtrees entirely rather than stripping tags
/// character-by-character.
fn extract_text(html: &str) -> String {
    let document = Document::from(html);
    let mut out = String::with_capacity(html.len() / 2);
    match document.find(Name("body")).next() {
        Some(body) => collect_text(body, &mut out),
        None => {
            for node in document.find(Name("html")) {
                collect_text(node, &mut out);
            }
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(node: Node, out: &mut String) {
    if matches!(node.name(), Some("script") | Some("style")) {
        return;
    }
    if let Some(text) = node.as_text() {
        out.push_str(text);
        out.push(' ');
        return;
    }
    for child in node.children() {
        collect_text(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_text_drops_markup_and_script_bodies() {
        let html = "<html><head><script>evil()</script></head><body><p>Hello <b>world</b></p></body></html>";
        assert_eq!(extract_text(html), "Hello world");
    }

    #[test]
    fn urlencode_escapes_spaces() {
        assert_eq!(urlencode("rust async"), "rust%20async");
    }

    #[test]
    fn urlencode_escapes_multibyte_utf8_per_byte() {
        assert_eq!(urlencode("café"), "caf%C3%A9");
    }
}
