//! Terminal implementation of `jrdev_core::Confirmer` (spec.md §4.12), the
//! only user-facing prompts the core demands.

use std::io::{self, Write};

use jrdev_core::confirm::{ConfirmChoice, ConfirmResponse, PlanChoice, PlanResponse};
use jrdev_core::step::Step;

pub struct TerminalConfirmer;

fn read_line(prompt: &str) -> String {
    print!("{prompt}");
    let _ = io::stdout().flush();
    let mut input = String::new();
    let _ = io::stdin().read_line(&mut input);
    input.trim().to_string()
}

fn read_multiline(prompt: &str) -> Vec<String> {
    println!("{prompt} (end with a single '.' on its own line)");
    let mut lines = Vec::new();
    loop {
        let line = read_line("");
        if line == "." {
            break;
        }
        lines.push(line);
    }
    lines
}

#[async_trait::async_trait]
impl jrdev_core::confirm::Confirmer for TerminalConfirmer {
    async fn confirm(&self, prompt: &str, diff_lines: &[String]) -> ConfirmResponse {
        let prompt = prompt.to_string();
        let diff_lines = diff_lines.to_vec();
        tokio::task::spawn_blocking(move || {
            println!("\n{prompt}");
            for line in &diff_lines {
                println!("{line}");
            }
            loop {
                let choice = read_line("[y]es / [n]o / [r]equest change / [e]dit / [a]ccept all: ");
                return match choice.to_lowercase().as_str() {
                    "y" | "yes" => ConfirmResponse { choice: Some(ConfirmChoice::Yes), message: None, edited_content: None },
                    "n" | "no" => ConfirmResponse { choice: Some(ConfirmChoice::No), message: None, edited_content: None },
                    "r" | "request_change" => {
                        let message = read_line("feedback: ");
                        ConfirmResponse { choice: Some(ConfirmChoice::RequestChange), message: Some(message), edited_content: None }
                    }
                    "e" | "edit" => {
                        let edited = read_multiline("enter replacement content");
                        ConfirmResponse { choice: Some(ConfirmChoice::Edit), message: None, edited_content: Some(edited) }
                    }
                    "a" | "accept_all" => {
                        ConfirmResponse { choice: Some(ConfirmChoice::AcceptAll), message: None, edited_content: None }
                    }
                    _ => continue,
                };
            }
        })
        .await
        .unwrap_or_default()
    }

    async fn confirm_plan(&self, steps: &[Step]) -> PlanResponse {
        let steps = steps.to_vec();
        tokio::task::spawn_blocking(move || {
            println!("\nProposed plan:");
            for (i, step) in steps.iter().enumerate() {
                println!(
                    "  {}. [{}] {} @ {} - {}",
                    i + 1,
                    step.operation_type,
                    step.filename,
                    step.target_location,
                    step.description
                );
            }
            loop {
                let choice = read_line("[a]ccept / [e]dit / re[p]rompt / [c]ancel: ");
                return match choice.to_lowercase().as_str() {
                    "a" | "accept" => PlanResponse { choice: Some(PlanChoice::Accept), steps: None, prompt: None },
                    "e" | "edit" => {
                        let raw = read_multiline("paste replacement steps as json lines, or one json blob");
                        let joined = raw.join("\n");
                        let parsed: Option<Vec<Step>> = serde_json::from_str(&joined).ok();
                        PlanResponse { choice: Some(PlanChoice::Edit), steps: parsed, prompt: None }
                    }
                    "p" | "reprompt" => {
                        let extra = read_line("additional instruction: ");
                        PlanResponse { choice: Some(PlanChoice::Reprompt), steps: None, prompt: Some(extra) }
                    }
                    "c" | "cancel" => PlanResponse { choice: Some(PlanChoice::Cancel), steps: None, prompt: None },
                    _ => continue,
                };
            }
        })
        .await
        .unwrap_or_default()
    }

    async fn confirm_command(&self, command: &str) -> bool {
        let command = command.to_string();
        tokio::task::spawn_blocking(move || {
            let choice = read_line(&format!("run `{command}`? [y/N]: "));
            matches!(choice.to_lowercase().as_str(), "y" | "yes")
        })
        .await
        .unwrap_or(false)
    }
}
