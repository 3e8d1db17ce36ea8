//! Prompt library (C1): named system-prompt templates with slot
//! substitution, built on `handlebars` for `{{slot}}` interpolation.

use std::collections::HashMap;
use std::sync::OnceLock;

use handlebars::Handlebars;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown prompt `{0}`")]
    NotFound(String),
    #[error("template error in `{name}`: {source}")]
    Render {
        name: String,
        #[source]
        source: handlebars::RenderError,
    },
}

/// Raw, embedded templates keyed by the name C4/C12/C13 ask for. Kept as
/// plain `&str` constants rather than files on disk: the operations these
/// prompts drive are part of the core, not user-editable configuration.
const TEMPLATES: &[(&str, &str)] = &[
    (
        "intent",
        "You are JrDev's coding agent. Analyze the user's task below and decide \
         which files you need to see to plan the change. Respond with a line of \
         the form `get_files [\"path1\", \"path2\"]`, or `get_files []` if no \
         files are needed.\n\nTask: {{task}}",
    ),
    (
        "create_steps",
        "Given the following files and the user's task, produce a plan as a \
         fenced json block: ```json\n{\"steps\": [{\"operation_type\": ..., \
         \"filename\": ..., \"target_location\": ..., \"description\": ...}]}\n```\n\n\
         Task: {{task}}\n\nFiles:\n{{files}}{{#if extra_instruction}}\n\nAdditional \
         instruction: {{extra_instruction}}{{/if}}",
    ),
    (
        "operations/add",
        "Produce a fenced json block `{\"changes\": [FileChange]}` realizing an \
         ADD to {{filename}} at {{target_location}}: {{description}}",
    ),
    (
        "operations/delete",
        "Produce a fenced json block `{\"changes\": [FileChange]}` realizing a \
         DELETE from {{filename}} at {{target_location}}: {{description}}",
    ),
    (
        "operations/replace",
        "Produce a fenced json block `{\"changes\": [FileChange]}` realizing a \
         REPLACE in {{filename}} at {{target_location}}: {{description}}",
    ),
    (
        "operations/new",
        "Produce a fenced json block `{\"changes\": [FileChange]}` realizing a \
         NEW file {{filename}}: {{description}}",
    ),
    (
        "operations/insert",
        "Produce a fenced json block `{\"changes\": [FileChange]}` realizing an \
         insert into {{filename}} at {{target_location}}: {{description}}",
    ),
    (
        "operations/rename",
        "Produce a fenced json block `{\"changes\": [FileChange]}` realizing a \
         RENAME of {{filename}}: {{description}}",
    ),
    (
        "validate",
        "Review the following modified file contents for syntactic soundness. \
         Reply beginning with `VALID` if they look correct, or `INVALID: <reason>` \
         otherwise.\n\n{{contents}}",
    ),
    (
        "select_command",
        "Given the user's input and the command catalogue below, decide whether \
         to execute a command, ask for clarification, or just chat. Respond with \
         a fenced json block `{\"decision\": \"execute_command\"|\"clarify\"|\"chat\", ...}`.\n\n\
         Commands:\n{{catalogue}}\n\nInput: {{input}}",
    ),
    (
        "research",
        "You are JrDev's research agent. Use web_search and web_scrape to answer \
         the query, then summarize findings.\n\nQuery: {{query}}",
    ),
    (
        "summarize_file",
        "Summarize the purpose and public surface of this file in a few \
         sentences.\n\nPath: {{path}}\n\n{{content}}",
    ),
    (
        "conventions",
        "Given the project's file tree and contents, describe its coding \
         conventions (naming, formatting, error handling style) in markdown.\n\n{{tree}}",
    ),
    (
        "overview",
        "Given the project's file tree, per-file summaries, and conventions, \
         write a high-level overview in markdown.\n\n{{tree}}\n\n{{summaries}}\n\n{{conventions}}",
    ),
    (
        "recommend_summary_set",
        "Given this project file tree, list the files most worth summarizing for \
         future coding tasks, one path per line.\n\n{{tree}}",
    ),
    (
        "git_pr_summary",
        "Summarize the following diff as a pull request description: a short \
         title line, then a bullet list of notable changes.\n\n{{diff}}",
    ),
    (
        "git_pr_review",
        "Review the following diff for bugs, missed edge cases, and style \
         issues. Be specific about file and line where possible.\n\n{{diff}}",
    ),
];

fn registry() -> &'static Handlebars<'static> {
    static REGISTRY: OnceLock<Handlebars<'static>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut hb = Handlebars::new();
        hb.set_strict_mode(false);
        for (name, template) in TEMPLATES {
            hb.register_template_string(name, template)
                .unwrap_or_else(|e| panic!("invalid built-in prompt template `{name}`: {e}"));
        }
        hb
    })
}

/// Load a named system prompt and substitute `slots` into it.
pub fn render<T: Serialize>(key: &str, slots: &T) -> Result<String, Error> {
    registry()
        .render(key, slots)
        .map_err(|source| Error::Render { name: key.to_string(), source })
}

/// Load a named prompt with no slots to fill.
pub fn load(key: &str) -> Result<String, Error> {
    let empty: HashMap<&str, &str> = HashMap::new();
    if !TEMPLATES.iter().any(|(name, _)| *name == key) {
        return Err(Error::NotFound(key.to_string()));
    }
    render(key, &empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_known_prompt_with_slots() {
        let rendered = render("intent", &json!({"task": "add a test"})).unwrap();
        assert!(rendered.contains("add a test"));
    }

    #[test]
    fn unknown_prompt_is_an_error() {
        assert!(matches!(load("does_not_exist"), Err(Error::NotFound(_))));
    }
}
