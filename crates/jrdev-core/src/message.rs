//! Assembles provider-ready message arrays from thread history, context
//! files, and project summaries (spec.md §4.3).

use std::collections::BTreeSet;
use std::path::Path;

use jrdev_llm::{GenerateRequest, Message, Role};

use crate::context::ContextIndex;
use crate::prompts;
use crate::thread::{Role as ThreadRole, ThreadMessage};

/// Stateful builder; `build()` never mutates the originating thread —
/// the caller merges `getFiles()`'s result into `thread.embedded_files`
/// only if the send actually succeeds (spec.md §4.3 invariant).
pub struct MessageBuilder<'a> {
    cwd: &'a Path,
    messages: Vec<Message>,
    embedded_files: BTreeSet<String>,
    pending_paths: Vec<String>,
    user_section: String,
    files_embedded_this_build: BTreeSet<String>,
}

impl<'a> MessageBuilder<'a> {
    pub fn new(cwd: &'a Path) -> Self {
        Self {
            cwd,
            messages: Vec::new(),
            embedded_files: BTreeSet::new(),
            pending_paths: Vec::new(),
            user_section: String::new(),
            files_embedded_this_build: BTreeSet::new(),
        }
    }

    pub fn add_system_message(&mut self, content: impl Into<String>) -> &mut Self {
        self.messages.push(Message { role: Role::System, content: content.into() });
        self
    }

    pub fn load_system_prompt(&mut self, key: &str) -> Result<&mut Self, prompts::Error> {
        let content = prompts::load(key)?;
        self.add_system_message(content);
        Ok(self)
    }

    pub fn add_historical_messages(&mut self, history: &[ThreadMessage]) -> &mut Self {
        for message in history {
            let role = match message.role {
                ThreadRole::System => Role::System,
                ThreadRole::User => Role::User,
                ThreadRole::Assistant => Role::Assistant,
            };
            self.messages.push(Message { role, content: message.content.clone() });
        }
        self
    }

    pub fn add_project_files(&mut self, index: &ContextIndex) -> &mut Self {
        let mut block = String::new();
        if let Ok(tree) = index.read_filetree() {
            block.push_str("# File tree\n\n");
            block.push_str(&tree);
            block.push('\n');
        }
        if let Ok(overview) = index.read_overview() {
            block.push_str("\n# Overview\n\n");
            block.push_str(&overview);
        }
        if let Ok(conventions) = index.read_conventions() {
            block.push_str("\n# Conventions\n\n");
            block.push_str(&conventions);
        }
        if !block.is_empty() {
            self.add_system_message(block);
        }
        self
    }

    pub fn add_context(&mut self, paths: impl IntoIterator<Item = String>) -> &mut Self {
        self.pending_paths.extend(paths);
        self
    }

    /// Files already present in the message history; suppresses
    /// re-embedding (spec.md §8 property 1: no content from `E`).
    pub fn set_embedded_files(&mut self, embedded: BTreeSet<String>) -> &mut Self {
        self.embedded_files = embedded;
        self
    }

    pub fn start_user_section(&mut self) -> &mut Self {
        self.user_section.clear();
        self
    }

    pub fn append_to_user_section(&mut self, text: &str) -> &mut Self {
        if !self.user_section.is_empty() {
            self.user_section.push('\n');
        }
        self.user_section.push_str(text);
        self
    }

    /// Concatenates the running user text, then the catenated contents of
    /// pending files (deduped against `embedded_files`), then a
    /// "USER CONTEXT" block.
    pub fn finalize_user_section(&mut self) -> &mut Self {
        let mut content = self.user_section.clone();

        let mut to_embed = Vec::new();
        for path in self.pending_paths.drain(..) {
            if !self.embedded_files.contains(&path) && !self.files_embedded_this_build.contains(&path) {
                to_embed.push(path);
            }
        }

        if !to_embed.is_empty() {
            content.push_str("\n\nUSER CONTEXT\n");
            for path in &to_embed {
                let full = self.cwd.join(path);
                match std::fs::read_to_string(&full) {
                    Ok(file_content) => {
                        content.push_str(&format!("\n--- {path} ---\n{file_content}\n"));
                        self.files_embedded_this_build.insert(path.clone());
                    }
                    Err(e) => {
                        log::warn!("failed to embed context file {path}: {e}");
                    }
                }
            }
        }

        self.messages.push(Message { role: Role::User, content });
        self
    }

    pub fn build(&self) -> GenerateRequest {
        GenerateRequest::new(self.messages.clone())
    }

    pub fn get_files(&self) -> BTreeSet<String> {
        self.files_embedded_this_build.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_files_are_never_re_embedded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn a() {}").unwrap();

        let mut builder = MessageBuilder::new(dir.path());
        builder.set_embedded_files(BTreeSet::from(["a.rs".to_string()]));
        builder.start_user_section();
        builder.append_to_user_section("do something");
        builder.add_context(["a.rs".to_string()]);
        builder.finalize_user_section();

        assert!(builder.get_files().is_empty());
        let built = builder.build();
        assert!(!built.messages.last().unwrap().content.contains("fn a()"));
    }

    #[test]
    fn staged_files_are_embedded_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn a() {}").unwrap();

        let mut builder = MessageBuilder::new(dir.path());
        builder.start_user_section();
        builder.append_to_user_section("do something");
        builder.add_context(["a.rs".to_string()]);
        builder.finalize_user_section();

        let files = builder.get_files();
        assert_eq!(files.len(), 1);
        let built = builder.build();
        let occurrences = built.messages.last().unwrap().content.matches("fn a()").count();
        assert_eq!(occurrences, 1);
    }
}
