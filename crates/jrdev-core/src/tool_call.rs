//! `ToolCall` (spec.md §3): records and deduplicates research-agent tool
//! invocations within one research session.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub action_type: String,
    pub command: String,
    pub args: Vec<String>,
    pub reasoning: String,
    #[serde(default)]
    pub result: Option<String>,
    pub has_next: bool,
}

impl ToolCall {
    /// A call is a duplicate of a previous one if action + command + args match.
    pub fn is_duplicate_of(&self, other: &ToolCall) -> bool {
        self.action_type == other.action_type && self.command == other.command && self.args == other.args
    }
}

/// Dedupes a running call history, keeping only calls not already issued.
#[derive(Debug, Default)]
pub struct ToolCallHistory {
    calls: Vec<ToolCall>,
}

impl ToolCallHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_duplicate(&self, call: &ToolCall) -> bool {
        self.calls.iter().any(|existing| existing.is_duplicate_of(call))
    }

    pub fn push(&mut self, call: ToolCall) {
        self.calls.push(call);
    }

    pub fn calls(&self) -> &[ToolCall] {
        &self.calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_duplicate_calls_by_action_command_and_args() {
        let mut history = ToolCallHistory::new();
        let call = ToolCall {
            action_type: "web_search".to_string(),
            command: "search".to_string(),
            args: vec!["rust async".to_string()],
            reasoning: "need background".to_string(),
            result: None,
            has_next: true,
        };
        assert!(!history.is_duplicate(&call));
        history.push(call.clone());
        assert!(history.is_duplicate(&call));
    }
}
