//! One item in an LLM-produced plan (spec.md §3), later materialized into
//! one or more [`crate::file_change::FileChange`]s by the per-step call.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub operation_type: String,
    pub filename: String,
    pub target_location: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<Step>,
}

impl Step {
    /// A step's JSON is well-formed iff all four fields are present and
    /// non-empty; re-prompt the user otherwise (spec.md §4.10 phase 4).
    pub fn is_conformant(&self) -> bool {
        !self.operation_type.trim().is_empty()
            && !self.filename.trim().is_empty()
            && !self.target_location.trim().is_empty()
            && !self.description.trim().is_empty()
    }
}
