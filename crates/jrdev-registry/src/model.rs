use serde::{Deserialize, Serialize};

/// A single model entry in the user-editable model list (spec.md §3).
///
/// Costs are stored as integer units of 1/10,000,000 of a currency unit per
/// token; the display layer divides by 10 to present a per-million-token
/// rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    pub provider: String,
    pub is_think: bool,
    pub input_cost: u64,
    pub output_cost: u64,
    pub context_tokens: u32,
}

impl ModelEntry {
    pub fn input_cost_per_million(&self) -> f64 {
        self.input_cost as f64 / 10.0
    }

    pub fn output_cost_per_million(&self) -> f64 {
        self.output_cost as f64 / 10.0
    }
}
