use std::collections::HashMap;
use std::sync::Mutex;

use crate::stream::Usage;

/// Process-wide token usage accumulator (spec.md §4.6).
///
/// No persistence across process lifetimes; cost derivation from the
/// accumulated totals is the caller's responsibility (the registry's
/// `ModelEntry` costs live in `jrdev-registry`, not here).
#[derive(Default)]
pub struct UsageTracker {
    totals: Mutex<HashMap<String, Usage>>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically add to a model's running input/output token totals.
    pub fn add_use(&self, model: &str, input_tokens: u32, output_tokens: u32) {
        let mut totals = self.totals.lock().unwrap();
        let entry = totals.entry(model.to_string()).or_default();
        entry.input_tokens += input_tokens;
        entry.output_tokens += output_tokens;
    }

    /// Snapshot of per-model totals accumulated so far.
    pub fn get_usage(&self) -> HashMap<String, Usage> {
        self.totals.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_across_calls() {
        let tracker = UsageTracker::new();
        tracker.add_use("gpt-5", 100, 20);
        tracker.add_use("gpt-5", 50, 10);
        tracker.add_use("claude-opus", 10, 5);

        let usage = tracker.get_usage();
        assert_eq!(usage["gpt-5"].input_tokens, 150);
        assert_eq!(usage["gpt-5"].output_tokens, 30);
        assert_eq!(usage["claude-opus"].input_tokens, 10);
    }
}
