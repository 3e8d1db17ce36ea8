use std::collections::HashSet;
use std::sync::Mutex;

use crate::error::Error;
use crate::model::ModelEntry;

/// Thread-safe, user-editable model list (spec.md §4.7, C9).
///
/// Removing a model records its name in an "ignored" set so that a later
/// reconcile-with-defaults pass never silently re-adds it.
pub struct ModelList {
    entries: Mutex<Vec<ModelEntry>>,
    ignored: Mutex<HashSet<String>>,
}

impl ModelList {
    pub fn new(entries: Vec<ModelEntry>, ignored: HashSet<String>) -> Self {
        Self {
            entries: Mutex::new(entries),
            ignored: Mutex::new(ignored),
        }
    }

    pub fn list(&self) -> Vec<ModelEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn ignored(&self) -> HashSet<String> {
        self.ignored.lock().unwrap().clone()
    }

    pub fn validate_exists(&self, name: &str) -> bool {
        self.entries.lock().unwrap().iter().any(|m| m.name == name)
    }

    pub fn get(&self, name: &str) -> Option<ModelEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.name == name)
            .cloned()
    }

    /// Appends a model; fails if the name is already present.
    pub fn add_model(&self, entry: ModelEntry) -> Result<(), Error> {
        let mut entries = self.entries.lock().unwrap();
        if entries.iter().any(|m| m.name == entry.name) {
            return Err(Error::DuplicateModel(entry.name));
        }
        self.ignored.lock().unwrap().remove(&entry.name);
        entries.push(entry);
        Ok(())
    }

    /// Removes a model by name and marks it ignored so defaults reconciliation
    /// won't reintroduce it.
    pub fn remove_model(&self, name: &str) -> Result<(), Error> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|m| m.name != name);
        if entries.len() == before {
            return Err(Error::ModelNotFound(name.to_string()));
        }
        self.ignored.lock().unwrap().insert(name.to_string());
        Ok(())
    }

    pub fn edit_model(&self, name: &str, edit: impl FnOnce(&mut ModelEntry)) -> Result<(), Error> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .iter_mut()
            .find(|m| m.name == name)
            .ok_or_else(|| Error::ModelNotFound(name.to_string()))?;
        edit(entry);
        Ok(())
    }

    /// Appends `entry` without failing if a model of the same name already
    /// exists (used by reconciliation, where duplicates get silently kept
    /// as-is rather than erroring).
    fn append_without_duplicates(&self, entries: &mut Vec<ModelEntry>, entry: ModelEntry) {
        if !entries.iter().any(|m| m.name == entry.name) {
            entries.push(entry);
        }
    }

    /// Reconciles the current list against hardcoded defaults (spec.md §4.7):
    /// add any default not ignored and not already present; update the
    /// properties of existing entries to match the default when they differ;
    /// dedupe by name.
    pub fn reconcile_with_defaults(&self, defaults: &[ModelEntry]) {
        let mut entries = self.entries.lock().unwrap();
        let ignored = self.ignored.lock().unwrap();

        for default in defaults {
            if ignored.contains(&default.name) {
                continue;
            }
            match entries.iter_mut().find(|m| m.name == default.name) {
                Some(existing) if existing != default => *existing = default.clone(),
                Some(_) => {}
                None => self.append_without_duplicates(&mut entries, default.clone()),
            }
        }

        let mut seen = HashSet::new();
        entries.retain(|m| seen.insert(m.name.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, provider: &str) -> ModelEntry {
        ModelEntry {
            name: name.to_string(),
            provider: provider.to_string(),
            is_think: false,
            input_cost: 100,
            output_cost: 100,
            context_tokens: 1000,
        }
    }

    #[test]
    fn add_rejects_duplicate_names() {
        let list = ModelList::new(vec![entry("gpt-5", "openai")], HashSet::new());
        assert!(matches!(
            list.add_model(entry("gpt-5", "openai")),
            Err(Error::DuplicateModel(_))
        ));
    }

    #[test]
    fn remove_then_reconcile_does_not_reintroduce() {
        let list = ModelList::new(vec![entry("gpt-5", "openai")], HashSet::new());
        list.remove_model("gpt-5").unwrap();
        assert!(!list.validate_exists("gpt-5"));

        list.reconcile_with_defaults(&[entry("gpt-5", "openai")]);
        assert!(!list.validate_exists("gpt-5"));
        assert!(list.ignored().contains("gpt-5"));
    }

    #[test]
    fn reconcile_updates_changed_properties_and_dedupes() {
        let mut stale = entry("gpt-5", "openai");
        stale.input_cost = 1;
        let list = ModelList::new(vec![stale.clone(), stale], HashSet::new());

        let fresh = entry("gpt-5", "openai");
        list.reconcile_with_defaults(&[fresh.clone()]);

        let all = list.list();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].input_cost, fresh.input_cost);
    }
}
