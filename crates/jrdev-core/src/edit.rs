//! Applies structured [`FileChange`] batches to the working tree
//! (spec.md §4.1).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use similar::TextDiff;

use crate::confirm::{ConfirmChoice, Confirmer};
use crate::file_change::{
    AfterLine, FileChange, GlobalPosition, IndentationHint, InsertLocation, PositionMarker,
};
use crate::lang::{self, FunctionSpan};
use crate::lines::{content_lines, FileLines};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyStatus {
    Accepted,
    Rejected,
    Cancelled,
}

#[derive(Debug, Clone, Default)]
pub struct ApplyResult {
    pub status: Option<ApplyStatus>,
    pub files_changed: Vec<String>,
    pub rejection_reason: Option<String>,
    pub warnings: Vec<String>,
}

/// Session-wide "accept all subsequent diffs" flag. Lives on the code
/// agent instance, not as class-level shared state (spec.md §9).
#[derive(Debug, Default)]
pub struct AcceptAllState {
    pub active: bool,
}

/// Apply a batch of `changes` under `cwd`, prompting `confirmer` for each
/// file's diff (and each `NEW`/`RENAME`). Returns as soon as any file's
/// confirmation is rejected or cancelled (aborts only the remaining batch
/// for files not yet processed; files already written stay written, per
/// spec.md §5's cancellation semantics).
pub async fn apply(
    changes: Vec<FileChange>,
    cwd: &Path,
    confirmer: &dyn Confirmer,
    accept_all: &mut AcceptAllState,
) -> ApplyResult {
    let mut result = ApplyResult::default();

    let mut news = Vec::new();
    let mut renames = Vec::new();
    let mut grouped: BTreeMap<String, Vec<FileChange>> = BTreeMap::new();

    for change in changes {
        match change {
            FileChange::New { .. } => news.push(change),
            FileChange::Rename { .. } => renames.push(change),
            other => grouped.entry(other.filename().to_string()).or_default().push(other),
        }
    }

    for rename in renames {
        let FileChange::Rename { filename, new_filename } = rename else { unreachable!() };
        let Some(from) = resolve_existing(cwd, &filename) else {
            result.warnings.push(format!("{filename}: not found, skipping rename"));
            continue;
        };
        let to = cwd.join(&new_filename);
        if !confirm_simple(confirmer, accept_all, &format!("Rename {filename} -> {new_filename}")).await {
            result.status = Some(ApplyStatus::Rejected);
            return result;
        }
        if let Some(parent) = to.parent() {
            if tokio::fs::create_dir_all(parent).await.is_err() {
                result.warnings.push(format!("{new_filename}: failed to create parent directory"));
                continue;
            }
        }
        if tokio::fs::rename(&from, &to).await.is_ok() {
            result.files_changed.push(new_filename);
        } else {
            result.warnings.push(format!("{filename}: rename failed"));
        }
    }

    for filename in grouped.keys().cloned().collect::<Vec<_>>() {
        let file_changes = grouped.remove(&filename).unwrap();
        match apply_to_file(&filename, file_changes, cwd, confirmer, accept_all).await {
            FileOutcome::Written => result.files_changed.push(filename),
            FileOutcome::Unchanged => {}
            FileOutcome::Skipped(reason) => result.warnings.push(reason),
            FileOutcome::Rejected => {
                result.status = Some(ApplyStatus::Rejected);
                return result;
            }
            FileOutcome::RejectedWithFeedback(message) => {
                result.status = Some(ApplyStatus::Rejected);
                result.rejection_reason = Some(message);
                return result;
            }
        }
    }

    for new_change in news {
        let FileChange::New { filename, new_content } = new_change else { unreachable!() };
        let path = cwd.join(&filename);
        if let Some(parent) = path.parent() {
            if tokio::fs::create_dir_all(parent).await.is_err() {
                result.warnings.push(format!("{filename}: failed to create parent directory"));
                continue;
            }
        }
        let diff_lines: Vec<String> = new_content.lines().map(|l| format!("+{l}")).collect();
        match confirm_for_diff(confirmer, accept_all, &format!("Create {filename}"), &diff_lines).await {
            Outcome::Accept(content) => {
                let content = content.unwrap_or(new_content);
                if tokio::fs::write(&path, content).await.is_ok() {
                    result.files_changed.push(filename);
                } else {
                    result.warnings.push(format!("{filename}: write failed"));
                }
            }
            Outcome::Reject => {
                result.status = Some(ApplyStatus::Rejected);
                return result;
            }
            Outcome::RejectWithFeedback(message) => {
                result.status = Some(ApplyStatus::Rejected);
                result.rejection_reason = Some(message);
                return result;
            }
        }
    }

    result.status = Some(ApplyStatus::Accepted);
    result
}

enum FileOutcome {
    Written,
    Unchanged,
    Skipped(String),
    Rejected,
    RejectedWithFeedback(String),
}

async fn apply_to_file(
    filename: &str,
    changes: Vec<FileChange>,
    cwd: &Path,
    confirmer: &dyn Confirmer,
    accept_all: &mut AcceptAllState,
) -> FileOutcome {
    let Some(path) = resolve_existing(cwd, filename) else {
        return FileOutcome::Skipped(format!("{filename}: file not found (fuzzy resolution failed)"));
    };

    let original = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) => return FileOutcome::Skipped(format!("{filename}: {e}")),
    };
    let mut file = FileLines::parse(&original);

    let mut add_delete: Vec<FileChange> = Vec::new();
    let mut inserts: Vec<FileChange> = Vec::new();
    let mut replaces: Vec<FileChange> = Vec::new();
    for change in changes {
        match change {
            FileChange::Add { .. } | FileChange::Delete { .. } => add_delete.push(change),
            FileChange::Insert { .. } => inserts.push(change),
            FileChange::Replace { .. } => replaces.push(change),
            _ => {}
        }
    }

    add_delete.sort_by_key(|c| std::cmp::Reverse(start_line_of(c)));
    for change in add_delete {
        apply_add_delete(&mut file, &change);
    }

    let handler = lang::handler_for(filename);
    for change in inserts {
        if let FileChange::Insert { insert_location, new_content, indentation_hint, .. } = change {
            apply_insert(&mut file, handler.as_ref(), &insert_location, &new_content, indentation_hint);
        }
    }

    for change in replaces {
        if let FileChange::Replace { anchor, new_content, .. } = change {
            apply_replace(&mut file, &anchor, &new_content);
        }
    }

    let rendered = file.render();
    if rendered == original {
        return FileOutcome::Unchanged;
    }

    let diff = TextDiff::from_lines(&original, &rendered);
    let diff_lines: Vec<String> = diff
        .unified_diff()
        .context_radius(3)
        .header(filename, filename)
        .to_string()
        .lines()
        .map(str::to_string)
        .collect();

    match confirm_for_diff(confirmer, accept_all, &format!("Apply changes to {filename}"), &diff_lines).await {
        Outcome::Accept(edited) => {
            let content = edited.unwrap_or(rendered);
            match tokio::fs::write(&path, content).await {
                Ok(()) => FileOutcome::Written,
                Err(e) => FileOutcome::Skipped(format!("{filename}: {e}")),
            }
        }
        Outcome::Reject => FileOutcome::Rejected,
        Outcome::RejectWithFeedback(message) => FileOutcome::RejectedWithFeedback(message),
    }
}

fn start_line_of(change: &FileChange) -> usize {
    match change {
        FileChange::Add { start_line, .. } | FileChange::Delete { start_line, .. } => *start_line,
        _ => 0,
    }
}

fn apply_add_delete(file: &mut FileLines, change: &FileChange) {
    match change {
        FileChange::Add { start_line, new_content, .. } => {
            let idx = start_line.saturating_sub(1).min(file.lines.len());
            let new_lines = content_lines(new_content);
            file.lines.splice(idx..idx, new_lines);
        }
        FileChange::Delete { start_line, end_line, .. } => {
            let start = start_line.saturating_sub(1).min(file.lines.len());
            let end = (*end_line).min(file.lines.len());
            if start < end {
                file.lines.splice(start..end, std::iter::empty());
            }
        }
        _ => {}
    }
}

fn apply_replace(file: &mut FileLines, anchor: &str, new_content: &str) {
    let joined = file.lines.join("\n");
    let Some(byte_start) = joined.find(anchor) else {
        return; // AnchorResolutionFailure: warn, leave file unchanged (spec.md §7).
    };
    let byte_end = byte_start + anchor.len();
    let line_start = joined[..byte_start].matches('\n').count();
    let line_end = joined[..byte_end].matches('\n').count();

    let new_lines = content_lines(new_content);
    file.lines.splice(line_start..=line_end, new_lines);
}

fn apply_insert(
    file: &mut FileLines,
    handler: &dyn lang::LanguageHandler,
    location: &InsertLocation,
    new_content: &str,
    indentation_hint: Option<IndentationHint>,
) {
    let target_idx = match location {
        InsertLocation::AfterFunction { after_function } => {
            let spans = handler.parse_functions(&file.lines);
            let (class, name) = handler.parse_signature(after_function);
            match lang::best_match(&spans, class.as_deref(), &name) {
                Some(span) => Some(span.end_line + 1),
                None => None, // AnchorResolutionFailure.
            }
        }
        InsertLocation::WithinFunction { within_function, position_marker } => {
            let spans = handler.parse_functions(&file.lines);
            let (class, name) = handler.parse_signature(within_function);
            lang::best_match(&spans, class.as_deref(), &name)
                .and_then(|span| resolve_within_function(file, span, position_marker, handler.open_brace_char()))
        }
        InsertLocation::AfterMarker { after_marker } => file
            .lines
            .iter()
            .position(|line| line.trim().contains(after_marker.as_str()))
            .map(|idx| idx + 1),
        InsertLocation::Global { global } => Some(resolve_global(file, *global)),
    };

    let Some(mut idx) = target_idx else { return };
    idx = idx.min(file.lines.len());

    let mut new_lines = content_lines(new_content);
    if new_lines.iter().all(|l| l.trim().is_empty()) {
        // Collapse to exactly that many blank lines after the anchor,
        // without compounding any blank lines already there.
        while idx < file.lines.len() && file.lines[idx].trim().is_empty() {
            file.lines.remove(idx);
        }
    } else if let Some(hint) = indentation_hint {
        apply_indentation_hint(file, idx, &mut new_lines, hint);
    }

    let leading_blank = if !matches!(location, InsertLocation::Global { global: GlobalPosition::Start }) {
        vec![String::new()]
    } else {
        Vec::new()
    };
    let trailing_blank =
        if matches!(location, InsertLocation::Global { global: GlobalPosition::End }) {
            vec![String::new()]
        } else {
            Vec::new()
        };

    let mut insertion = leading_blank;
    insertion.extend(new_lines);
    insertion.extend(trailing_blank);
    file.lines.splice(idx..idx, insertion);
}

fn apply_indentation_hint(
    file: &FileLines,
    anchor_idx: usize,
    new_lines: &mut [String],
    hint: IndentationHint,
) {
    let anchor_indent = file
        .lines
        .get(anchor_idx.saturating_sub(1))
        .map(|l| l.chars().take_while(|c| *c == ' ').count())
        .unwrap_or(0);
    let Some(first) = new_lines.first() else { return };
    let first_indent = first.chars().take_while(|c| *c == ' ').count();

    let adjusted = match hint {
        IndentationHint::MaintainIndent => anchor_indent,
        IndentationHint::IncreaseIndent => anchor_indent + 4,
        IndentationHint::DecreaseIndent => anchor_indent.saturating_sub(4),
    };
    let delta = adjusted as i64 - first_indent as i64;
    if delta == 0 {
        return;
    }
    for line in new_lines.iter_mut() {
        let indent = line.chars().take_while(|c| *c == ' ').count();
        let new_indent = (indent as i64 + delta).max(0) as usize;
        *line = format!("{}{}", " ".repeat(new_indent), line.trim_start_matches(' '));
    }
}

fn resolve_within_function(
    file: &FileLines,
    span: &FunctionSpan,
    marker: &PositionMarker,
    open_brace: Option<char>,
) -> Option<usize> {
    match marker {
        PositionMarker::AtStart => {
            if let Some(brace) = open_brace {
                (span.start_line..=span.end_line)
                    .find(|&i| file.lines[i].contains(brace))
                    .map(|i| i + 1)
            } else {
                Some(span.start_line + 1)
            }
        }
        PositionMarker::BeforeReturn => (span.start_line..=span.end_line)
            .rev()
            .find(|&i| file.lines[i].trim_start().starts_with("return"))
            .or(Some(span.start_line)),
        PositionMarker::AfterLine(AfterLine::Index(n)) => {
            let idx = span.start_line + (*n).max(0) as usize;
            Some(idx.min(span.end_line) + 1)
        }
        PositionMarker::AfterLine(AfterLine::Text(text)) => (span.start_line..=span.end_line)
            .find(|&i| file.lines[i].contains(text.as_str()))
            .map(|i| i + 1),
    }
}

fn resolve_global(file: &FileLines, position: GlobalPosition) -> usize {
    match position {
        GlobalPosition::End => file.lines.len(),
        GlobalPosition::Start => {
            let mut idx = 0;
            if file.lines.first().is_some_and(|l| l.starts_with("#!")) {
                idx += 1;
            }
            if file.lines.get(idx).is_some_and(|l| {
                let t = l.trim_start();
                t.starts_with("\"\"\"") || t.starts_with("'''")
            }) {
                idx += 1;
                while idx < file.lines.len()
                    && !(file.lines[idx].trim_end().ends_with("\"\"\"")
                        || file.lines[idx].trim_end().ends_with("'''"))
                {
                    idx += 1;
                }
                idx += 1;
            }
            while idx < file.lines.len() {
                let trimmed = file.lines[idx].trim();
                let is_header = trimmed.is_empty()
                    || trimmed.starts_with("import ")
                    || trimmed.starts_with("from ")
                    || trimmed.starts_with("use ")
                    || trimmed.starts_with("#include")
                    || trimmed.starts_with("//")
                    || trimmed.starts_with('#');
                if is_header {
                    idx += 1;
                } else {
                    break;
                }
            }
            idx
        }
    }
}

enum Outcome {
    Accept(Option<String>),
    Reject,
    RejectWithFeedback(String),
}

async fn confirm_for_diff(
    confirmer: &dyn Confirmer,
    accept_all: &mut AcceptAllState,
    prompt: &str,
    diff_lines: &[String],
) -> Outcome {
    if accept_all.active {
        return Outcome::Accept(None);
    }
    let response = confirmer.confirm(prompt, diff_lines).await;
    match response.choice {
        Some(ConfirmChoice::Yes) => Outcome::Accept(None),
        Some(ConfirmChoice::AcceptAll) => {
            accept_all.active = true;
            Outcome::Accept(None)
        }
        Some(ConfirmChoice::Edit) => Outcome::Accept(response.edited_content.map(|lines| lines.join("\n"))),
        Some(ConfirmChoice::RequestChange) => {
            Outcome::RejectWithFeedback(response.message.unwrap_or_default())
        }
        Some(ConfirmChoice::No) | None => Outcome::Reject,
    }
}

async fn confirm_simple(confirmer: &dyn Confirmer, accept_all: &mut AcceptAllState, prompt: &str) -> bool {
    matches!(confirm_for_diff(confirmer, accept_all, prompt, &[]).await, Outcome::Accept(_))
}

/// Resolve a possibly-stale path by fuzzy basename/extension matching
/// under `cwd` (spec.md §4.1 step 2).
fn resolve_existing(cwd: &Path, filename: &str) -> Option<PathBuf> {
    let direct = cwd.join(filename);
    if direct.exists() {
        return Some(direct);
    }

    let candidates = walk_files(cwd);
    let basename = Path::new(filename).file_name()?.to_string_lossy().into_owned();
    let declared_dir = Path::new(filename).parent().map(|p| p.to_string_lossy().into_owned()).unwrap_or_default();

    // (a) exact basename match anywhere, preferring the most similar directory.
    let exact: Vec<&PathBuf> = candidates
        .iter()
        .filter(|p| p.file_name().map(|n| n.to_string_lossy() == basename).unwrap_or(false))
        .collect();
    if !exact.is_empty() {
        let best = exact.into_iter().max_by(|a, b| {
            dir_similarity(a, cwd, &declared_dir)
                .partial_cmp(&dir_similarity(b, cwd, &declared_dir))
                .unwrap()
        });
        if let Some(path) = best {
            return Some(path.clone());
        }
    }

    // (b) fuzzy basename match within the declared directory.
    let declared_abs = cwd.join(&declared_dir);
    let in_dir: Vec<&PathBuf> = candidates
        .iter()
        .filter(|p| p.parent() == Some(declared_abs.as_path()))
        .collect();
    if let Some(best) = best_fuzzy_match(&in_dir, &basename, 0.6) {
        return Some(best.clone());
    }

    // (c) same extension anywhere under cwd.
    let ext = Path::new(filename).extension().map(|e| e.to_string_lossy().into_owned());
    if let Some(ext) = ext {
        let same_ext: Vec<&PathBuf> = candidates
            .iter()
            .filter(|p| p.extension().map(|e| e.to_string_lossy() == ext).unwrap_or(false))
            .collect();
        if let Some(best) = best_fuzzy_match(&same_ext, &basename, 0.5) {
            return Some(best.clone());
        }
    }

    None
}

fn dir_similarity(path: &Path, cwd: &Path, declared_dir: &str) -> f64 {
    let parent = path.strip_prefix(cwd).ok().and_then(|p| p.parent()).map(|p| p.to_string_lossy().into_owned()).unwrap_or_default();
    strsim::normalized_levenshtein(&parent, declared_dir)
}

fn best_fuzzy_match<'a>(candidates: &[&'a PathBuf], basename: &str, threshold: f64) -> Option<&'a PathBuf> {
    candidates
        .iter()
        .map(|p| {
            let name = p.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            (strsim::normalized_levenshtein(&name, basename), *p)
        })
        .filter(|(score, _)| *score >= threshold)
        .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap())
        .map(|(_, p)| p)
}

const IGNORED_DIRS: &[&str] = &[".git", "target", "node_modules", ".jrdev"];

fn walk_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else { continue };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                if path.file_name().map(|n| IGNORED_DIRS.contains(&n.to_string_lossy().as_ref())).unwrap_or(false) {
                    continue;
                }
                stack.push(path);
            } else {
                out.push(path);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Step;

    struct AlwaysYes;

    #[async_trait::async_trait]
    impl Confirmer for AlwaysYes {
        async fn confirm(&self, _prompt: &str, _diff_lines: &[String]) -> crate::confirm::ConfirmResponse {
            crate::confirm::ConfirmResponse { choice: Some(ConfirmChoice::Yes), ..Default::default() }
        }
        async fn confirm_plan(&self, _steps: &[Step]) -> crate::confirm::PlanResponse {
            crate::confirm::PlanResponse::default()
        }
        async fn confirm_command(&self, _command: &str) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn after_function_insert_places_new_function_after_closing_brace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.cpp");
        tokio::fs::write(&path, "void ClassA::foo() {\n    return;\n}\n").await.unwrap();

        let change = FileChange::Insert {
            filename: "f.cpp".to_string(),
            insert_location: InsertLocation::AfterFunction { after_function: "ClassA::foo".to_string() },
            new_content: "void ClassA::bar(){}".to_string(),
            indentation_hint: None,
        };

        let mut accept_all = AcceptAllState::default();
        let result = apply(vec![change], dir.path(), &AlwaysYes, &mut accept_all).await;
        assert_eq!(result.status, Some(ApplyStatus::Accepted));
        assert_eq!(result.files_changed, vec!["f.cpp".to_string()]);

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(written, "void ClassA::foo() {\n    return;\n}\n\nvoid ClassA::bar(){}\n");
    }

    #[tokio::test]
    async fn add_changes_line_count_matches_invariant() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        tokio::fs::write(&path, "one\ntwo\nthree\n").await.unwrap();

        let change = FileChange::Add {
            filename: "a.txt".to_string(),
            start_line: 2,
            new_content: "inserted_a\ninserted_b".to_string(),
            sub_type: None,
        };
        let mut accept_all = AcceptAllState::default();
        apply(vec![change], dir.path(), &AlwaysYes, &mut accept_all).await;

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(written.lines().count(), 5);
    }

    #[tokio::test]
    async fn unresolvable_anchor_leaves_file_unmodified() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        tokio::fs::write(&path, "one\ntwo\n").await.unwrap();

        let change = FileChange::Replace {
            filename: "a.txt".to_string(),
            anchor: "does not exist".to_string(),
            new_content: "replaced".to_string(),
        };
        let mut accept_all = AcceptAllState::default();
        let result = apply(vec![change], dir.path(), &AlwaysYes, &mut accept_all).await;
        assert!(result.files_changed.is_empty());

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(written, "one\ntwo\n");
    }
}
