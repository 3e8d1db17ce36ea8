//! Project context index (C11): file tree, overview, conventions, and
//! per-file summaries, with staleness tracked by content hash
//! (spec.md §4.9).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use jrdev_store::ProjectPaths;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEntry {
    pub summary_path: String,
    pub source_hash: String,
    pub last_indexed_at: DateTime<Utc>,
}

/// `path -> {summary_path, source_hash, last_indexed_at}` (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IndexFile {
    pub entries: BTreeMap<String, ContextEntry>,
}

pub struct ContextIndex {
    root: PathBuf,
    paths: ProjectPaths,
}

const IGNORED_DIRS: &[&str] = &[".git", "target", "node_modules", ".jrdev", "dist", "build"];

impl ContextIndex {
    pub fn new(root: PathBuf, paths: ProjectPaths) -> Self {
        Self { root, paths }
    }

    fn load_index(&self) -> Result<IndexFile, jrdev_store::Error> {
        Ok(jrdev_store::read_json(&self.paths.file_index())?.unwrap_or_default())
    }

    fn save_index(&self, index: &IndexFile) -> Result<(), jrdev_store::Error> {
        jrdev_store::write_json(&self.paths.file_index(), index)
    }

    /// All tracked file paths, relative to the project root.
    pub fn get_file_paths(&self) -> Vec<PathBuf> {
        let mut out = Vec::new();
        let mut stack = vec![self.root.clone()];
        while let Some(dir) = stack.pop() {
            let Ok(entries) = std::fs::read_dir(&dir) else { continue };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    if path
                        .file_name()
                        .map(|n| IGNORED_DIRS.contains(&n.to_string_lossy().as_ref()))
                        .unwrap_or(false)
                    {
                        continue;
                    }
                    stack.push(path);
                } else if let Ok(rel) = path.strip_prefix(&self.root) {
                    out.push(rel.to_path_buf());
                }
            }
        }
        out.sort();
        out
    }

    /// Paths whose current content hash differs from the index's recorded
    /// hash, or that aren't indexed at all (spec.md §3).
    pub fn get_outdated_files(&self) -> Result<Vec<PathBuf>, jrdev_store::Error> {
        let index = self.load_index()?;
        let mut outdated = Vec::new();
        for path in self.get_file_paths() {
            let key = path.to_string_lossy().into_owned();
            let Ok(content) = std::fs::read(self.root.join(&path)) else { continue };
            let hash = hash_bytes(&content);
            match index.entries.get(&key) {
                Some(entry) if entry.source_hash == hash => {}
                _ => outdated.push(path),
            }
        }
        Ok(outdated)
    }

    /// Record a freshly generated summary for `path` (SHA-256 of file
    /// bytes, per spec.md §9's open-question recommendation).
    pub fn record_summary(&self, path: &Path, summary: &str) -> Result<(), jrdev_store::Error> {
        let content = std::fs::read(self.root.join(path))?;
        let hash = hash_bytes(&content);
        let key = path.to_string_lossy().into_owned();
        let summary_name = key.replace(['/', '\\'], "_");

        std::fs::write(self.paths.context_summary(&summary_name), summary)?;

        let mut index = self.load_index()?;
        index.entries.insert(
            key,
            ContextEntry {
                summary_path: self.paths.context_summary(&summary_name).to_string_lossy().into_owned(),
                source_hash: hash,
                last_indexed_at: Utc::now(),
            },
        );
        self.save_index(&index)
    }

    pub fn read_filetree(&self) -> std::io::Result<String> {
        std::fs::read_to_string(self.paths.filetree())
    }

    pub fn read_overview(&self) -> std::io::Result<String> {
        std::fs::read_to_string(self.paths.overview())
    }

    pub fn read_conventions(&self) -> std::io::Result<String> {
        std::fs::read_to_string(self.paths.conventions())
    }

    pub fn write_filetree(&self) -> std::io::Result<String> {
        let tree = render_compact_tree(&self.root, &self.get_file_paths());
        std::fs::write(self.paths.filetree(), &tree)?;
        Ok(tree)
    }

    pub fn write_overview(&self, content: &str) -> std::io::Result<()> {
        std::fs::write(self.paths.overview(), content)
    }

    pub fn write_conventions(&self, content: &str) -> std::io::Result<()> {
        std::fs::write(self.paths.conventions(), content)
    }
}

fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Compact tree format (spec.md §6): `ROOT=<basename>` then
/// `<dir-path>:[file1,file2,…]`, root files under an empty dir-path.
pub fn render_compact_tree(root: &Path, paths: &[PathBuf]) -> String {
    let root_name = root.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let mut by_dir: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for path in paths {
        let dir = path.parent().map(|p| p.to_string_lossy().into_owned()).unwrap_or_default();
        let file = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        by_dir.entry(dir).or_default().push(file);
    }

    let mut out = format!("ROOT={root_name}\n");
    for (dir, mut files) in by_dir {
        files.sort();
        out.push_str(&format!("{dir}:[{}]\n", files.join(",")));
    }
    out
}

/// Parses the compact tree format back into a file path list.
pub fn parse_compact_tree(tree: &str) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for line in tree.lines().skip(1) {
        let Some((dir, rest)) = line.split_once(':') else { continue };
        let Some(list) = rest.strip_prefix('[').and_then(|s| s.strip_suffix(']')) else { continue };
        if list.is_empty() {
            continue;
        }
        for file in list.split(',') {
            out.push(if dir.is_empty() { PathBuf::from(file) } else { Path::new(dir).join(file) });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_tree_round_trips_file_set() {
        let root = Path::new("/tmp/myproject");
        let paths = vec![PathBuf::from("src/main.rs"), PathBuf::from("src/lib.rs"), PathBuf::from("README.md")];
        let tree = render_compact_tree(root, &paths);
        assert!(tree.starts_with("ROOT=myproject\n"));

        let mut recovered = parse_compact_tree(&tree);
        let mut expected = paths;
        recovered.sort();
        expected.sort();
        assert_eq!(recovered, expected);
    }

    #[test]
    fn hash_changes_when_content_changes() {
        let a = hash_bytes(b"hello");
        let b = hash_bytes(b"hello!");
        assert_ne!(a, b);
        assert_eq!(a, hash_bytes(b"hello"));
    }
}
