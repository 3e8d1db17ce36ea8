use std::path::{Path, PathBuf};

use directories::BaseDirs;

const USER_DIR_NAME: &str = ".jrdev";
const PROJECT_DIR_NAME: &str = ".jrdev";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not resolve the user home directory")]
    MissingHomeDir,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// The user-global state directory, `~/.jrdev` (spec.md §6).
pub fn user_dir() -> Result<PathBuf> {
    let dirs = BaseDirs::new().ok_or(Error::MissingHomeDir)?;
    Ok(dirs.home_dir().join(USER_DIR_NAME))
}

pub fn ensure_user_dir() -> Result<PathBuf> {
    let dir = user_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// The per-project state directory, `<project>/.jrdev` (spec.md §6).
pub fn project_dir(project_root: impl AsRef<Path>) -> PathBuf {
    project_root.as_ref().join(PROJECT_DIR_NAME)
}

pub fn ensure_project_dir(project_root: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = project_dir(project_root);
    std::fs::create_dir_all(&dir)?;
    std::fs::create_dir_all(dir.join("contexts"))?;
    std::fs::create_dir_all(dir.join("threads"))?;
    Ok(dir)
}

/// Appends a `.jrdev*` ignore pattern to `<project>/.gitignore` if absent
/// (spec.md §6).
pub fn ensure_gitignore_entry(project_root: impl AsRef<Path>) -> Result<()> {
    let path = project_root.as_ref().join(".gitignore");
    let existing = std::fs::read_to_string(&path).unwrap_or_default();
    if existing.lines().any(|line| line.trim() == ".jrdev*") {
        return Ok(());
    }
    let mut contents = existing;
    if !contents.is_empty() && !contents.ends_with('\n') {
        contents.push('\n');
    }
    contents.push_str(".jrdev*\n");
    std::fs::write(path, contents)?;
    Ok(())
}
