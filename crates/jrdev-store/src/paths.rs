use std::path::{Path, PathBuf};

use crate::error::Result;

/// Paths under `~/.jrdev` (spec.md §6).
pub struct UserPaths {
    root: PathBuf,
}

impl UserPaths {
    pub fn resolve() -> Result<Self> {
        Ok(Self {
            root: jrdev_app::ensure_user_dir()?,
        })
    }

    pub fn model_profiles(&self) -> PathBuf {
        self.root.join("model_profiles.json")
    }

    pub fn user_model_config(&self) -> PathBuf {
        self.root.join("user_model_config.json")
    }
}

/// Paths under `<project>/.jrdev` (spec.md §6).
pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    pub fn resolve(project_root: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            root: jrdev_app::ensure_project_dir(project_root)?,
        })
    }

    pub fn thread(&self, id: &str) -> PathBuf {
        self.root.join("threads").join(format!("{id}.json"))
    }

    pub fn threads_dir(&self) -> PathBuf {
        self.root.join("threads")
    }

    pub fn file_index(&self) -> PathBuf {
        self.root.join("contexts").join("file_index.json")
    }

    pub fn git_config(&self) -> PathBuf {
        self.root.join("git_config.json")
    }

    pub fn project_context_state(&self) -> PathBuf {
        self.root.join("project_context.json")
    }

    pub fn filetree(&self) -> PathBuf {
        self.root.join("jrdev_filetree.txt")
    }

    pub fn overview(&self) -> PathBuf {
        self.root.join("jrdev_overview.md")
    }

    pub fn conventions(&self) -> PathBuf {
        self.root.join("jrdev_conventions.md")
    }

    pub fn context_summary(&self, name: &str) -> PathBuf {
        self.root.join("contexts").join(format!("{name}.md"))
    }
}
