use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::json;
use crate::paths::ProjectPaths;

fn default_base_branch() -> String {
    "origin/main".to_string()
}

/// `<project>/.jrdev/git_config.json` (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    #[serde(default = "default_base_branch")]
    pub base_branch: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            base_branch: default_base_branch(),
        }
    }
}

impl GitConfig {
    pub fn load(paths: &ProjectPaths) -> Result<Self> {
        Ok(json::read_json(&paths.git_config())?.unwrap_or_default())
    }

    pub fn save(&self, paths: &ProjectPaths) -> Result<()> {
        json::write_json(&paths.git_config(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_defaults_to_origin_main() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ProjectPaths::resolve(dir.path()).unwrap();
        let config = GitConfig::load(&paths).unwrap();
        assert_eq!(config.base_branch, "origin/main");
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ProjectPaths::resolve(dir.path()).unwrap();
        let config = GitConfig {
            base_branch: "origin/develop".to_string(),
        };
        config.save(&paths).unwrap();

        let loaded = GitConfig::load(&paths).unwrap();
        assert_eq!(loaded.base_branch, "origin/develop");
    }
}
