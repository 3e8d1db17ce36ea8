//! Generic JSON-file persistence (spec.md §6's file-format list).
//!
//! `jrdev-store` knows the *paths* these files live at but not the domain
//! types stored in them — `ModelEntry`, `ProfileManager`, `Thread`, and
//! friends live in `jrdev-registry`/`jrdev-core`, which would make a direct
//! dependency from here circular. Callers supply the type at each call site.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;

/// Reads and deserializes `path`, returning `Ok(None)` if it doesn't exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Serializes `value` as pretty JSON and writes it to `path`, creating the
/// parent directory if needed.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(value)?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Widget {
        name: String,
        count: u32,
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        let result: Option<Widget> = read_json(&path).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn write_then_read_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("widget.json");
        let widget = Widget {
            name: "gear".into(),
            count: 3,
        };
        write_json(&path, &widget).unwrap();

        let loaded: Option<Widget> = read_json(&path).unwrap();
        assert_eq!(loaded, Some(widget));
    }
}
