//! The structured edit envelope C2 applies (spec.md §3, §4.1).

use serde::{Deserialize, Serialize};

/// Sub-classification of an `ADD` change; informational only, does not
/// affect placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AddSubType {
    Function,
    Class,
    Import,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndentationHint {
    MaintainIndent,
    IncreaseIndent,
    DecreaseIndent,
}

/// Where within a function body an insert lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionMarker {
    AtStart,
    BeforeReturn,
    AfterLine(AfterLine),
}

impl Serialize for PositionMarker {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        #[derive(Serialize)]
        struct AfterLineWrapper<'a> {
            after_line: &'a AfterLine,
        }
        match self {
            PositionMarker::AtStart => serializer.serialize_str("at_start"),
            PositionMarker::BeforeReturn => serializer.serialize_str("before_return"),
            PositionMarker::AfterLine(after_line) => {
                AfterLineWrapper { after_line }.serialize(serializer)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AfterLine {
    Index(i64),
    Text(String),
}

impl<'de> Deserialize<'de> for PositionMarker {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Tagged(String),
            AfterLine { after_line: AfterLine },
        }
        match Raw::deserialize(deserializer)? {
            Raw::Tagged(s) if s == "at_start" => Ok(PositionMarker::AtStart),
            Raw::Tagged(s) if s == "before_return" => Ok(PositionMarker::BeforeReturn),
            Raw::Tagged(other) => Err(serde::de::Error::custom(format!(
                "unknown position_marker `{other}`"
            ))),
            Raw::AfterLine { after_line } => Ok(PositionMarker::AfterLine(after_line)),
        }
    }
}

/// `"start"` / `"end"` / `true` (treated as `"end"`, matching the source's
/// loose typing).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalPosition {
    Start,
    End,
}

impl<'de> Deserialize<'de> for GlobalPosition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            Bool(bool),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Str(s) if s == "start" => Ok(GlobalPosition::Start),
            Raw::Str(s) if s == "end" => Ok(GlobalPosition::End),
            Raw::Str(other) => Err(serde::de::Error::custom(format!(
                "unknown global position `{other}`"
            ))),
            Raw::Bool(_) => Ok(GlobalPosition::End),
        }
    }
}

impl Serialize for GlobalPosition {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            GlobalPosition::Start => serializer.serialize_str("start"),
            GlobalPosition::End => serializer.serialize_str("end"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertLocation {
    AfterFunction {
        after_function: String,
    },
    WithinFunction {
        within_function: String,
        position_marker: PositionMarker,
    },
    AfterMarker {
        after_marker: String,
    },
    Global {
        global: GlobalPosition,
    },
}

/// Parse-time rejections for change envelopes that look plausible but are
/// not something C2 will apply.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown operation `{0}`")]
    UnknownOperation(String),
    #[error("`insert_after_line` is a deprecated locator; use insert_location instead")]
    DeprecatedOperation,
}

/// One structured edit, as produced by the LLM and consumed by C2.
///
/// Unknown `operation` values are rejected at parse time rather than
/// coerced — in particular `MODIFY` and `RENAME`-via-REPLACE aliases some
/// source generations emit must fail loudly. The deprecated `insert_after_line`
/// locator is rejected the same way rather than silently ignored.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "operation")]
pub enum FileChange {
    #[serde(rename = "NEW")]
    New { filename: String, new_content: String },

    #[serde(rename = "DELETE")]
    Delete {
        filename: String,
        start_line: usize,
        end_line: usize,
    },

    #[serde(rename = "ADD")]
    Add {
        filename: String,
        start_line: usize,
        new_content: String,
        #[serde(default)]
        sub_type: Option<AddSubType>,
    },

    #[serde(rename = "REPLACE")]
    Replace {
        filename: String,
        anchor: String,
        new_content: String,
    },

    #[serde(rename = "INSERT")]
    Insert {
        filename: String,
        #[serde(flatten)]
        insert_location: InsertLocation,
        new_content: String,
        #[serde(default)]
        indentation_hint: Option<IndentationHint>,
    },

    /// Implements the source's unimplemented `RENAME` operation as a
    /// confirmed filesystem move (spec.md §9 open question).
    #[serde(rename = "RENAME")]
    Rename { filename: String, new_filename: String },
}

impl<'de> Deserialize<'de> for FileChange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(tag = "operation")]
        enum Repr {
            #[serde(rename = "NEW")]
            New { filename: String, new_content: String },
            #[serde(rename = "DELETE")]
            Delete {
                filename: String,
                start_line: usize,
                end_line: usize,
            },
            #[serde(rename = "ADD")]
            Add {
                filename: String,
                start_line: usize,
                new_content: String,
                #[serde(default)]
                sub_type: Option<AddSubType>,
            },
            #[serde(rename = "REPLACE")]
            Replace {
                filename: String,
                anchor: String,
                new_content: String,
            },
            #[serde(rename = "INSERT")]
            Insert {
                filename: String,
                #[serde(flatten)]
                insert_location: InsertLocation,
                new_content: String,
                #[serde(default)]
                indentation_hint: Option<IndentationHint>,
            },
            #[serde(rename = "RENAME")]
            Rename { filename: String, new_filename: String },
        }

        let value = serde_json::Value::deserialize(deserializer)?;
        if let Some(obj) = value.as_object() {
            if obj.contains_key("insert_after_line") {
                return Err(serde::de::Error::custom(Error::DeprecatedOperation));
            }
            if let Some(op) = obj.get("operation").and_then(|v| v.as_str()) {
                if op == "MODIFY" {
                    return Err(serde::de::Error::custom(Error::UnknownOperation(op.to_string())));
                }
            }
        }

        let repr: Repr = serde_json::from_value(value).map_err(serde::de::Error::custom)?;
        Ok(match repr {
            Repr::New { filename, new_content } => FileChange::New { filename, new_content },
            Repr::Delete { filename, start_line, end_line } => {
                FileChange::Delete { filename, start_line, end_line }
            }
            Repr::Add { filename, start_line, new_content, sub_type } => {
                FileChange::Add { filename, start_line, new_content, sub_type }
            }
            Repr::Replace { filename, anchor, new_content } => {
                FileChange::Replace { filename, anchor, new_content }
            }
            Repr::Insert { filename, insert_location, new_content, indentation_hint } => {
                FileChange::Insert { filename, insert_location, new_content, indentation_hint }
            }
            Repr::Rename { filename, new_filename } => FileChange::Rename { filename, new_filename },
        })
    }
}

impl FileChange {
    pub fn filename(&self) -> &str {
        match self {
            FileChange::New { filename, .. }
            | FileChange::Delete { filename, .. }
            | FileChange::Add { filename, .. }
            | FileChange::Replace { filename, .. }
            | FileChange::Insert { filename, .. }
            | FileChange::Rename { filename, .. } => filename,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, FileChange::New { .. })
    }
}

/// Batch of changes to apply together, per spec.md §4.1's public contract.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChangeSet {
    pub changes: Vec<FileChange>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_new_change() {
        let change: FileChange =
            serde_json::from_str(r#"{"operation": "NEW", "filename": "a.rs", "new_content": "fn a() {}"}"#).unwrap();
        assert!(change.is_new());
        assert_eq!(change.filename(), "a.rs");
    }

    #[test]
    fn rejects_modify_as_unknown_operation() {
        let result: Result<FileChange, _> =
            serde_json::from_str(r#"{"operation": "MODIFY", "filename": "a.rs", "new_content": "x"}"#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown operation `MODIFY`"), "{err}");
    }

    #[test]
    fn rejects_deprecated_insert_after_line() {
        let result: Result<FileChange, _> = serde_json::from_str(
            r#"{"operation": "INSERT", "filename": "a.rs", "insert_after_line": 3, "new_content": "x"}"#,
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("deprecated"), "{err}");
    }
}
