//! Field access for analyzer JSON records
//!
//! Normalizers pull typed fields out of `serde_json::Value` records through
//! these helpers so a malformed record reports exactly which field was wrong.

use serde_json::Value as JsonValue;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("missing field '{0}'")]
    Missing(&'static str),

    #[error("field '{field}' should be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
}

fn field<'a>(record: &'a JsonValue, name: &'static str) -> Result<&'a JsonValue, RecordError> {
    match record.get(name) {
        Some(JsonValue::Null) | None => Err(RecordError::Missing(name)),
        Some(value) => Ok(value),
    }
}

pub fn str_field<'a>(record: &'a JsonValue, name: &'static str) -> Result<&'a str, RecordError> {
    field(record, name)?
        .as_str()
        .ok_or(RecordError::WrongType {
            field: name,
            expected: "a string",
        })
}

pub fn u32_field(record: &JsonValue, name: &'static str) -> Result<u32, RecordError> {
    field(record, name)?
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or(RecordError::WrongType {
            field: name,
            expected: "a non-negative integer",
        })
}

pub fn opt_str_field(record: &JsonValue, name: &str) -> Option<String> {
    record
        .get(name)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Express a tool-reported path relative to the project root.
///
/// Absolute paths under the root are stripped; relative paths are cleaned of
/// a leading `./`. Anything else comes back unchanged.
pub fn relative_path(raw: &str, project_root: &Path) -> String {
    let path = Path::new(raw);

    if path.is_absolute() {
        if let Ok(rel) = path.strip_prefix(project_root) {
            return to_slash(rel);
        }
        // Tools may report the resolved form of the root (e.g. /private/tmp on macOS)
        if let Ok(canonical_root) = project_root.canonicalize() {
            if let Ok(rel) = path.strip_prefix(&canonical_root) {
                return to_slash(rel);
            }
        }
        return raw.to_string();
    }

    let cleaned: PathBuf = path
        .components()
        .skip_while(|c| matches!(c, Component::CurDir))
        .collect();
    if cleaned.as_os_str().is_empty() {
        return raw.to_string();
    }
    to_slash(&cleaned)
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
