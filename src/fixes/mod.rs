//! Rule-based fixes
//!
//! Deterministic fixes that work without an AI backend: single-line
//! replacement inside a project file and canned fixes for a few rule codes.

use crate::models::Issue;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FixError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to rewrite {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A generated fix for one issue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixSuggestion {
    /// Full code with the fix applied
    pub fix: String,
    pub explanation: String,
}

/// Replace the 1-based `line` of `content` with `replacement`.
///
/// Lines outside the file leave it unchanged. A trailing newline, and a
/// `\r\n` ending on the replaced line, survive the edit.
pub fn replace_line(content: &str, line: u32, replacement: &str) -> String {
    if content.is_empty() {
        return String::new();
    }
    let mut lines: Vec<&str> = content.split('\n').collect();
    let trailing_newline = content.ends_with('\n');
    if trailing_newline {
        lines.pop();
    }

    let Some(index) = (line as usize).checked_sub(1) else {
        return content.to_string();
    };
    if index >= lines.len() {
        return content.to_string();
    }

    let replacement = replacement.strip_suffix('\n').unwrap_or(replacement);
    let crlf = lines[index].ends_with('\r') && !replacement.ends_with('\r');
    let replaced = if crlf {
        format!("{}\r", replacement)
    } else {
        replacement.to_string()
    };

    let mut out = String::with_capacity(content.len() + replaced.len());
    for (i, original) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if i == index {
            out.push_str(&replaced);
        } else {
            out.push_str(original);
        }
    }
    if trailing_newline {
        out.push('\n');
    }
    out
}

/// Rewrite one line of the file at `path`, returning the new content
pub fn apply_line_fix(path: &Path, line: u32, replacement: &str) -> Result<String, FixError> {
    if !path.is_file() {
        return Err(FixError::NotFound(path.to_path_buf()));
    }
    let io_err = |source| FixError::Io {
        path: path.to_path_buf(),
        source,
    };

    let content = fs::read_to_string(path).map_err(io_err)?;
    let updated = replace_line(&content, line, replacement);
    if updated != content {
        fs::write(path, &updated).map_err(io_err)?;
        debug!("Applied fix to {}:{}", path.display(), line);
    }
    Ok(updated)
}

/// Generate a fix for `issue` in `code`
pub fn generate_fix(code: &str, issue: &Issue) -> FixSuggestion {
    match issue.code.as_str() {
        "D100" => FixSuggestion {
            fix: format!("\"\"\"Module docstring\"\"\"\n{}", code),
            explanation: "Added missing module docstring".to_string(),
        },
        _ => FixSuggestion {
            fix: code.to_string(),
            explanation: "No automatic fix available for this issue type".to_string(),
        },
    }
}
