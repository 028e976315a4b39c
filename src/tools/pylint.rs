//! Pylint output normalizer
//!
//! Pylint is the deeper linter used for everything that is not a web project.

use crate::models::{Category, Issue, ToolKind};
use crate::tools::record::{relative_path, str_field, u32_field, RecordError};
use serde_json::Value as JsonValue;
use std::path::Path;
use tracing::{error, warn};

/// Build the pylint argv for `target`
pub fn command(program: &str, rcfile: &Path, target: &Path) -> Vec<String> {
    vec![
        program.to_string(),
        format!("--rcfile={}", rcfile.to_string_lossy()),
        "--output-format=json".to_string(),
        "--recursive=y".to_string(),
        target.to_string_lossy().to_string(),
    ]
}

/// Map pylint's message `type` onto a category
fn map_category(message_type: &str) -> Category {
    match message_type.to_lowercase().as_str() {
        "fatal" | "error" => Category::Error,
        "warning" => Category::Warning,
        "convention" => Category::Convention,
        "refactor" => Category::Refactor,
        _ => Category::Info,
    }
}

fn parse_record(record: &JsonValue, project_root: &Path) -> Result<Issue, RecordError> {
    let message_type = str_field(record, "type")?;
    let path = str_field(record, "path")?;
    let line = u32_field(record, "line")?;
    let message = str_field(record, "message")?;
    let code = str_field(record, "message-id")?;

    Ok(Issue::new(
        map_category(message_type),
        ToolKind::Pylint,
        relative_path(path, project_root),
        line,
        code,
        message,
    ))
}

/// Parse pylint JSON output into issues
pub fn parse_output(stdout: &str, project_root: &Path) -> Vec<Issue> {
    if stdout.trim().is_empty() {
        return Vec::new();
    }

    let records = match serde_json::from_str::<JsonValue>(stdout) {
        Ok(JsonValue::Array(records)) => records,
        Ok(_) => {
            error!("Pylint output is not a JSON array");
            return Vec::new();
        }
        Err(e) => {
            error!("Pylint parse error: {}", e);
            return Vec::new();
        }
    };

    let mut issues = Vec::with_capacity(records.len());
    for record in &records {
        match parse_record(record, project_root) {
            Ok(issue) => issues.push(issue),
            Err(e) => warn!("Skipping pylint record: {}", e),
        }
    }
    issues
}
