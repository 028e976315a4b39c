//! Ruff output normalizer
//!
//! Ruff is the fast general-purpose linter used for web projects and for
//! single-file re-analysis. With `--output-format=json` it prints a JSON array
//! of violations.

use crate::models::{Category, Issue, ToolKind};
use crate::tools::record::{opt_str_field, relative_path, str_field, u32_field, RecordError};
use serde_json::Value as JsonValue;
use std::path::Path;
use tracing::{error, warn};

/// Build the ruff argv for `target`
pub fn command(program: &str, config: &Path, target: &Path) -> Vec<String> {
    vec![
        program.to_string(),
        "check".to_string(),
        "--config".to_string(),
        config.to_string_lossy().to_string(),
        "--output-format=json".to_string(),
        "--no-cache".to_string(),
        target.to_string_lossy().to_string(),
    ]
}

/// Map a ruff rule code to a category. pycodestyle errors (E) and pyflakes (F)
/// are errors, everything else is a warning.
fn map_category(code: &str) -> Category {
    if code.starts_with('E') || code.starts_with('F') {
        Category::Error
    } else {
        Category::Warning
    }
}

fn parse_record(record: &JsonValue, project_root: &Path) -> Result<Issue, RecordError> {
    let filename = str_field(record, "filename")?;
    let location = record
        .get("location")
        .ok_or(RecordError::Missing("location"))?;
    let line = u32_field(location, "row")?;
    let code = str_field(record, "code")?;
    let message = str_field(record, "message")?;

    let mut issue = Issue::new(
        map_category(code),
        ToolKind::Ruff,
        relative_path(filename, project_root),
        line,
        code,
        message,
    );
    issue.url = opt_str_field(record, "url");
    Ok(issue)
}

/// Parse ruff JSON output into issues
pub fn parse_output(stdout: &str, project_root: &Path) -> Vec<Issue> {
    if stdout.trim().is_empty() {
        return Vec::new();
    }

    let records: Vec<JsonValue> = match serde_json::from_str(stdout) {
        Ok(JsonValue::Array(records)) => records,
        Ok(_) => {
            error!("Ruff output is not a JSON array");
            return Vec::new();
        }
        Err(e) => {
            error!("Ruff parse error: {}", e);
            return Vec::new();
        }
    };

    records
        .iter()
        .filter_map(|record| match parse_record(record, project_root) {
            Ok(issue) => Some(issue),
            Err(e) => {
                warn!("Skipping ruff record: {}", e);
                None
            }
        })
        .collect()
}
