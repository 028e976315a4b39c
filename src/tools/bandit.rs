//! Bandit output normalizer
//!
//! Bandit is the security scanner and always runs first. It prints a JSON
//! object whose `results` array holds one entry per finding, and exits 1
//! whenever it finds something.

use crate::models::{Category, Issue, ToolKind};
use crate::tools::record::{opt_str_field, relative_path, str_field, u32_field, RecordError};
use serde_json::Value as JsonValue;
use std::path::Path;
use tracing::{error, warn};

/// Build the bandit argv for `target`
pub fn command(program: &str, config: &Path, target: &Path) -> Vec<String> {
    vec![
        program.to_string(),
        "-r".to_string(),
        "-f".to_string(),
        "json".to_string(),
        "-c".to_string(),
        config.to_string_lossy().to_string(),
        target.to_string_lossy().to_string(),
    ]
}

fn parse_record(record: &JsonValue, project_root: &Path) -> Result<Issue, RecordError> {
    let filename = str_field(record, "filename")?;
    let line = u32_field(record, "line_number")?;
    let issue_text = str_field(record, "issue_text")?;
    let test_id = str_field(record, "test_id")?;
    let severity = str_field(record, "issue_severity")?;
    let confidence = str_field(record, "issue_confidence")?;

    let mut issue = Issue::new(
        Category::Security,
        ToolKind::Bandit,
        relative_path(filename, project_root),
        line,
        test_id,
        issue_text,
    );
    issue.url = opt_str_field(record, "more_info");
    issue.severity = Some(severity.to_lowercase());
    issue.confidence = Some(confidence.to_lowercase());
    Ok(issue)
}

/// Parse bandit JSON output into issues
pub fn parse_output(stdout: &str, project_root: &Path) -> Vec<Issue> {
    if stdout.trim().is_empty() {
        return Vec::new();
    }

    let data: JsonValue = match serde_json::from_str(stdout) {
        Ok(data) => data,
        Err(e) => {
            error!("Bandit parse error: {}", e);
            return Vec::new();
        }
    };

    let Some(results) = data.get("results").and_then(|r| r.as_array()) else {
        error!("Bandit output has no 'results' array");
        return Vec::new();
    };

    results
        .iter()
        .filter_map(|record| match parse_record(record, project_root) {
            Ok(issue) => Some(issue),
            Err(e) => {
                warn!("Skipping bandit record: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "errors": [],
        "generated_at": "2024-05-01T12:00:00Z",
        "metrics": {},
        "results": [
            {
                "code": "4 subprocess.call(cmd, shell=True)\n",
                "filename": "/proj/tools/run.py",
                "issue_confidence": "HIGH",
                "issue_severity": "HIGH",
                "issue_text": "subprocess call with shell=True identified, security issue.",
                "line_number": 4,
                "more_info": "https://bandit.readthedocs.io/en/latest/plugins/b602_subprocess_popen_with_shell_equals_true.html",
                "test_id": "B602",
                "test_name": "subprocess_popen_with_shell_equals_true"
            },
            {
                "filename": "./settings.py",
                "issue_confidence": "MEDIUM",
                "issue_severity": "LOW",
                "issue_text": "Possible hardcoded password: 'hunter2'",
                "line_number": 10,
                "test_id": "B105"
            },
            {
                "filename": "broken.py",
                "issue_severity": "LOW",
                "issue_text": "no confidence or line",
                "test_id": "B101"
            }
        ]
    }"#;

    #[test]
    fn test_parse_output() {
        let issues = parse_output(SAMPLE, Path::new("/proj"));
        assert_eq!(issues.len(), 2);

        let first = &issues[0];
        assert_eq!(first.category, Category::Security);
        assert_eq!(first.file, "tools/run.py");
        assert_eq!(first.code, "B602");
        assert_eq!(first.severity.as_deref(), Some("high"));
        assert_eq!(first.confidence.as_deref(), Some("high"));
        assert!(first.url.as_deref().unwrap().contains("b602"));

        let second = &issues[1];
        assert_eq!(second.file, "settings.py");
        assert_eq!(second.severity.as_deref(), Some("low"));
        assert_eq!(second.confidence.as_deref(), Some("medium"));
        assert!(second.url.is_none());
    }

    #[test]
    fn test_empty_and_malformed_output() {
        assert!(parse_output("", Path::new("/proj")).is_empty());
        assert!(parse_output("Traceback (most recent call last):", Path::new("/proj")).is_empty());
        assert!(parse_output("{\"errors\": []}", Path::new("/proj")).is_empty());
    }

    #[test]
    fn test_command_shape() {
        let cmd = command("bandit", Path::new("/cfg/.bandit"), Path::new("/proj"));
        assert_eq!(cmd, vec!["bandit", "-r", "-f", "json", "-c", "/cfg/.bandit", "/proj"]);
    }
}
