//! Radon cyclomatic complexity normalizer
//!
//! `radon cc -j` prints a JSON object mapping each file to its functions,
//! methods and classes with their complexity and rank. Radon has no rule
//! codes, so one is synthesized from the rank.

use crate::models::{Category, Issue, ToolKind};
use crate::tools::record::{relative_path, u32_field, RecordError};
use serde_json::{Map, Value as JsonValue};
use std::path::Path;
use tracing::{debug, error, warn};

/// Complexity at or below this is trivial and never reported
pub const TRIVIAL_COMPLEXITY: u32 = 1;

/// Complexity above this is reported as high severity
pub const HIGH_COMPLEXITY: u32 = 10;

/// Build the radon argv for `target`
pub fn command(program: &str, target: &Path) -> Vec<String> {
    vec![
        program.to_string(),
        "cc".to_string(),
        "-j".to_string(),
        target.to_string_lossy().to_string(),
    ]
}

/// Map a complexity value to a severity string
fn complexity_severity(complexity: u32) -> &'static str {
    if complexity > HIGH_COMPLEXITY {
        "high"
    } else {
        "medium"
    }
}

/// Title-case each word, e.g. `method` -> `Method`
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

/// Parse one block. `Ok(None)` means the block is trivial and suppressed.
fn parse_block(item: &JsonValue, file: &str) -> Result<Option<Issue>, RecordError> {
    let complexity = u32_field(item, "complexity")?;
    if complexity <= TRIVIAL_COMPLEXITY {
        return Ok(None);
    }

    let kind = item.get("type").and_then(|v| v.as_str()).unwrap_or("item");
    let name = item.get("name").and_then(|v| v.as_str()).unwrap_or("");
    let rank = item.get("rank").and_then(|v| v.as_str()).unwrap_or("U");
    let line = item
        .get("lineno")
        .and_then(|v| v.as_u64())
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0);

    let mut issue = Issue::new(
        Category::Complexity,
        ToolKind::Radon,
        file,
        line,
        format!("RADON-{}", rank),
        format!(
            "{} '{}' (complexity: {})",
            title_case(kind),
            name,
            complexity
        ),
    );
    issue.severity = Some(complexity_severity(complexity).to_string());
    issue.complexity = Some(complexity);
    Ok(Some(issue))
}

/// Radon output is an object, occasionally double-encoded as a JSON string
fn decode(stdout: &str) -> Option<Map<String, JsonValue>> {
    let mut value: JsonValue = match serde_json::from_str(stdout) {
        Ok(value) => value,
        Err(e) => {
            error!("Invalid Radon output ({}): {:.200}", e, stdout);
            return None;
        }
    };

    if let JsonValue::String(inner) = &value {
        value = match serde_json::from_str(inner) {
            Ok(value) => value,
            Err(e) => {
                error!("Invalid Radon output ({}): {:.200}", e, inner);
                return None;
            }
        };
    }

    match value {
        JsonValue::Object(map) => Some(map),
        _ => {
            error!("Radon output is not a JSON object");
            None
        }
    }
}

/// Parse radon JSON output into issues
pub fn parse_output(stdout: &str, project_root: &Path) -> Vec<Issue> {
    if stdout.trim().is_empty() {
        return Vec::new();
    }
    let Some(files) = decode(stdout) else {
        return Vec::new();
    };

    let mut issues = Vec::new();
    for (file_path, items) in &files {
        let rel_path = relative_path(file_path, project_root);

        // Radon reports unparseable files as {"error": "..."} instead of a list
        let Some(items) = items.as_array() else {
            debug!("Radon skipped {}: {}", rel_path, items);
            continue;
        };

        for item in items {
            if !item.is_object() {
                continue;
            }
            match parse_block(item, &rel_path) {
                Ok(Some(issue)) => issues.push(issue),
                Ok(None) => {}
                Err(e) => warn!("Skipping radon block in {}: {}", rel_path, e),
            }
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(kind: &str, name: &str, complexity: u32, rank: &str) -> String {
        format!(
            r#"{{"type": "{}", "name": "{}", "complexity": {}, "rank": "{}", "lineno": 7, "col_offset": 0, "endline": 20}}"#,
            kind, name, complexity, rank
        )
    }

    #[test]
    fn test_complexity_thresholds() {
        let stdout = format!(
            r#"{{"/proj/calc.py": [{}, {}, {}]}}"#,
            block("function", "trivial", 1, "A"),
            block("function", "branchy", 2, "A"),
            block("method", "monster", 11, "C"),
        );
        let issues = parse_output(&stdout, Path::new("/proj"));
        assert_eq!(issues.len(), 2);

        assert_eq!(issues[0].file, "calc.py");
        assert_eq!(issues[0].category, Category::Complexity);
        assert_eq!(issues[0].severity.as_deref(), Some("medium"));
        assert_eq!(issues[0].message, "Function 'branchy' (complexity: 2)");
        assert_eq!(issues[0].code, "RADON-A");
        assert_eq!(issues[0].line, 7);

        assert_eq!(issues[1].severity.as_deref(), Some("high"));
        assert_eq!(issues[1].message, "Method 'monster' (complexity: 11)");
        assert_eq!(issues[1].complexity, Some(11));
    }

    #[test]
    fn test_boundary_ten_is_medium() {
        let stdout = format!(r#"{{"a.py": [{}]}}"#, block("class", "Big", 10, "B"));
        let issues = parse_output(&stdout, Path::new("/proj"));
        assert_eq!(issues[0].severity.as_deref(), Some("medium"));
        assert_eq!(issues[0].message, "Class 'Big' (complexity: 10)");
    }

    #[test]
    fn test_missing_rank_and_type_defaults() {
        let stdout = r#"{"a.py": [{"name": "f", "complexity": 3}]}"#;
        let issues = parse_output(stdout, Path::new("/proj"));
        assert_eq!(issues[0].code, "RADON-U");
        assert_eq!(issues[0].message, "Item 'f' (complexity: 3)");
        assert_eq!(issues[0].line, 0);
    }

    #[test]
    fn test_bad_blocks_are_skipped() {
        let stdout = format!(
            r#"{{"a.py": [{{"name": "nocomplexity"}}, "junk", {}], "b.py": {{"error": "invalid syntax"}}}}"#,
            block("function", "ok", 5, "A")
        );
        let issues = parse_output(&stdout, Path::new("/proj"));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "Function 'ok' (complexity: 5)");
    }

    #[test]
    fn test_double_encoded_output() {
        let inner = format!(r#"{{"a.py": [{}]}}"#, block("function", "f", 4, "A"));
        let stdout = serde_json::to_string(&inner).unwrap();
        let issues = parse_output(&stdout, Path::new("/proj"));
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_empty_and_malformed_output() {
        assert!(parse_output("", Path::new("/proj")).is_empty());
        assert!(parse_output("{}", Path::new("/proj")).is_empty());
        assert!(parse_output("not json", Path::new("/proj")).is_empty());
        assert!(parse_output("[1, 2]", Path::new("/proj")).is_empty());
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("function"), "Function");
        assert_eq!(title_case("METHOD"), "Method");
        assert_eq!(title_case("nested function"), "Nested Function");
    }
}
