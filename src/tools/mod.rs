//! External analyzer integration
//!
//! Each analyzer has a module that knows its command line and how to turn its
//! JSON output into [`Issue`]s. [`ToolInvoker`] runs them as subprocesses with
//! timeouts and a configurable exit-code policy.

pub mod bandit;
pub mod external_tool;
pub mod invoker;
pub mod linter_config;
pub mod pylint;
pub mod radon;
pub mod record;
pub mod ruff;

pub use external_tool::{is_tool_installed, CancelToken};
pub use invoker::{has_python_sources, ToolInvoker, ToolRun};
pub use linter_config::LinterConfigs;

use crate::models::{Issue, ToolKind};
use std::path::Path;

/// Normalize raw stdout from `tool` into issues relative to `project_root`
pub fn normalize(tool: ToolKind, stdout: &str, project_root: &Path) -> Vec<Issue> {
    match tool {
        ToolKind::Ruff => ruff::parse_output(stdout, project_root),
        ToolKind::Pylint => pylint::parse_output(stdout, project_root),
        ToolKind::Bandit => bandit::parse_output(stdout, project_root),
        ToolKind::Radon => radon::parse_output(stdout, project_root),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_normalizer_handles_empty_output() {
        for tool in ToolKind::ALL {
            assert!(normalize(tool, "", Path::new("/proj")).is_empty(), "{}", tool);
        }
    }

    #[test]
    fn test_absolute_paths_become_relative_for_every_tool() {
        let root = Path::new("/proj");
        let outputs = [
            (
                ToolKind::Ruff,
                r#"[{"code": "W291", "filename": "/proj/pkg/a.py", "location": {"row": 1}, "message": "m"}]"#,
            ),
            (
                ToolKind::Pylint,
                r#"[{"type": "warning", "path": "/proj/pkg/a.py", "line": 1, "message": "m", "message-id": "W0611"}]"#,
            ),
            (
                ToolKind::Bandit,
                r#"{"results": [{"filename": "/proj/pkg/a.py", "line_number": 1, "issue_text": "m", "test_id": "B101", "issue_severity": "LOW", "issue_confidence": "LOW"}]}"#,
            ),
            (
                ToolKind::Radon,
                r#"{"/proj/pkg/a.py": [{"type": "function", "name": "f", "complexity": 4, "rank": "A", "lineno": 1}]}"#,
            ),
        ];

        for (tool, stdout) in outputs {
            let issues = normalize(tool, stdout, root);
            assert_eq!(issues.len(), 1, "{}", tool);
            assert_eq!(issues[0].file, "pkg/a.py", "{}", tool);
            assert_eq!(issues[0].source_tool, tool);
        }
    }
}
