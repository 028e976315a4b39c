//! Tool invocation with per-tool exit-code policy

use crate::config::ToolsSettings;
use crate::models::{Issue, ToolKind, ToolReport};
use crate::tools::external_tool::{run_external_tool, CancelToken, ExternalToolResult};
use crate::tools::linter_config::LinterConfigs;
use crate::tools::{bandit, normalize, pylint, radon, ruff};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Outcome of one analyzer run, exit code already interpreted
#[derive(Debug, Clone)]
pub struct ToolRun {
    pub tool: ToolKind,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
    /// Skipped because there was nothing to analyze
    pub skipped: bool,
    pub timed_out: bool,
    pub cancelled: bool,
}

impl ToolRun {
    fn skipped(tool: ToolKind) -> Self {
        Self {
            tool,
            success: true,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            error: None,
            skipped: true,
            timed_out: false,
            cancelled: false,
        }
    }

    fn failed(tool: ToolKind, error: String) -> Self {
        Self {
            success: false,
            error: Some(error),
            skipped: false,
            ..Self::skipped(tool)
        }
    }

    fn from_process(tool: ToolKind, result: ExternalToolResult, success_codes: &[i32]) -> Self {
        let success = result.completed
            && result
                .return_code
                .is_some_and(|code| success_codes.contains(&code));

        let error = match (&result.error, result.return_code) {
            (Some(e), _) => Some(e.clone()),
            (None, Some(code)) if !success => Some(exit_error(tool, code, &result.stderr)),
            _ => None,
        };

        Self {
            tool,
            success,
            stdout: result.stdout,
            stderr: result.stderr,
            exit_code: result.return_code,
            error,
            skipped: false,
            timed_out: result.timed_out,
            cancelled: result.cancelled,
        }
    }

    /// Normalize stdout into issues
    pub fn issues(&self, project_root: &Path) -> Vec<Issue> {
        normalize(self.tool, &self.stdout, project_root)
    }

    /// Normalize and wrap as a report
    pub fn into_report(self, project_root: &Path) -> ToolReport {
        let issues = self.issues(project_root);
        info!(
            "{} analysis completed. Found {} issues.",
            self.tool,
            issues.len()
        );
        ToolReport {
            success: self.success,
            issues,
            error: self.error,
        }
    }
}

fn exit_error(tool: ToolKind, code: i32, stderr: &str) -> String {
    let detail = stderr.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    if detail.is_empty() {
        format!("{} exited with code {}", tool, code)
    } else {
        format!("{} exited with code {}: {}", tool, code, detail.trim())
    }
}

/// Whether `target` is, or contains, a Python source file
pub fn has_python_sources(target: &Path) -> bool {
    if target.is_file() {
        return target.extension().is_some_and(|ext| ext == "py");
    }
    WalkBuilder::new(target)
        .standard_filters(false)
        .build()
        .filter_map(|e| e.ok())
        .any(|e| {
            e.file_type().is_some_and(|t| t.is_file())
                && e.path().extension().is_some_and(|ext| ext == "py")
        })
}

/// Runs analyzers against project directories
pub struct ToolInvoker {
    settings: ToolsSettings,
    configs: LinterConfigs,
}

impl ToolInvoker {
    pub fn new(settings: ToolsSettings) -> Self {
        let configs = LinterConfigs::new(settings.config_dir(), settings.rules.clone());
        Self { settings, configs }
    }

    pub fn configs(&self) -> &LinterConfigs {
        &self.configs
    }

    pub fn settings(&self) -> &ToolsSettings {
        &self.settings
    }

    /// Build the argv for running `tool` on `target`
    pub fn command(&self, tool: ToolKind, target: &Path) -> std::io::Result<Vec<String>> {
        let program = self.settings.program(tool);
        let config = self.configs.ensure(tool)?;
        let config = config.unwrap_or_else(PathBuf::new);
        Ok(match tool {
            ToolKind::Ruff => ruff::command(&program, &config, target),
            ToolKind::Pylint => pylint::command(&program, &config, target),
            ToolKind::Bandit => bandit::command(&program, &config, target),
            ToolKind::Radon => radon::command(&program, target),
        })
    }

    /// Run `tool` over the whole project
    pub fn run_tool(
        &self,
        tool: ToolKind,
        project_root: &Path,
        cancel: Option<&CancelToken>,
    ) -> ToolRun {
        self.run_tool_on(tool, project_root, project_root, cancel)
    }

    /// Run `tool` on `target` (a file or directory inside `project_root`)
    pub fn run_tool_on(
        &self,
        tool: ToolKind,
        project_root: &Path,
        target: &Path,
        cancel: Option<&CancelToken>,
    ) -> ToolRun {
        info!("Running {} analysis in: {:?}", tool, target);

        if tool.requires_sources() && !has_python_sources(target) {
            info!("No Python files found for {}, skipping", tool);
            return ToolRun::skipped(tool);
        }

        let cmd = match self.command(tool, target) {
            Ok(cmd) => cmd,
            Err(e) => {
                warn!("Could not prepare {} config: {}", tool, e);
                return ToolRun::failed(tool, format!("Failed to write {} config: {}", tool, e));
            }
        };

        let result = run_external_tool(
            &cmd,
            tool.name(),
            self.settings.timeout_secs(tool),
            Some(project_root),
            cancel,
        );

        debug!(
            "{} stdout (first 500 chars): {}",
            tool,
            result.stdout.chars().take(500).collect::<String>()
        );
        if !result.stderr.is_empty() {
            debug!("{} stderr: {}", tool, result.stderr);
        }

        let run = ToolRun::from_process(tool, result, &self.settings.success_codes(tool));
        if let Some(error) = &run.error {
            warn!("{} failed: {}", tool, error);
        }
        run
    }

    /// Run and normalize in one step
    pub fn analyze(
        &self,
        tool: ToolKind,
        project_root: &Path,
        target: &Path,
        cancel: Option<&CancelToken>,
    ) -> ToolReport {
        self.run_tool_on(tool, project_root, target, cancel)
            .into_report(project_root)
    }
}

#[cfg(all(test, unix))]
pub(crate) mod test_support {
    //! Stand-in analyzer scripts for tests

    use crate::config::{ToolSettings, ToolsSettings};
    use crate::models::ToolKind;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// Write an executable shell script that prints `stdout` and exits with `code`
    pub fn fake_tool(dir: &Path, name: &str, stdout: &str, code: i32) -> PathBuf {
        script(dir, name, &format!("cat <<'PINK_EOF'\n{}\nPINK_EOF\nexit {}\n", stdout, code))
    }

    /// Write an executable shell script with an arbitrary body
    pub fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    /// Tool settings pointing every analyzer at a script in `bin_dir`
    pub fn settings_with(bin_dir: &Path, programs: &[(ToolKind, &Path)]) -> ToolsSettings {
        let mut settings = ToolsSettings {
            config_dir: Some(bin_dir.join("config")),
            timeout_secs: 30,
            ..Default::default()
        };
        for (tool, program) in programs {
            let entry = ToolSettings {
                program: Some(program.to_string_lossy().to_string()),
                ..Default::default()
            };
            match tool {
                ToolKind::Ruff => settings.ruff = entry,
                ToolKind::Pylint => settings.pylint = entry,
                ToolKind::Bandit => settings.bandit = entry,
                ToolKind::Radon => settings.radon = entry,
            }
        }
        settings
    }
}
