//! Analysis pipeline
//!
//! Orchestrates one full analysis of a project directory:
//! 1. Security scan (bandit), always first
//! 2. Classify the project
//! 3. Main linter: ruff for web projects, pylint otherwise
//! 4. Beginner filtering of the main linter's issues
//! 5. Complexity analysis (radon)
//!
//! A failing tool only fails its own sub-result. Stages run sequentially on
//! the calling thread; the async entry point moves them onto the blocking pool
//! and enforces a wall-clock limit on the whole run.

use crate::classifier;
use crate::models::{AnalysisResult, ExperienceLevel, ProjectType, ToolKind, ToolReport};
use crate::tools::{CancelToken, ToolInvoker};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Cannot read project directory {}: {source}", path.display())]
    ProjectRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Pipeline stage, reported to progress observers before it starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Security,
    Classify,
    MainLinter(ToolKind),
    Complexity,
}

/// Sub-results gathered so far
#[derive(Debug, Clone, Default)]
struct PartialAnalysis {
    project_type: Option<ProjectType>,
    security: Option<ToolReport>,
    main: Option<ToolReport>,
    complexity: Option<ToolReport>,
}

impl PartialAnalysis {
    /// Fill any stage that never finished with a failed report
    fn finish(self, level: ExperienceLevel, unfinished: &str) -> AnalysisResult {
        let project_type = self.project_type.unwrap_or_default();
        let pending = || ToolReport::failed(unfinished);
        AnalysisResult {
            project_type,
            linter: project_type.main_linter(),
            complexity: ToolKind::Radon,
            experience_level: level,
            security_scan: self.security.unwrap_or_else(pending),
            main_analysis: self.main.unwrap_or_else(pending),
            complexity_analysis: self.complexity.unwrap_or_else(pending),
        }
    }
}

fn record(partial: &Mutex<PartialAnalysis>, update: impl FnOnce(&mut PartialAnalysis)) {
    let mut guard = partial.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    update(&mut guard);
}

/// Drop the issues beginners do not see
pub fn filter_for_level(report: &mut ToolReport, level: ExperienceLevel) {
    if level == ExperienceLevel::Beginner {
        let before = report.issues.len();
        report.issues.retain(|issue| !issue.is_advanced_only());
        debug!(
            "Beginner filter removed {} of {} issues",
            before - report.issues.len(),
            before
        );
    }
}

/// Full analysis pipeline.
pub struct AnalysisPipeline {
    invoker: Arc<ToolInvoker>,
}

impl AnalysisPipeline {
    pub fn new(invoker: Arc<ToolInvoker>) -> Self {
        Self { invoker }
    }

    pub fn invoker(&self) -> &ToolInvoker {
        &self.invoker
    }

    /// Run the full pipeline synchronously.
    ///
    /// Fails only when the project root itself cannot be read.
    pub fn analyze(
        &self,
        project_root: &Path,
        level: ExperienceLevel,
    ) -> Result<AnalysisResult, PipelineError> {
        self.analyze_with_progress(project_root, level, |_| {})
    }

    /// Like [`analyze`](Self::analyze), calling `on_stage` before each stage
    pub fn analyze_with_progress(
        &self,
        project_root: &Path,
        level: ExperienceLevel,
        on_stage: impl Fn(Stage),
    ) -> Result<AnalysisResult, PipelineError> {
        check_root(project_root)?;
        let partial = Mutex::new(PartialAnalysis::default());
        self.run_stages(project_root, level, None, &partial, &on_stage);
        let partial = partial.into_inner().unwrap_or_else(|p| p.into_inner());
        Ok(partial.finish(level, "analysis did not run"))
    }

    /// Run the pipeline on the blocking pool with a limit on the whole run.
    ///
    /// On timeout the running tool is killed and whatever finished is
    /// returned; unfinished sub-results carry a timeout error.
    pub async fn analyze_with_timeout(
        self: Arc<Self>,
        project_root: PathBuf,
        level: ExperienceLevel,
        limit: Duration,
    ) -> Result<AnalysisResult, PipelineError> {
        check_root(&project_root)?;

        let partial = Arc::new(Mutex::new(PartialAnalysis::default()));
        let cancel = CancelToken::new();

        let task = {
            let pipeline = Arc::clone(&self);
            let partial = Arc::clone(&partial);
            let cancel = cancel.clone();
            let root = project_root.clone();
            tokio::task::spawn_blocking(move || {
                pipeline.run_stages(&root, level, Some(&cancel), &partial, &|_| {})
            })
        };

        let unfinished = match tokio::time::timeout(limit, task).await {
            Ok(Ok(())) => "analysis did not run".to_string(),
            Ok(Err(e)) => {
                error!("Analysis task for {:?} aborted: {}", project_root, e);
                "analysis aborted".to_string()
            }
            Err(_) => {
                warn!(
                    "Analysis of {:?} timed out after {}s, returning partial result",
                    project_root,
                    limit.as_secs()
                );
                cancel.cancel();
                format!("analysis timed out after {}s", limit.as_secs())
            }
        };

        let snapshot = partial
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        Ok(snapshot.finish(level, &unfinished))
    }

    /// Run ruff on one file inside the project.
    ///
    /// Issue paths stay project-relative so they can replace the file's
    /// entries in a cached result.
    pub fn reanalyze_file(
        &self,
        project_root: &Path,
        file: &Path,
        level: ExperienceLevel,
    ) -> ToolReport {
        let target = project_root.join(file);
        let mut report = self
            .invoker
            .analyze(ToolKind::Ruff, project_root, &target, None);
        filter_for_level(&mut report, level);
        report
    }

    fn run_stages(
        &self,
        root: &Path,
        level: ExperienceLevel,
        cancel: Option<&CancelToken>,
        partial: &Mutex<PartialAnalysis>,
        on_stage: &dyn Fn(Stage),
    ) {
        let cancelled = || cancel.is_some_and(|c| c.is_cancelled());

        on_stage(Stage::Security);
        let security = self.invoker.analyze(ToolKind::Bandit, root, root, cancel);
        record(partial, |p| p.security = Some(security));
        if cancelled() {
            return;
        }

        on_stage(Stage::Classify);
        let project_type = classifier::classify(root);
        info!("Detected project type: {}", project_type);
        record(partial, |p| p.project_type = Some(project_type));

        let linter = project_type.main_linter();
        on_stage(Stage::MainLinter(linter));
        let mut main = self.invoker.analyze(linter, root, root, cancel);
        filter_for_level(&mut main, level);
        record(partial, |p| p.main = Some(main));
        if cancelled() {
            return;
        }

        on_stage(Stage::Complexity);
        let complexity = self.invoker.analyze(ToolKind::Radon, root, root, cancel);
        record(partial, |p| p.complexity = Some(complexity));
    }
}

fn check_root(root: &Path) -> Result<(), PipelineError> {
    std::fs::read_dir(root)
        .map(|_| ())
        .map_err(|source| PipelineError::ProjectRoot {
            path: root.to_path_buf(),
            source,
        })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::models::Category;
    use crate::tools::invoker::test_support::{fake_tool, script, settings_with};
    use std::time::Instant;

    const BANDIT_JSON: &str = r#"{"results": [{"filename": "app.py", "line_number": 1,
        "issue_text": "Consider possible security implications associated with subprocess.",
        "test_id": "B404", "issue_severity": "LOW", "issue_confidence": "HIGH"}]}"#;

    const RUFF_JSON: &str = r#"[
        {"code": "F401", "filename": "app.py", "location": {"row": 1}, "message": "unused"},
        {"code": "D100", "filename": "app.py", "location": {"row": 1}, "message": "Missing docstring in public module"}
    ]"#;

    const PYLINT_JSON: &str = r#"[{"type": "convention", "path": "app.py", "line": 1,
        "message": "Missing module docstring", "message-id": "C0114"}]"#;

    const RADON_JSON: &str = r#"{"app.py": [{"type": "function", "name": "run", "complexity": 3, "rank": "A", "lineno": 3}]}"#;

    struct Fixture {
        _bin: tempfile::TempDir,
        project: tempfile::TempDir,
        pipeline: Arc<AnalysisPipeline>,
    }

    fn fixture(web: bool, pylint_body: Option<&str>) -> Fixture {
        let bin = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        std::fs::write(
            project.path().join("app.py"),
            "import subprocess\n\ndef run():\n    pass\n",
        )
        .unwrap();
        if web {
            std::fs::write(project.path().join("requirements.txt"), "flask\n").unwrap();
        }

        let bandit = fake_tool(bin.path(), "bandit", BANDIT_JSON, 1);
        let ruff = fake_tool(bin.path(), "ruff", RUFF_JSON, 1);
        let pylint = match pylint_body {
            Some(body) => script(bin.path(), "pylint", body),
            None => fake_tool(bin.path(), "pylint", PYLINT_JSON, 16),
        };
        let radon = fake_tool(bin.path(), "radon", RADON_JSON, 0);

        let mut settings = settings_with(
            bin.path(),
            &[
                (ToolKind::Bandit, &bandit),
                (ToolKind::Ruff, &ruff),
                (ToolKind::Pylint, &pylint),
                (ToolKind::Radon, &radon),
            ],
        );
        settings.pylint.timeout_secs = Some(1);

        Fixture {
            _bin: bin,
            project,
            pipeline: Arc::new(AnalysisPipeline::new(Arc::new(ToolInvoker::new(settings)))),
        }
    }

    #[test]
    fn test_web_project_uses_ruff() {
        let f = fixture(true, None);
        let result = f
            .pipeline
            .analyze(f.project.path(), ExperienceLevel::Intermediate)
            .unwrap();

        assert_eq!(result.project_type, ProjectType::Web);
        assert_eq!(result.linter, ToolKind::Ruff);
        assert!(result.security_scan.success);
        assert_eq!(result.security_scan.issues[0].category, Category::Security);
        assert_eq!(result.main_analysis.issues.len(), 2);
        assert_eq!(result.complexity_analysis.issues.len(), 1);
        assert_eq!(result.total_issues(), 4);
    }

    #[test]
    fn test_non_web_project_uses_pylint() {
        let f = fixture(false, None);
        let result = f
            .pipeline
            .analyze(f.project.path(), ExperienceLevel::Advanced)
            .unwrap();

        assert_eq!(result.project_type, ProjectType::Unknown);
        assert_eq!(result.linter, ToolKind::Pylint);
        assert!(result.main_analysis.success);
        assert_eq!(result.main_analysis.issues[0].code, "C0114");
    }

    #[test]
    fn test_beginner_filter_only_narrows_main_analysis() {
        let f = fixture(true, None);
        let result = f
            .pipeline
            .analyze(f.project.path(), ExperienceLevel::Beginner)
            .unwrap();

        let codes: Vec<_> = result.main_analysis.issues.iter().map(|i| i.code.as_str()).collect();
        assert_eq!(codes, vec!["D100"]);
        assert_eq!(result.security_scan.issues.len(), 1);
        assert_eq!(result.experience_level, ExperienceLevel::Beginner);
    }

    #[test]
    fn test_main_linter_timeout_keeps_other_results() {
        let f = fixture(false, Some("exec sleep 30\n"));
        let result = f
            .pipeline
            .analyze(f.project.path(), ExperienceLevel::Intermediate)
            .unwrap();

        assert!(!result.main_analysis.success);
        assert!(result.main_analysis.error.unwrap().contains("timed out"));
        assert!(result.security_scan.success);
        assert_eq!(result.security_scan.issues.len(), 1);
        assert!(result.complexity_analysis.success);
        assert_eq!(result.complexity_analysis.issues.len(), 1);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let f = fixture(false, None);
        let missing = f.project.path().join("gone");
        let err = f
            .pipeline
            .analyze(&missing, ExperienceLevel::Intermediate)
            .unwrap_err();
        assert!(matches!(err, PipelineError::ProjectRoot { .. }));
    }

    #[test]
    fn test_stages_run_in_order() {
        let f = fixture(true, None);
        let seen = Mutex::new(Vec::new());
        f.pipeline
            .analyze_with_progress(f.project.path(), ExperienceLevel::Intermediate, |stage| {
                seen.lock().unwrap().push(stage)
            })
            .unwrap();
        assert_eq!(
            seen.into_inner().unwrap(),
            vec![
                Stage::Security,
                Stage::Classify,
                Stage::MainLinter(ToolKind::Ruff),
                Stage::Complexity
            ]
        );
    }

    #[test]
    fn test_reanalyze_single_file_is_project_relative() {
        let bin = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        std::fs::create_dir(project.path().join("pkg")).unwrap();
        std::fs::write(project.path().join("pkg/mod.py"), "import os\n").unwrap();
        // Echo the target back as an absolute-path finding
        let ruff = script(
            bin.path(),
            "ruff",
            "for last; do :; done\nprintf '[{\"code\": \"F401\", \"filename\": \"%s\", \"location\": {\"row\": 1}, \"message\": \"unused\"}]' \"$last\"\nexit 1\n",
        );
        let settings = settings_with(bin.path(), &[(ToolKind::Ruff, &ruff)]);
        let pipeline = AnalysisPipeline::new(Arc::new(ToolInvoker::new(settings)));

        let report = pipeline.reanalyze_file(
            project.path(),
            Path::new("pkg/mod.py"),
            ExperienceLevel::Advanced,
        );
        assert!(report.success);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].file, "pkg/mod.py");

        let beginner = pipeline.reanalyze_file(
            project.path(),
            Path::new("pkg/mod.py"),
            ExperienceLevel::Beginner,
        );
        assert!(beginner.issues.is_empty());
    }

    #[tokio::test]
    async fn test_pipeline_timeout_returns_partial_result() {
        // pylint's own limit is 1s; the whole-run limit below fires first
        let f = fixture(false, Some("exec sleep 30\n"));
        let mut settings = f.pipeline.invoker().settings().clone();
        settings.pylint.timeout_secs = Some(60);
        let pipeline = Arc::new(AnalysisPipeline::new(Arc::new(ToolInvoker::new(settings))));

        let start = Instant::now();
        let result = pipeline
            .analyze_with_timeout(
                f.project.path().to_path_buf(),
                ExperienceLevel::Intermediate,
                Duration::from_secs(2),
            )
            .await
            .unwrap();

        assert!(start.elapsed() < Duration::from_secs(20));
        assert!(result.security_scan.success);
        assert!(!result.main_analysis.success);
        assert!(result.main_analysis.error.unwrap().contains("timed out"));
        assert!(!result.complexity_analysis.success);
    }
}
