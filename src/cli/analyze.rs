//! Analyze command - one-shot analysis from the terminal
//!
//! Accepts a project directory or a `.zip` archive. Archives are unpacked
//! into a throwaway session that is removed once the run finishes.

use crate::config::Settings;
use crate::models::{AnalysisResult, ExperienceLevel, ToolReport};
use crate::pipeline::{AnalysisPipeline, Stage};
use crate::server::analysis::ResultView;
use crate::session::SessionStore;
use crate::tools::ToolInvoker;
use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn stage_message(stage: Stage) -> String {
    match stage {
        Stage::Security => "Running security scan (bandit)...".to_string(),
        Stage::Classify => "Classifying project...".to_string(),
        Stage::MainLinter(tool) => format!("Running {}...", tool),
        Stage::Complexity => "Measuring complexity (radon)...".to_string(),
    }
}

pub fn run(settings: &Settings, path: &Path, level: ExperienceLevel, format: &str) -> Result<()> {
    let json = format == "json";
    let pipeline = AnalysisPipeline::new(Arc::new(ToolInvoker::new(settings.tools.clone())));

    let is_zip = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
        && path.is_file();

    let start = Instant::now();
    let result = if is_zip {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let store = SessionStore::new(
            settings.sessions.root_dir(),
            settings.sessions.prefix.clone(),
        );
        let session = store
            .create_from_zip(&bytes, None)
            .with_context(|| format!("Failed to unpack {}", path.display()))?;
        let result = analyze_dir(&pipeline, &session.directory, level, json);
        if let Err(e) = store.cleanup(&session.id) {
            warn!("Failed to remove temporary session {}: {}", session.id, e);
        }
        result?
    } else {
        let root = path
            .canonicalize()
            .with_context(|| format!("Path does not exist: {}", path.display()))?;
        analyze_dir(&pipeline, &root, level, json)?
    };

    if json {
        let view = ResultView::from(result);
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_text(path, &result, start.elapsed());
    }
    Ok(())
}

fn analyze_dir(
    pipeline: &AnalysisPipeline,
    root: &Path,
    level: ExperienceLevel,
    quiet: bool,
) -> Result<AnalysisResult> {
    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(spinner_style());
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    };

    let result =
        pipeline.analyze_with_progress(root, level, |stage| spinner.set_message(stage_message(stage)));
    spinner.finish_and_clear();
    Ok(result?)
}

fn print_text(path: &Path, result: &AnalysisResult, elapsed: Duration) {
    println!(
        "\n{} {}  ({} project, {} level)\n",
        style("🦩 pink-review").bold().magenta(),
        style(path.display()).cyan(),
        result.project_type,
        result.experience_level
    );

    print_report("Security (bandit)", &result.security_scan);
    print_report(
        &format!("Linting ({})", result.linter),
        &result.main_analysis,
    );
    print_report(
        &format!("Complexity ({})", result.complexity),
        &result.complexity_analysis,
    );

    println!(
        "{} {} issues in {:.1}s",
        style("Total:").bold(),
        result.total_issues(),
        elapsed.as_secs_f64()
    );
}

fn print_report(title: &str, report: &ToolReport) {
    if let Some(error) = report.error.as_deref().filter(|_| !report.success) {
        println!("{} {}: {}", style("⚠").yellow(), style(title).bold(), error);
        println!();
        return;
    }
    if report.issues.is_empty() {
        println!("{} {}: no issues", style("✓").green(), style(title).bold());
        println!();
        return;
    }

    println!(
        "{} {}: {} issues",
        style("●").yellow(),
        style(title).bold(),
        report.issues.len()
    );
    let mut issues: Vec<_> = report.issues.iter().collect();
    issues.sort_by(|a, b| a.file.cmp(&b.file).then(a.line.cmp(&b.line)));
    for issue in issues {
        println!(
            "  {}:{} {} {}",
            style(&issue.file).dim(),
            issue.line,
            style(&issue.code).cyan(),
            issue.message
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ToolKind;

    #[test]
    fn test_stage_messages_name_the_tool() {
        assert!(stage_message(Stage::MainLinter(ToolKind::Pylint)).contains("pylint"));
        assert!(stage_message(Stage::Security).contains("bandit"));
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let settings = Settings::default();
        let err = run(
            &settings,
            Path::new("/definitely/not/here"),
            ExperienceLevel::Intermediate,
            "json",
        )
        .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
