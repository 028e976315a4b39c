//! Core data models for pink-review

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unified classification assigned to every issue, independent of the source tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Error,
    Warning,
    Security,
    Complexity,
    Convention,
    Refactor,
    #[default]
    Info,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Error => "error",
            Category::Warning => "warning",
            Category::Security => "security",
            Category::Complexity => "complexity",
            Category::Convention => "convention",
            Category::Refactor => "refactor",
            Category::Info => "info",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External analyzers the pipeline knows how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Ruff,
    Pylint,
    Bandit,
    Radon,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::Bandit,
        ToolKind::Ruff,
        ToolKind::Pylint,
        ToolKind::Radon,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Ruff => "ruff",
            ToolKind::Pylint => "pylint",
            ToolKind::Bandit => "bandit",
            ToolKind::Radon => "radon",
        }
    }

    /// Whether the tool is skipped when the target holds no Python sources.
    /// Radon is allowed to run on an empty tree.
    pub fn requires_sources(&self) -> bool {
        !matches!(self, ToolKind::Radon)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Coarse project classification used to pick the main linter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Web,
    Embedded,
    Security,
    #[default]
    Unknown,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Web => "web",
            ProjectType::Embedded => "embedded",
            ProjectType::Security => "security",
            ProjectType::Unknown => "unknown",
        }
    }

    /// Main linter for this kind of project
    pub fn main_linter(&self) -> ToolKind {
        match self {
            ProjectType::Web => ToolKind::Ruff,
            ProjectType::Embedded | ProjectType::Security | ProjectType::Unknown => {
                ToolKind::Pylint
            }
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much detail a user wants in feedback
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl ExperienceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Beginner => "beginner",
            ExperienceLevel::Intermediate => "intermediate",
            ExperienceLevel::Advanced => "advanced",
        }
    }
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExperienceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(ExperienceLevel::Beginner),
            "intermediate" => Ok(ExperienceLevel::Intermediate),
            "advanced" => Ok(ExperienceLevel::Advanced),
            other => Err(format!("unknown experience level '{}'", other)),
        }
    }
}

/// A single normalized finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(alias = "type")]
    pub category: Category,
    pub file: String,
    #[serde(default)]
    pub line: u32,
    pub message: String,
    pub code: String,
    pub source_tool: ToolKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Cyclomatic complexity, complexity tool only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<u32>,
}

impl Issue {
    pub fn new(
        category: Category,
        source_tool: ToolKind,
        file: impl Into<String>,
        line: u32,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            file: file.into(),
            line,
            message: message.into(),
            code: code.into(),
            source_tool,
            severity: None,
            confidence: None,
            url: None,
            complexity: None,
        }
    }

    /// Rule codes starting with E or F are hidden from beginners
    pub fn is_advanced_only(&self) -> bool {
        self.code.starts_with('E') || self.code.starts_with('F')
    }

    /// One-line summary shown next to the issue, e.g. `[Error] F401: unused import`
    pub fn flamingo_message(&self) -> String {
        let category = self.category.as_str();
        let mut chars = category.chars();
        let label = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        };
        format!("[{}] {}: {}", label, self.code, self.message)
    }
}

/// Outcome of one analyzer within a combined result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ToolReport {
    pub success: bool,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ToolReport {
    pub fn ok(issues: Vec<Issue>) -> Self {
        Self {
            success: true,
            issues,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            issues: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Combined output of the security, main-linter and complexity passes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub project_type: ProjectType,
    /// Name of the main linter that produced `main_analysis`
    pub linter: ToolKind,
    pub complexity: ToolKind,
    pub experience_level: ExperienceLevel,
    pub security_scan: ToolReport,
    pub main_analysis: ToolReport,
    pub complexity_analysis: ToolReport,
}

impl AnalysisResult {
    pub fn total_issues(&self) -> usize {
        self.security_scan.issues.len()
            + self.main_analysis.issues.len()
            + self.complexity_analysis.issues.len()
    }

    /// Swap the main-analysis issues for one file with a fresh set
    pub fn replace_file_issues(&mut self, file: &str, issues: Vec<Issue>) {
        self.main_analysis.issues.retain(|issue| issue.file != file);
        self.main_analysis.issues.extend(issues);
    }
}
