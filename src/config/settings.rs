//! Service settings for pink-review
//!
//! Supports loading settings from:
//! - An explicit `--config` path
//! - ./pink-review.toml
//! - ~/.config/pink-review/config.toml
//! - Environment variables (highest priority)

use crate::models::ToolKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Project-local config file name
pub const LOCAL_CONFIG_FILE: &str = "pink-review.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub sessions: SessionSettings,
    pub pipeline: PipelineSettings,
    pub tools: ToolsSettings,
    pub ai: AiSettings,
    pub profiles: ProfileSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
    pub cors_origins: Vec<String>,
    /// Upper bound on session cleanup at shutdown
    pub shutdown_cleanup_secs: u64,
    /// Largest accepted upload, in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
            shutdown_cleanup_secs: 5,
            max_upload_bytes: 64 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Parent directory for session working directories (default: system temp dir)
    pub root: Option<PathBuf>,
    pub prefix: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            root: None,
            prefix: "pink-coded-".to_string(),
        }
    }
}

impl SessionSettings {
    pub fn root_dir(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Wall-clock limit for one full analysis
    pub timeout_secs: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self { timeout_secs: 900 }
    }
}

/// Overrides for one analyzer. Unset fields use the tool's defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolSettings {
    pub program: Option<String>,
    pub success_codes: Option<Vec<i32>>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolsSettings {
    pub timeout_secs: u64,
    /// Where generated tool configs are written (default: {temp}/pink-coded-config)
    pub config_dir: Option<PathBuf>,
    pub ruff: ToolSettings,
    pub pylint: ToolSettings,
    pub bandit: ToolSettings,
    pub radon: ToolSettings,
    pub rules: LintRules,
}

impl Default for ToolsSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            config_dir: None,
            ruff: ToolSettings::default(),
            pylint: ToolSettings::default(),
            bandit: ToolSettings::default(),
            radon: ToolSettings::default(),
            rules: LintRules::default(),
        }
    }
}

impl ToolsSettings {
    pub fn tool(&self, tool: ToolKind) -> &ToolSettings {
        match tool {
            ToolKind::Ruff => &self.ruff,
            ToolKind::Pylint => &self.pylint,
            ToolKind::Bandit => &self.bandit,
            ToolKind::Radon => &self.radon,
        }
    }

    pub fn program(&self, tool: ToolKind) -> String {
        self.tool(tool)
            .program
            .clone()
            .unwrap_or_else(|| tool.name().to_string())
    }

    pub fn timeout_secs(&self, tool: ToolKind) -> u64 {
        self.tool(tool).timeout_secs.unwrap_or(self.timeout_secs)
    }

    pub fn success_codes(&self, tool: ToolKind) -> Vec<i32> {
        self.tool(tool)
            .success_codes
            .clone()
            .unwrap_or_else(|| default_success_codes(tool))
    }

    pub fn config_dir(&self) -> PathBuf {
        self.config_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("pink-coded-config"))
    }
}

/// Exit codes that mean "the tool ran", findings or not.
///
/// ruff exits 1 when it reports violations and bandit exits 1 when it finds
/// issues. pylint ORs together message-class bits; only the fatal bit (1) and
/// the usage-error bit (32) mean the run itself broke.
pub fn default_success_codes(tool: ToolKind) -> Vec<i32> {
    match tool {
        ToolKind::Ruff | ToolKind::Bandit => vec![0, 1],
        ToolKind::Pylint => (0..32).filter(|code| code & 1 == 0).collect(),
        ToolKind::Radon => vec![0],
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LintRules {
    pub ruff: RuffRules,
    pub pylint: PylintRules,
    pub bandit: BanditRules,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RuffRules {
    pub select: Vec<String>,
    pub ignore: Vec<String>,
    pub per_file_ignores: BTreeMap<String, Vec<String>>,
}

impl Default for RuffRules {
    fn default() -> Self {
        let mut per_file_ignores = BTreeMap::new();
        per_file_ignores.insert("__init__.py".to_string(), vec!["F401".to_string()]);
        per_file_ignores.insert("tests/*".to_string(), vec!["S101".to_string()]);
        Self {
            select: ["E", "F", "W", "B", "I", "UP", "D"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ignore: ["E501", "D203", "D212"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            per_file_ignores,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PylintRules {
    pub load_plugins: Vec<String>,
    pub disable: Vec<String>,
}

impl Default for PylintRules {
    fn default() -> Self {
        Self {
            load_plugins: vec!["pylint.extensions.mccabe".to_string()],
            disable: ["missing-docstring", "too-few-public-methods", "invalid-name"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BanditRules {
    pub targets: Vec<String>,
    pub recursive: bool,
    pub confidence: String,
    pub severity: String,
    pub tests: Vec<String>,
    pub skips: Vec<String>,
}

impl Default for BanditRules {
    fn default() -> Self {
        Self {
            targets: vec!["*".to_string()],
            recursive: true,
            confidence: "low".to_string(),
            severity: "low".to_string(),
            tests: Vec::new(),
            skips: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AiSettings {
    /// Set to false to always use built-in templates
    pub enabled: bool,
    /// "deepseek" (default), "openai" or "ollama"
    pub backend: String,
    pub model: Option<String>,
    /// Endpoint override, e.g. a remote Ollama host
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: "deepseek".to_string(),
            model: None,
            api_url: None,
            api_key: None,
            temperature: 0.7,
            max_tokens: 1000,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProfileSettings {
    pub dir: PathBuf,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("user_profiles"),
        }
    }
}

impl Settings {
    /// Load settings with priority:
    /// 1. Environment variables (highest)
    /// 2. `explicit` path, else ./pink-review.toml, else the user config file
    /// 3. Built-in defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut settings = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::discover() {
                Some(path) => Self::from_file(&path)?,
                None => Settings::default(),
            },
        };

        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Some(local);
        }
        Self::user_config_path().filter(|p| p.is_file())
    }

    /// Parse one settings file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Get the user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("pink-review").join("config.toml"))
    }

    /// Apply environment overrides. `lookup` is injectable for tests.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(bind) = lookup("PINK_REVIEW_BIND") {
            self.server.bind = bind;
        }
        if let Some(root) = lookup("PINK_REVIEW_SESSION_ROOT") {
            self.sessions.root = Some(PathBuf::from(root));
        }
        if let Some(dir) = lookup("PINK_REVIEW_PROFILE_DIR") {
            self.profiles.dir = PathBuf::from(dir);
        }
        let env_key = match self.ai.backend.as_str() {
            "openai" => Some("OPENAI_API_KEY"),
            "ollama" => None,
            _ => Some("DEEPSEEK_API_KEY"),
        };
        if let Some(key) = env_key.and_then(&lookup) {
            self.ai.api_key = Some(key);
        }
    }

    /// Write an example config to `path` unless one already exists
    pub fn init_config(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, EXAMPLE_CONFIG)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(true)
    }
}

const EXAMPLE_CONFIG: &str = r#"# pink-review configuration

[server]
# bind = "127.0.0.1:8000"
# cors_origins = ["http://localhost:3000"]
# shutdown_cleanup_secs = 5

[sessions]
# root = "/var/tmp/pink-review"

[pipeline]
# timeout_secs = 900

[tools]
# timeout_secs = 300
# config_dir = "/tmp/pink-coded-config"

# Per-tool overrides
# [tools.ruff]
# program = "/opt/venv/bin/ruff"
# success_codes = [0, 1]

# [tools.rules.ruff]
# select = ["E", "F", "W", "B", "I", "UP", "D"]
# ignore = ["E501", "D203", "D212"]

[ai]
# backend = "deepseek"   # or "openai", "ollama"
# api_key = "sk-..."     # or set DEEPSEEK_API_KEY
# model = "deepseek-coder"
# api_url = "http://gpu-box:11434/v1/chat/completions"
# enabled = true

[profiles]
# dir = "user_profiles"
"#;
