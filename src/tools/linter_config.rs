//! Generated configuration files for the analyzers
//!
//! ruff, pylint and bandit each read a config file that is rendered from
//! [`LintRules`]. Files live in one shared directory. Each tool's file is
//! written under that tool's lock and swapped in with a rename, so a
//! concurrent run always reads a complete file.

use crate::config::LintRules;
use crate::models::ToolKind;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

#[derive(Serialize)]
struct RuffFile<'a> {
    lint: RuffLint<'a>,
}

#[derive(Serialize)]
struct RuffLint<'a> {
    select: &'a [String],
    ignore: &'a [String],
    #[serde(rename = "per-file-ignores")]
    per_file_ignores: &'a BTreeMap<String, Vec<String>>,
}

#[derive(Serialize)]
struct BanditFile<'a> {
    target: &'a [String],
    recursive: bool,
    confidence: &'a str,
    severity: &'a str,
    tests: &'a [String],
    skips: &'a [String],
}

/// Owner of the generated config directory
pub struct LinterConfigs {
    dir: PathBuf,
    rules: LintRules,
    locks: HashMap<ToolKind, Mutex<()>>,
}

impl LinterConfigs {
    pub fn new(dir: impl Into<PathBuf>, rules: LintRules) -> Self {
        let locks = ToolKind::ALL
            .iter()
            .map(|tool| (*tool, Mutex::new(())))
            .collect();
        Self {
            dir: dir.into(),
            rules,
            locks,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Config file name for a tool, `None` when the tool takes no config
    pub fn file_name(tool: ToolKind) -> Option<&'static str> {
        match tool {
            ToolKind::Ruff => Some("ruff.toml"),
            ToolKind::Pylint => Some(".pylintrc"),
            ToolKind::Bandit => Some(".bandit"),
            ToolKind::Radon => None,
        }
    }

    /// Render a tool's config file contents
    pub fn render(&self, tool: ToolKind) -> io::Result<Option<String>> {
        let content = match tool {
            ToolKind::Ruff => {
                let rules = &self.rules.ruff;
                let file = RuffFile {
                    lint: RuffLint {
                        select: &rules.select,
                        ignore: &rules.ignore,
                        per_file_ignores: &rules.per_file_ignores,
                    },
                };
                toml::to_string(&file).map_err(io::Error::other)?
            }
            ToolKind::Pylint => {
                let rules = &self.rules.pylint;
                let mut out = String::new();
                let _ = writeln!(out, "[MASTER]");
                let _ = writeln!(out, "load-plugins = {}", rules.load_plugins.join(","));
                let _ = writeln!(out);
                let _ = writeln!(out, "[MESSAGES CONTROL]");
                let _ = writeln!(out, "disable = {}", rules.disable.join(","));
                out
            }
            ToolKind::Bandit => {
                let rules = &self.rules.bandit;
                let file = BanditFile {
                    target: &rules.targets,
                    recursive: rules.recursive,
                    confidence: &rules.confidence,
                    severity: &rules.severity,
                    tests: &rules.tests,
                    skips: &rules.skips,
                };
                serde_json::to_string_pretty(&file).map_err(io::Error::other)?
            }
            ToolKind::Radon => return Ok(None),
        };
        Ok(Some(content))
    }

    /// Write the tool's config file and return its path
    pub fn ensure(&self, tool: ToolKind) -> io::Result<Option<PathBuf>> {
        let Some(name) = Self::file_name(tool) else {
            return Ok(None);
        };
        let Some(content) = self.render(tool)? else {
            return Ok(None);
        };

        let _guard = self
            .locks
            .get(&tool)
            .map(|lock| lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner()));

        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        let staging = self
            .dir
            .join(format!("{}.{}.tmp", name.trim_start_matches('.'), std::process::id()));
        std::fs::write(&staging, content)?;
        std::fs::rename(&staging, &path)?;

        debug!("Wrote {} config to {}", tool, path.display());
        Ok(Some(path))
    }

    /// Current generated config for every tool that takes one, keyed by tool name
    pub fn snapshot(&self) -> io::Result<BTreeMap<String, String>> {
        let mut configs = BTreeMap::new();
        for tool in [ToolKind::Ruff, ToolKind::Pylint, ToolKind::Bandit] {
            if let Some(path) = self.ensure(tool)? {
                configs.insert(tool.name().to_string(), std::fs::read_to_string(path)?);
            }
        }
        Ok(configs)
    }
}
