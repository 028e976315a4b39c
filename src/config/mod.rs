//! Configuration module for pink-review
//!
//! This module handles:
//! - Service settings (pink-review.toml)
//! - Analyzer programs, exit codes and lint rules
//! - Environment overrides

mod settings;

pub use settings::{
    default_success_codes,
    AiSettings,
    BanditRules,
    LintRules,
    PipelineSettings,
    ProfileSettings,
    PylintRules,
    RuffRules,
    ServerSettings,
    SessionSettings,
    Settings,
    ToolSettings,
    ToolsSettings,
    LOCAL_CONFIG_FILE,
};
