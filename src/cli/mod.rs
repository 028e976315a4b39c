//! CLI command definitions and handlers

mod analyze;
mod debug_config;
mod doctor;
mod init;
mod serve;

use crate::config::Settings;
use crate::models::ExperienceLevel;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// pink-review - beginner-friendly Python code review
#[derive(Parser, Debug)]
#[command(name = "pink-review")]
#[command(
    version,
    about = "Runs bandit, ruff, pylint and radon on Python projects and explains the findings",
    long_about = "pink-review classifies a Python project, runs a security scan, the linter \
that fits the project and a complexity analysis, and merges everything into one result. \
Run it as an HTTP service for the web UI, or one-shot from the terminal.",
    after_help = "\
Examples:
  pink-review serve                          Start the HTTP service on 127.0.0.1:8000
  pink-review analyze ./my-project           Analyze a directory
  pink-review analyze project.zip -f json    Analyze a zip archive, JSON output
  pink-review doctor                         Check which analyzers are installed"
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Config file (default: ./pink-review.toml, then the user config dir)
    #[arg(long, global = true, env = "PINK_REVIEW_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP service
    Serve {
        /// Address to listen on (overrides [server].bind)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Analyze a project directory or zip archive once
    #[command(after_help = "\
Examples:
  pink-review analyze .                      Analyze current directory
  pink-review analyze . --level beginner     Hide E/F linter codes
  pink-review analyze upload.zip -f json     JSON output for scripting")]
    Analyze {
        /// Project directory or .zip archive
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Experience level: beginner, intermediate, advanced
        #[arg(long, short = 'l', default_value = "intermediate")]
        level: ExperienceLevel,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Check that the analyzers are installed and AI is configured
    Doctor,

    /// Print the generated ruff, pylint and bandit configs
    DebugConfig,

    /// Write an example pink-review.toml
    Init {
        /// Where to write the file
        #[arg(default_value = crate::config::LOCAL_CONFIG_FILE)]
        path: PathBuf,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    if let Commands::Init { path } = &cli.command {
        return init::run(path);
    }

    let settings = Settings::load(cli.config.as_deref())?;
    match cli.command {
        Commands::Serve { bind } => serve::run(settings, bind),
        Commands::Analyze {
            path,
            level,
            format,
        } => analyze::run(&settings, &path, level, &format),
        Commands::Doctor => doctor::run(&settings),
        Commands::DebugConfig => debug_config::run(&settings),
        Commands::Init { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_analyze_args() {
        let cli = Cli::try_parse_from([
            "pink-review",
            "analyze",
            "proj.zip",
            "--level",
            "beginner",
            "-f",
            "json",
        ])
        .unwrap();
        match cli.command {
            Commands::Analyze {
                path,
                level,
                format,
            } => {
                assert_eq!(path, PathBuf::from("proj.zip"));
                assert_eq!(level, ExperienceLevel::Beginner);
                assert_eq!(format, "json");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_level() {
        assert!(Cli::try_parse_from(["pink-review", "analyze", ".", "--level", "guru"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "pink-review",
            "doctor",
            "--log-level",
            "debug",
            "--config",
            "x.toml",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
    }
}
