//! pink-review - beginner-friendly code review for Python projects
//!
//! Classifies an uploaded project, runs bandit, the matching linter (ruff or
//! pylint) and radon as subprocesses, and merges their findings into one
//! result. Findings are explained with built-in templates or an optional
//! LLM backend, tuned to a per-user profile.

pub mod ai;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod explain;
pub mod fixes;
pub mod models;
pub mod pipeline;
pub mod profile;
pub mod server;
pub mod session;
pub mod tools;
