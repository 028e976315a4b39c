//! Built-in explanation templates
//!
//! Keyed by issue code, then experience level. Codes without a template for a
//! level use the `generic` entry for that level.

use crate::models::{ExperienceLevel, Issue};
use regex::{Captures, Regex};
use serde::Serialize;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Template {
    pub title: &'static str,
    pub why: &'static str,
    pub fix: &'static str,
    pub example: &'static str,
}

/// Template fields after placeholder substitution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedTemplate {
    pub title: String,
    pub why: String,
    pub fix: String,
    pub example: String,
}

const fn t(
    title: &'static str,
    why: &'static str,
    fix: &'static str,
    example: &'static str,
) -> Template {
    Template {
        title,
        why,
        fix,
        example,
    }
}

use ExperienceLevel::{Advanced, Beginner, Intermediate};

const GENERIC: [(ExperienceLevel, Template); 3] = [
    (
        Beginner,
        t(
            "{code}: something to tidy up",
            "The checker noticed this on line {line} of {file}: {message}. Small issues like this make code harder to read for the next person, including future you.",
            "Open {file}, go to line {line} and read the message carefully. Search the code {code} online for a short description of the rule.",
            "Look at the line the tool points to and compare it with the rule's description.",
        ),
    ),
    (
        Intermediate,
        t(
            "{code}: {message}",
            "{message} ({file}:{line}). Rules like this catch patterns that tend to hide bugs or slow down reviews.",
            "Fix the reported construct at {file}:{line}. If the rule does not fit this codebase, disable it explicitly in the linter config instead of ignoring it.",
            "See the rule documentation for {code} for before/after examples.",
        ),
    ),
    (
        Advanced,
        t(
            "{code}",
            "{message} at {file}:{line} (severity: {severity}).",
            "Address it or suppress it with a justified inline comment.",
            "",
        ),
    ),
];

const BY_CODE: &[(&str, ExperienceLevel, Template)] = &[
    (
        "F401",
        Beginner,
        t(
            "You imported something you never use",
            "Line {line} of {file} imports a module that nothing else in the file uses. Unused imports make it look like the file depends on things it does not.",
            "Delete the import on line {line}. If you plan to use it soon, add it back when you actually need it.",
            "# Before\nimport os\nprint(\"hi\")\n\n# After\nprint(\"hi\")",
        ),
    ),
    (
        "F401",
        Intermediate,
        t(
            "Unused import",
            "{message}. Unused imports add load time and hide the module's real dependencies.",
            "Remove the import. If it is a deliberate re-export, list it in `__all__`.",
            "from .models import User  # re-export\n__all__ = [\"User\"]",
        ),
    ),
    (
        "E501",
        Beginner,
        t(
            "This line is too long",
            "Line {line} is longer than the style guide allows. Long lines are hard to read, especially side by side with other code.",
            "Split the line. Python lets you break lines inside parentheses, brackets and braces.",
            "total = (first_value\n         + second_value\n         + third_value)",
        ),
    ),
    (
        "E501",
        Intermediate,
        t(
            "Line too long",
            "{message}. Wrapped lines keep diffs readable and fit split-screen editors.",
            "Break at an operator inside parentheses, or extract a well-named variable.",
            "is_valid = user.is_active and user.email_verified\nif is_valid:\n    ...",
        ),
    ),
    (
        "W291",
        Beginner,
        t(
            "Extra spaces at the end of a line",
            "Line {line} ends with spaces you cannot see. They create noisy changes in version control.",
            "Delete the spaces after the last character on line {line}. Most editors can strip them on save.",
            "x = 1   <- remove these spaces",
        ),
    ),
    (
        "D100",
        Beginner,
        t(
            "This file has no description",
            "{file} does not start with a docstring, so readers cannot tell at a glance what the module is for.",
            "Add a short sentence in triple quotes as the very first line of the file.",
            "\"\"\"Helpers for loading user settings.\"\"\"\n\nimport json",
        ),
    ),
    (
        "D100",
        Intermediate,
        t(
            "Missing module docstring",
            "Module docstrings show up in `help()` and generated docs.",
            "Add a one-line summary docstring at the top of {file}.",
            "\"\"\"User settings loading and validation.\"\"\"",
        ),
    ),
    (
        "C0114",
        Beginner,
        t(
            "This file has no description",
            "{file} does not start with a docstring, so readers cannot tell at a glance what the module is for.",
            "Add a short sentence in triple quotes as the very first line of the file.",
            "\"\"\"Helpers for loading user settings.\"\"\"",
        ),
    ),
    (
        "B101",
        Beginner,
        t(
            "Don't rely on assert for checks",
            "Python removes `assert` statements when run with optimizations (-O), so the check on line {line} can silently disappear.",
            "Use an `if` statement and raise an exception instead.",
            "# Before\nassert user is not None\n\n# After\nif user is None:\n    raise ValueError(\"user is required\")",
        ),
    ),
    (
        "B101",
        Intermediate,
        t(
            "assert used for runtime checks",
            "{message}. Asserts are stripped under `python -O`.",
            "Raise an explicit exception for conditions that must hold in production; keep `assert` for tests.",
            "if not token:\n    raise PermissionError(\"missing token\")",
        ),
    ),
];

/// Raw template for `code` at `level`, falling back to the generic one
pub fn lookup(code: &str, level: ExperienceLevel) -> Template {
    BY_CODE
        .iter()
        .find(|(c, l, _)| *c == code && *l == level)
        .map(|(_, _, template)| *template)
        .unwrap_or_else(|| generic(level))
}

/// Whether a code has a dedicated template at any level
pub fn has_specific(code: &str) -> bool {
    BY_CODE.iter().any(|(c, _, _)| *c == code)
}

fn generic(level: ExperienceLevel) -> Template {
    match level {
        Beginner => GENERIC[0].1,
        Intermediate => GENERIC[1].1,
        Advanced => GENERIC[2].1,
    }
}

fn placeholder_pattern() -> Option<&'static Regex> {
    static PLACEHOLDER: OnceLock<Option<Regex>> = OnceLock::new();
    PLACEHOLDER
        .get_or_init(|| Regex::new(r"\{([a-z_]+)\}").ok())
        .as_ref()
}

/// Substitute `{code}`, `{message}`, `{file}`, `{line}` and `{severity}`.
/// Any other `{name}` is left as written.
pub fn fill(text: &str, issue: &Issue) -> String {
    let Some(pattern) = placeholder_pattern() else {
        return text.to_string();
    };
    pattern
        .replace_all(text, |caps: &Captures| match &caps[1] {
            "code" => issue.code.clone(),
            "message" => issue.message.clone(),
            "file" => issue.file.clone(),
            "line" => issue.line.to_string(),
            "severity" => issue
                .severity
                .clone()
                .unwrap_or_else(|| "unspecified".to_string()),
            _ => caps[0].to_string(),
        })
        .into_owned()
}

impl Template {
    pub fn format(&self, issue: &Issue) -> FormattedTemplate {
        FormattedTemplate {
            title: fill(self.title, issue),
            why: fill(self.why, issue),
            fix: fill(self.fix, issue),
            example: fill(self.example, issue),
        }
    }
}
