//! Project type classification
//!
//! Scores every file under a project root against three marker sets and
//! picks the best-scoring project type. The score for a type grows by one
//! per file whose name or root-relative path contains one of its markers.

use crate::models::ProjectType;
use ignore::WalkBuilder;
use std::path::Path;
use tracing::debug;

const WEB_MARKERS: &[&str] = &["requirements.txt", "pyproject.toml", "django", "flask"];
const EMBEDDED_MARKERS: &[&str] = &["platformio.ini", "makefile", ".ino", ".c"];
const SECURITY_MARKERS: &[&str] = &["auth", "crypto", "security", "jwt"];

/// Scored candidates in tie-break order
const MARKER_SETS: [(ProjectType, &[&str]); 3] = [
    (ProjectType::Web, WEB_MARKERS),
    (ProjectType::Embedded, EMBEDDED_MARKERS),
    (ProjectType::Security, SECURITY_MARKERS),
];

/// Per-type marker scores for a project
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectScores {
    pub web: u32,
    pub embedded: u32,
    pub security: u32,
}

impl ProjectScores {
    fn bump(&mut self, project_type: ProjectType) {
        match project_type {
            ProjectType::Web => self.web += 1,
            ProjectType::Embedded => self.embedded += 1,
            ProjectType::Security => self.security += 1,
            ProjectType::Unknown => {}
        }
    }

    fn get(&self, project_type: ProjectType) -> u32 {
        match project_type {
            ProjectType::Web => self.web,
            ProjectType::Embedded => self.embedded,
            ProjectType::Security => self.security,
            ProjectType::Unknown => 0,
        }
    }

    /// Highest score wins, earlier types win ties, all-zero is unknown
    pub fn winner(&self) -> ProjectType {
        let mut best = ProjectType::Unknown;
        let mut best_score = 0;
        for (project_type, _) in MARKER_SETS {
            let score = self.get(project_type);
            if score > best_score {
                best = project_type;
                best_score = score;
            }
        }
        best
    }
}

fn matches_any(haystacks: &[&str], markers: &[&str]) -> bool {
    markers
        .iter()
        .any(|marker| haystacks.iter().any(|h| h.contains(marker)))
}

/// Score a project's files against every marker set.
///
/// Unreadable subtrees are skipped; a missing root scores zero everywhere.
pub fn score_project(project_root: &Path) -> ProjectScores {
    let mut scores = ProjectScores::default();

    let walker = WalkBuilder::new(project_root)
        .standard_filters(false)
        .follow_links(false)
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable path during classification: {}", e);
                continue;
            }
        };
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }

        let path = entry.path();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let relative = path
            .strip_prefix(project_root)
            .unwrap_or(path)
            .to_string_lossy()
            .to_lowercase();
        let haystacks = [name.as_str(), relative.as_str()];

        for (project_type, markers) in MARKER_SETS {
            if matches_any(&haystacks, markers) {
                scores.bump(project_type);
            }
        }
    }

    scores
}

/// Classify a project directory. Never fails; anything unreadable degrades to `Unknown`.
pub fn classify(project_root: &Path) -> ProjectType {
    let scores = score_project(project_root);
    let project_type = scores.winner();
    debug!(
        "Project scores for {:?}: {:?} -> {}",
        project_root, scores, project_type
    );
    project_type
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_empty_directory_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(classify(dir.path()), ProjectType::Unknown);
    }

    #[test]
    fn test_missing_root_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(classify(&dir.path().join("nope")), ProjectType::Unknown);
    }

    #[test]
    fn test_requirements_only_is_web() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("requirements.txt"), "flask\n").unwrap();
        assert_eq!(classify(dir.path()), ProjectType::Web);
    }

    #[test]
    fn test_markers_are_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Makefile"), "all:\n").unwrap();
        fs::write(dir.path().join("main.C"), "int main() {}\n").unwrap();
        assert_eq!(classify(dir.path()), ProjectType::Embedded);
    }

    #[test]
    fn test_path_components_count() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("crypto");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("keys.py"), "").unwrap();
        fs::write(nested.join("hashing.py"), "").unwrap();
        fs::write(dir.path().join("pyproject.toml"), "").unwrap();

        let scores = score_project(dir.path());
        assert_eq!(scores.security, 2);
        assert_eq!(scores.web, 1);
        assert_eq!(classify(dir.path()), ProjectType::Security);
    }

    #[test]
    fn test_tie_prefers_declaration_order() {
        let scores = ProjectScores {
            web: 2,
            embedded: 2,
            security: 2,
        };
        assert_eq!(scores.winner(), ProjectType::Web);

        let scores = ProjectScores {
            web: 0,
            embedded: 1,
            security: 1,
        };
        assert_eq!(scores.winner(), ProjectType::Embedded);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("auth.py"), "").unwrap();
        fs::write(dir.path().join("app.py"), "").unwrap();
        let first = classify(dir.path());
        let second = classify(dir.path());
        assert_eq!(first, second);
        assert_eq!(first, ProjectType::Security);
    }
}
