//! Learner profiles
//!
//! A profile tracks how experienced a user is, which issues they keep running
//! into and the points they have earned. Profiles are stored as one JSON file
//! per user in a flat directory.

use crate::models::ExperienceLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

/// Sightings after which an issue code counts as a weak area
const WEAK_AREA_THRESHOLD: u32 = 3;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Invalid user id: '{0}'")]
    InvalidUserId(String),

    #[error("Corrupt profile {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Profile storage error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub issue_code: String,
    pub helpful: bool,
    pub level: ExperienceLevel,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub user_id: String,
    pub experience_level: ExperienceLevel,
    /// Concepts the user is familiar with, e.g. `OOP`
    pub known_concepts: BTreeSet<String>,
    pub weak_areas: BTreeSet<String>,
    /// Issue code -> times seen
    pub seen_issues: BTreeMap<String, u32>,
    pub flamingo_points: i64,
    pub achievements: BTreeSet<String>,
    pub quiz_completed: bool,
    pub feedback_log: Vec<FeedbackEntry>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self::new("")
    }
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            experience_level: ExperienceLevel::default(),
            known_concepts: BTreeSet::new(),
            weak_areas: BTreeSet::new(),
            seen_issues: BTreeMap::new(),
            flamingo_points: 0,
            achievements: BTreeSet::new(),
            quiz_completed: false,
            feedback_log: Vec::new(),
        }
    }

    pub fn record_issue(&mut self, code: &str) {
        let count = self.seen_issues.entry(code.to_string()).or_insert(0);
        *count += 1;
        if *count > WEAK_AREA_THRESHOLD {
            if let Some(base) = code.split_whitespace().next() {
                self.weak_areas.insert(base.to_string());
            }
        }
    }

    pub fn update_from_quiz(&mut self, score: u32, level: ExperienceLevel) {
        self.experience_level = level;
        self.flamingo_points += i64::from(score) * 10;
        self.quiz_completed = true;

        if score > 80 {
            self.achievements.insert("quick_learner".to_string());
        }
        if level == ExperienceLevel::Advanced {
            self.achievements.insert("code_master".to_string());
        }
    }

    pub fn adjust_level_based_on_feedback(&mut self, helpful: bool) {
        match (helpful, self.experience_level) {
            (true, ExperienceLevel::Beginner) => self.flamingo_points += 5,
            (true, ExperienceLevel::Intermediate) => self.flamingo_points += 3,
            (true, ExperienceLevel::Advanced) => {}
            (false, ExperienceLevel::Advanced) => {
                self.experience_level = ExperienceLevel::Intermediate
            }
            (false, ExperienceLevel::Intermediate) => self.flamingo_points -= 2,
            (false, ExperienceLevel::Beginner) => {}
        }
    }

    /// Log explanation feedback and adjust the profile accordingly
    pub fn record_feedback(&mut self, issue_code: &str, helpful: bool, level: ExperienceLevel) {
        self.feedback_log.push(FeedbackEntry {
            issue_code: issue_code.to_string(),
            helpful,
            level,
            timestamp: Utc::now(),
        });
        self.adjust_level_based_on_feedback(helpful);
    }
}

/// Ids become file names, so only a conservative character set is accepted
pub fn validate_user_id(user_id: &str) -> Result<(), ProfileError> {
    let valid = !user_id.is_empty()
        && user_id.len() <= 128
        && !user_id.starts_with('.')
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'));
    if valid {
        Ok(())
    } else {
        Err(ProfileError::InvalidUserId(user_id.to_string()))
    }
}

/// Flat-file profile storage
pub struct ProfileStore {
    dir: PathBuf,
    /// Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, user_id: &str) -> Result<PathBuf, ProfileError> {
        validate_user_id(user_id)?;
        Ok(self.dir.join(format!("{}.json", user_id)))
    }

    /// Load a profile; users without a file get a fresh default
    pub fn get(&self, user_id: &str) -> Result<UserProfile, ProfileError> {
        let path = self.path_for(user_id)?;
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(UserProfile::new(user_id));
            }
            Err(e) => return Err(e.into()),
        };
        let mut profile: UserProfile = serde_json::from_str(&content)
            .map_err(|source| ProfileError::Corrupt { path, source })?;
        profile.user_id = user_id.to_string();
        Ok(profile)
    }

    pub fn save(&self, profile: &UserProfile) -> Result<(), ProfileError> {
        let path = self.path_for(&profile.user_id)?;
        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(profile)
            .map_err(|e| ProfileError::Io(std::io::Error::other(e)))?;
        let staging = self
            .dir
            .join(format!("{}.{}.tmp", profile.user_id, std::process::id()));
        std::fs::write(&staging, json)?;
        std::fs::rename(&staging, &path)?;
        debug!("Saved profile {}", profile.user_id);
        Ok(())
    }

    /// Load, modify and save a profile as one step
    pub fn update(
        &self,
        user_id: &str,
        change: impl FnOnce(&mut UserProfile),
    ) -> Result<UserProfile, ProfileError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut profile = self.get(user_id)?;
        change(&mut profile);
        self.save(&profile)?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_issue_marks_weak_area_after_three() {
        let mut profile = UserProfile::new("ana");
        for _ in 0..3 {
            profile.record_issue("E501");
        }
        assert!(profile.weak_areas.is_empty());
        profile.record_issue("E501");
        assert_eq!(profile.seen_issues["E501"], 4);
        assert!(profile.weak_areas.contains("E501"));
    }

    #[test]
    fn test_quiz_awards() {
        let mut profile = UserProfile::new("ana");
        profile.update_from_quiz(90, ExperienceLevel::Advanced);
        assert_eq!(profile.flamingo_points, 900);
        assert!(profile.quiz_completed);
        assert!(profile.achievements.contains("quick_learner"));
        assert!(profile.achievements.contains("code_master"));

        let mut other = UserProfile::new("ben");
        other.update_from_quiz(50, ExperienceLevel::Beginner);
        assert!(other.achievements.is_empty());
        assert_eq!(other.experience_level, ExperienceLevel::Beginner);
    }

    #[test]
    fn test_feedback_adjustments() {
        let mut profile = UserProfile::new("ana");
        profile.experience_level = ExperienceLevel::Beginner;
        profile.adjust_level_based_on_feedback(true);
        assert_eq!(profile.flamingo_points, 5);

        profile.experience_level = ExperienceLevel::Intermediate;
        profile.adjust_level_based_on_feedback(true);
        profile.adjust_level_based_on_feedback(false);
        assert_eq!(profile.flamingo_points, 6);

        profile.experience_level = ExperienceLevel::Advanced;
        profile.adjust_level_based_on_feedback(false);
        assert_eq!(profile.experience_level, ExperienceLevel::Intermediate);
    }

    #[test]
    fn test_record_feedback_logs_entry() {
        let mut profile = UserProfile::new("ana");
        profile.record_feedback("W291", true, ExperienceLevel::Intermediate);
        assert_eq!(profile.feedback_log.len(), 1);
        assert_eq!(profile.feedback_log[0].issue_code, "W291");
        assert_eq!(profile.flamingo_points, 3);
    }

    #[test]
    fn test_user_id_validation() {
        for ok in ["ana", "user-1", "a.b@example.com", "x_y"] {
            assert!(validate_user_id(ok).is_ok(), "{ok}");
        }
        for bad in ["", "..", "../etc", "a/b", ".hidden", "a b"] {
            assert!(validate_user_id(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("profiles"));

        let fresh = store.get("ana").unwrap();
        assert_eq!(fresh, UserProfile::new("ana"));

        let updated = store
            .update("ana", |p| {
                p.known_concepts.insert("OOP".into());
                p.record_issue("F401");
            })
            .unwrap();
        assert_eq!(store.get("ana").unwrap(), updated);
        assert!(dir.path().join("profiles/ana.json").is_file());
    }

    #[test]
    fn test_store_rejects_bad_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        assert!(matches!(
            store.get("../escape"),
            Err(ProfileError::InvalidUserId(_))
        ));
    }

    #[test]
    fn test_partial_profile_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("ana.json"),
            r#"{"user_id": "ana", "experience_level": "advanced"}"#,
        )
        .unwrap();
        let profile = ProfileStore::new(dir.path()).get("ana").unwrap();
        assert_eq!(profile.experience_level, ExperienceLevel::Advanced);
        assert!(profile.seen_issues.is_empty());
    }

    #[test]
    fn test_corrupt_profile_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ana.json"), "{").unwrap();
        assert!(matches!(
            ProfileStore::new(dir.path()).get("ana"),
            Err(ProfileError::Corrupt { .. })
        ));
    }
}
