//! Upload sessions
//!
//! A session binds an uploaded project to a working directory and the last
//! analysis result computed for it. The registry lives inside a
//! [`SessionStore`] owned by the server state; every mutation goes through its
//! mutex.

pub mod archive;

pub use archive::{build_export, export_file_name, extract_bytes, extract_zip, ArchiveError};

use crate::models::AnalysisResult;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Invalid file path: {0}")]
    InvalidPath(String),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub directory: PathBuf,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_result: Option<AnalysisResult>,
}

pub struct SessionStore {
    root: PathBuf,
    prefix: String,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Allocate a session id and its working directory
    pub fn create(&self, user_id: Option<&str>) -> Result<Session, SessionError> {
        let id = Uuid::new_v4().to_string();
        let directory = self.root.join(format!("{}{}", self.prefix, id));
        std::fs::create_dir_all(&directory)?;

        let session = Session {
            id: id.clone(),
            directory,
            user_id: user_id.map(str::to_string),
            created_at: Utc::now(),
            last_result: None,
        };
        self.registry().insert(id, session.clone());
        debug!("Created session {} at {}", session.id, session.directory.display());
        Ok(session)
    }

    /// Create a session and unpack `bytes` into it.
    ///
    /// A bad archive removes the half-built session before the error is returned.
    pub fn create_from_zip(
        &self,
        bytes: &[u8],
        user_id: Option<&str>,
    ) -> Result<Session, SessionError> {
        let session = self.create(user_id)?;
        match extract_bytes(bytes, &session.directory) {
            Ok(count) => {
                info!("Session {}: extracted {} files", session.id, count);
                Ok(session)
            }
            Err(e) => {
                if let Err(cleanup) = self.cleanup(&session.id) {
                    warn!("Failed to discard session {}: {}", session.id, cleanup);
                }
                Err(e.into())
            }
        }
    }

    pub fn get_directory(&self, id: &str) -> Result<PathBuf, SessionError> {
        self.registry()
            .get(id)
            .map(|s| s.directory.clone())
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Resolve a project-relative path inside a session directory.
    ///
    /// Absolute paths and `..` components are rejected.
    pub fn resolve(&self, id: &str, relative: &str) -> Result<PathBuf, SessionError> {
        let directory = self.get_directory(id)?;
        let path = Path::new(relative);
        let clean = !relative.is_empty()
            && path
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !clean {
            return Err(SessionError::InvalidPath(relative.to_string()));
        }
        Ok(directory.join(path))
    }

    pub fn attach_result(&self, id: &str, result: AnalysisResult) -> Result<(), SessionError> {
        let mut sessions = self.registry();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.last_result = Some(result);
        Ok(())
    }

    pub fn last_result(&self, id: &str) -> Result<Option<AnalysisResult>, SessionError> {
        self.registry()
            .get(id)
            .map(|s| s.last_result.clone())
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Edit the cached result in place while holding the registry lock.
    ///
    /// Returns `Ok(None)` when the session has no result yet.
    pub fn update_result<T>(
        &self,
        id: &str,
        update: impl FnOnce(&mut AnalysisResult) -> T,
    ) -> Result<Option<T>, SessionError> {
        let mut sessions = self.registry();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        Ok(session.last_result.as_mut().map(update))
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.registry().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.registry().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget a session and delete its directory
    pub fn cleanup(&self, id: &str) -> Result<(), SessionError> {
        let session = self
            .registry()
            .remove(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        remove_dir(&session.directory)?;
        info!("Cleaned up session {}", id);
        Ok(())
    }

    /// Remove every session. Failures are logged and the sweep continues.
    ///
    /// Returns how many directories were removed.
    pub fn cleanup_all(&self) -> usize {
        let drained: Vec<Session> = self.registry().drain().map(|(_, s)| s).collect();
        let mut removed = 0;
        for session in drained {
            match remove_dir(&session.directory) {
                Ok(()) => removed += 1,
                Err(e) => warn!(
                    "Failed to remove session directory {}: {}",
                    session.directory.display(),
                    e
                ),
            }
        }
        if removed > 0 {
            info!("Removed {} session directories", removed);
        }
        removed
    }
}

fn remove_dir(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::archive::test_support::zip_of;
    use super::*;
    use crate::models::{Category, ExperienceLevel, Issue, ProjectType, ToolKind, ToolReport};
    use std::sync::Arc;

    fn store(root: &Path) -> SessionStore {
        SessionStore::new(root, "pink-coded-")
    }

    fn empty_result() -> AnalysisResult {
        AnalysisResult {
            project_type: ProjectType::Unknown,
            linter: ToolKind::Pylint,
            complexity: ToolKind::Radon,
            experience_level: ExperienceLevel::Intermediate,
            security_scan: ToolReport::ok(vec![]),
            main_analysis: ToolReport::ok(vec![]),
            complexity_analysis: ToolReport::ok(vec![]),
        }
    }

    #[test]
    fn test_create_allocates_unique_directories() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());
        let a = store.create(Some("alice")).unwrap();
        let b = store.create(None).unwrap();

        assert_ne!(a.id, b.id);
        assert!(a.directory.is_dir());
        assert!(a
            .directory
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("pink-coded-"));
        assert_eq!(store.len(), 2);
        assert!(Uuid::parse_str(&a.id).is_ok());
    }

    #[test]
    fn test_unknown_session_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());
        assert!(matches!(
            store.get_directory("nope"),
            Err(SessionError::NotFound(_))
        ));
        assert!(matches!(
            store.attach_result("nope", empty_result()),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn test_attach_and_read_result() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());
        let session = store.create(None).unwrap();
        assert_eq!(store.last_result(&session.id).unwrap(), None);

        store.attach_result(&session.id, empty_result()).unwrap();
        assert_eq!(store.last_result(&session.id).unwrap(), Some(empty_result()));
    }

    #[test]
    fn test_update_result_without_cache() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());
        let session = store.create(None).unwrap();
        assert_eq!(store.update_result(&session.id, |_| ()).unwrap(), None);
        assert!(matches!(
            store.update_result("nope", |_| ()),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn test_concurrent_updates_keep_every_edit() {
        let root = tempfile::tempdir().unwrap();
        let store = Arc::new(store(root.path()));
        let session = store.create(None).unwrap();
        let issues = (0..8)
            .map(|i| Issue::new(Category::Error, ToolKind::Ruff, format!("f{}.py", i), 1, "F401", "x"))
            .collect();
        store
            .attach_result(
                &session.id,
                AnalysisResult {
                    main_analysis: ToolReport::ok(issues),
                    ..empty_result()
                },
            )
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                let id = session.id.clone();
                std::thread::spawn(move || {
                    store
                        .update_result(&id, |r| {
                            r.replace_file_issues(&format!("f{}.py", i), Vec::new())
                        })
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Some(()));
        }

        let result = store.last_result(&session.id).unwrap().unwrap();
        assert!(result.main_analysis.issues.is_empty());
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());
        let session = store.create(None).unwrap();

        let ok = store.resolve(&session.id, "pkg/app.py").unwrap();
        assert_eq!(ok, session.directory.join("pkg/app.py"));
        for bad in ["../x.py", "/etc/passwd", "pkg/../../x.py", ""] {
            assert!(
                matches!(store.resolve(&session.id, bad), Err(SessionError::InvalidPath(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_bad_archive_leaves_no_session() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());
        let err = store.create_from_zip(b"not a zip", None).unwrap_err();

        assert!(matches!(err, SessionError::Archive(ArchiveError::Invalid(_))));
        assert!(store.is_empty());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_create_from_zip() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());
        let session = store
            .create_from_zip(&zip_of(&[("app.py", "x = 1\n")]), Some("bob"))
            .unwrap();
        assert!(session.directory.join("app.py").is_file());
        assert_eq!(store.get(&session.id).unwrap().user_id.as_deref(), Some("bob"));
    }

    #[test]
    fn test_cleanup_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());
        let session = store.create(None).unwrap();

        store.cleanup(&session.id).unwrap();
        assert!(!session.directory.exists());
        assert!(matches!(
            store.cleanup(&session.id),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn test_cleanup_all_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let store = store(root.path());
        let a = store.create(None).unwrap();
        let b = store.create(None).unwrap();
        // Already gone on disk; still counted as removed
        std::fs::remove_dir_all(&b.directory).unwrap();

        assert_eq!(store.cleanup_all(), 2);
        assert!(!a.directory.exists());
        assert!(store.is_empty());
        assert_eq!(store.cleanup_all(), 0);
    }

    #[test]
    fn test_concurrent_creates() {
        let root = tempfile::tempdir().unwrap();
        let store = Arc::new(store(root.path()));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.create(None).unwrap().id)
            })
            .collect();
        let mut ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 16);
        assert_eq!(store.len(), 16);
    }
}
