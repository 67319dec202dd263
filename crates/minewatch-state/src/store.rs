//! StateStore — JSON document persistence for the run state.
//!
//! The document is read once per run and replaced in a single step: the
//! new content goes to a temporary file in the same directory, is synced,
//! then renamed over the old one. Readers never see a half-written file.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::types::RunState;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// File-backed run state.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document. A missing file is an empty state; an unreadable
    /// one is [`StateError::Corrupt`].
    ///
    /// `legacy_site` names the site a flat single-site document belongs to.
    pub fn load(&self, legacy_site: Option<&str>) -> StateResult<RunState> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?self.path, "no state file, starting fresh");
                return Ok(RunState::default());
            }
            Err(e) => {
                return Err(StateError::Read(format!("{}: {e}", self.path.display())));
            }
        };

        let state = RunState::from_json(&bytes, legacy_site)
            .map_err(|e| StateError::Corrupt(format!("{}: {e}", self.path.display())))?;
        debug!(path = ?self.path, sites = state.sites.len(), "state loaded");
        Ok(state)
    }

    /// Atomically replace the document with `state`.
    pub fn save(&self, state: &RunState) -> StateResult<()> {
        let bytes = state.to_json().map_err(StateError::Serialize)?;

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(map_err!(Write))?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(map_err!(Write))?;
        tmp.write_all(&bytes).map_err(map_err!(Write))?;
        tmp.as_file().sync_all().map_err(map_err!(Write))?;
        tmp.persist(&self.path).map_err(map_err!(Write))?;

        debug!(path = ?self.path, sites = state.sites.len(), "state saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SiteState, SiteStatus};
    use chrono::{TimeZone, Utc};

    #[test]
    fn missing_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        assert_eq!(store.load(None).unwrap(), RunState::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("nested/state.json"));

        let mut state = RunState::default();
        state.set_site(
            "main",
            SiteState {
                last_status: SiteStatus::Down,
                last_worker_count: Some(12),
                down_since: Some(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()),
                ..SiteState::default()
            },
        );
        store.save(&state).unwrap();

        assert_eq!(store.load(None).unwrap(), state);
    }

    #[test]
    fn save_replaces_previous_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        let mut state = RunState::default();
        state.set_site("a", SiteState::default());
        store.save(&state).unwrap();

        let empty = RunState::default();
        store.save(&empty).unwrap();
        assert_eq!(store.load(None).unwrap(), empty);

        // Only the document itself remains; no stray temp files.
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn corrupt_file_fails_loudly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{\"sites\": {\"main\": {\"last_status\": 7}}}").unwrap();

        let err = StateStore::new(&path).load(None).unwrap_err();
        assert!(matches!(err, StateError::Corrupt(_)));
        // The corrupt document is left in place for inspection.
        assert!(path.exists());
    }

    #[test]
    fn truncated_file_fails_loudly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{\"sites\": {").unwrap();
        assert!(matches!(
            StateStore::new(&path).load(None),
            Err(StateError::Corrupt(_))
        ));
    }

    #[test]
    fn legacy_file_loads_under_single_site() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, br#"{"last_status": "ok", "last_worker_count": 57, "history": []}"#)
            .unwrap();

        let store = StateStore::new(&path);
        let state = store.load(Some("main")).unwrap();
        assert_eq!(state.site("main").last_worker_count, Some(57));

        // The next save writes the multi-site layout.
        store.save(&state).unwrap();
        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert!(raw.get("sites").is_some());
        assert_eq!(store.load(None).unwrap(), state);
    }
}
