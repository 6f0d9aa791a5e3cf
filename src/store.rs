//! Durable per-user game-state collection.
//!
//! Documents live in a `BTreeMap` behind one mutex. With a backing file,
//! every mutation rewrites the whole collection (temp file + rename) before
//! the lock is released, so one call is one atomic upsert. If the write
//! fails the in-memory change is rolled back.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

use crate::game::patch::GameStatePatch;
use crate::game::state::{GameDocument, MAX_HEARTS};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

type Documents = BTreeMap<String, GameDocument>;

#[derive(Debug, Default)]
pub struct GameStore {
    documents: Mutex<Documents>,
    path: Option<PathBuf>,
}

impl GameStore {
    /// Store with no durability.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a file-backed store. A missing file starts an empty collection.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let documents = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<Documents>(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Documents::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::info!(
            path = %path.display(),
            documents = documents.len(),
            "opened game store"
        );
        Ok(Self {
            documents: Mutex::new(documents),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Existing document for `user_id`, created with defaults if absent.
    pub fn fetch_or_create(&self, user_id: &str) -> Result<GameDocument, StoreError> {
        let mut docs = self.lock()?;
        if let Some(doc) = docs.get(user_id) {
            return Ok(doc.clone());
        }
        let doc = GameDocument::new(user_id, Utc::now());
        let doc = self.commit(&mut docs, doc)?;
        tracing::info!(user_id, "created game state");
        Ok(doc)
    }

    /// Overwrite the fields present in `patch`, creating the document first if
    /// needed. Concurrent merges for one user are last-write-wins.
    pub fn merge(&self, user_id: &str, patch: &GameStatePatch) -> Result<GameDocument, StoreError> {
        let mut docs = self.lock()?;
        let now = Utc::now();
        let mut doc = docs
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| GameDocument::new(user_id, now));
        patch.apply_to(&mut doc.state);
        doc.updated_at = now;
        let doc = self.commit(&mut docs, doc)?;
        tracing::debug!(user_id, "merged game state");
        Ok(doc)
    }

    /// Refill hearts if the stored cooldown still ends at `deadline`.
    /// A cooldown changed or cleared since the timer was armed is left alone.
    pub fn finish_cooldown(
        &self,
        user_id: &str,
        deadline: DateTime<Utc>,
    ) -> Result<Option<GameDocument>, StoreError> {
        let mut docs = self.lock()?;
        let Some(mut doc) = docs.get(user_id).cloned() else {
            return Ok(None);
        };
        if doc.state.cooldown_end_time != Some(deadline) {
            return Ok(None);
        }
        doc.state.hearts = MAX_HEARTS;
        doc.state.cooldown_end_time = None;
        doc.updated_at = Utc::now();
        self.commit(&mut docs, doc).map(Some)
    }

    /// Stored cooldown deadline for `user_id`, without creating a document.
    pub fn cooldown_end_time(&self, user_id: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        let docs = self.lock()?;
        Ok(docs.get(user_id).and_then(|d| d.state.cooldown_end_time))
    }

    /// Every user with a cooldown deadline set.
    pub fn pending_cooldowns(&self) -> Result<Vec<(String, DateTime<Utc>)>, StoreError> {
        let docs = self.lock()?;
        Ok(docs
            .values()
            .filter_map(|d| d.state.cooldown_end_time.map(|t| (d.user_id.clone(), t)))
            .collect())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Documents>, StoreError> {
        self.documents.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Insert `doc` and persist, restoring the previous entry on failure.
    fn commit(&self, docs: &mut Documents, doc: GameDocument) -> Result<GameDocument, StoreError> {
        let previous = docs.insert(doc.user_id.clone(), doc.clone());
        if let Err(e) = self.persist(docs) {
            match previous {
                Some(p) => docs.insert(doc.user_id.clone(), p),
                None => docs.remove(&doc.user_id),
            };
            tracing::error!(user_id = %doc.user_id, error = %e, "failed to persist game store");
            return Err(e);
        }
        Ok(doc)
    }

    fn persist(&self, docs: &Documents) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_vec_pretty(docs)?;
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::GameState;
    use chrono::TimeDelta;

    fn patch(json: &str) -> GameStatePatch {
        GameStatePatch::from_json(json).unwrap()
    }

    #[test]
    fn fresh_user_gets_defaults() {
        let store = GameStore::in_memory();
        let doc = store.fetch_or_create("u1").unwrap();
        assert_eq!(doc.user_id, "u1");
        assert_eq!(doc.state, GameState::default());
        assert_eq!(doc.created_at, doc.updated_at);
    }

    #[test]
    fn fetch_is_stable_after_creation() {
        let store = GameStore::in_memory();
        let first = store.fetch_or_create("u1").unwrap();
        let second = store.fetch_or_create("u1").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn merge_then_fetch_round_trip() {
        let store = GameStore::in_memory();
        let before = store.fetch_or_create("u1").unwrap();
        store.merge("u1", &patch(r#"{"xp":500}"#)).unwrap();

        let after = store.fetch_or_create("u1").unwrap();
        assert_eq!(after.state.xp, 500);
        let mut expected = before.state.clone();
        expected.xp = 500;
        assert_eq!(after.state, expected);
        assert_eq!(after.created_at, before.created_at);
    }

    #[test]
    fn merge_creates_missing_user() {
        let store = GameStore::in_memory();
        let doc = store.merge("new", &patch(r#"{"gems":10}"#)).unwrap();
        assert_eq!(doc.user_id, "new");
        assert_eq!(doc.state.gems, 10);
        assert_eq!(doc.state.hearts, MAX_HEARTS);
    }

    #[test]
    fn users_are_isolated() {
        let store = GameStore::in_memory();
        store.merge("a", &patch(r#"{"xp":1}"#)).unwrap();
        store.merge("b", &patch(r#"{"xp":2}"#)).unwrap();
        assert_eq!(store.fetch_or_create("a").unwrap().state.xp, 1);
        assert_eq!(store.fetch_or_create("b").unwrap().state.xp, 2);
    }

    #[test]
    fn finish_cooldown_requires_matching_deadline() {
        let store = GameStore::in_memory();
        let deadline = Utc::now() + TimeDelta::minutes(30);
        let depleted = GameStatePatch {
            hearts: Some(0),
            cooldown_end_time: Some(Some(deadline)),
            ..GameStatePatch::default()
        };
        store.merge("u1", &depleted).unwrap();

        let stale = deadline - TimeDelta::minutes(1);
        assert!(store.finish_cooldown("u1", stale).unwrap().is_none());
        assert_eq!(store.fetch_or_create("u1").unwrap().state.hearts, 0);

        let doc = store.finish_cooldown("u1", deadline).unwrap().unwrap();
        assert_eq!(doc.state.hearts, MAX_HEARTS);
        assert!(doc.state.cooldown_end_time.is_none());
        assert!(store.pending_cooldowns().unwrap().is_empty());
    }

    #[test]
    fn finish_cooldown_ignores_unknown_user() {
        let store = GameStore::in_memory();
        assert!(store.finish_cooldown("ghost", Utc::now()).unwrap().is_none());
    }

    #[test]
    fn pending_cooldowns_lists_depleted_users() {
        let store = GameStore::in_memory();
        let deadline = Utc::now() + TimeDelta::minutes(30);
        store.fetch_or_create("fine").unwrap();
        store
            .merge(
                "waiting",
                &GameStatePatch {
                    hearts: Some(0),
                    cooldown_end_time: Some(Some(deadline)),
                    ..GameStatePatch::default()
                },
            )
            .unwrap();
        assert_eq!(
            store.pending_cooldowns().unwrap(),
            vec![("waiting".to_string(), deadline)]
        );
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("games.json");

        {
            let store = GameStore::open(&path).unwrap();
            store.merge("u1", &patch(r#"{"xp":500,"completedLevels":[1,2]}"#)).unwrap();
        }

        let reopened = GameStore::open(&path).unwrap();
        let doc = reopened.fetch_or_create("u1").unwrap();
        assert_eq!(doc.state.xp, 500);
        assert_eq!(doc.state.current_level, 1);
        assert_eq!(doc.state.completed_levels.len(), 2);
    }

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = GameStore::open(dir.path().join("absent.json")).unwrap();
        assert!(store.pending_cooldowns().unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("games.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(GameStore::open(&path), Err(StoreError::Json(_))));
    }

    #[test]
    fn failed_write_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("games.json");
        let store = GameStore::open(&path).unwrap();
        store.fetch_or_create("u1").unwrap();

        // A directory at the temp-file path makes the next write fail.
        fs::create_dir(dir.path().join("games.json.tmp")).unwrap();
        assert!(store.merge("u1", &patch(r#"{"xp":99}"#)).is_err());
        assert!(store.fetch_or_create("u2").is_err());

        fs::remove_dir(dir.path().join("games.json.tmp")).unwrap();
        assert_eq!(store.fetch_or_create("u1").unwrap().state.xp, 0);
        assert_eq!(store.pending_cooldowns().unwrap().len(), 0);
    }
}
