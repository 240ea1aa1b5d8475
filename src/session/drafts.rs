//! Local key-value store for questionnaire drafts
//!
//! One JSON object in `<state_dir>/state.json`. Reads are best-effort: a
//! missing, unreadable or corrupt file reads as empty. Writes go to a temp
//! file that is renamed over the original.

use crate::questionnaire::{Answers, ServiceSelection};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Key of the in-progress project draft
pub const CURRENT_PROJECT_KEY: &str = "currentProject";

const STATE_FILE: &str = "state.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to encode draft: {0}")]
    Encode(#[from] serde_json::Error),
}

/// The questionnaire as last left by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDraft {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub answers: Answers,
    #[serde(default)]
    pub selected_services: ServiceSelection,
    /// Configure step the user was on
    #[serde(default)]
    pub step: usize,
    pub saved_at: DateTime<Utc>,
}

impl ProjectDraft {
    pub fn new(answers: Answers, selected_services: ServiceSelection, step: usize) -> Self {
        Self {
            project_id: None,
            answers,
            selected_services,
            step,
            saved_at: Utc::now(),
        }
    }
}

pub struct DraftStore {
    path: PathBuf,
}

impl DraftStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(STATE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Map<String, Value> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Map::new(),
            Err(e) => {
                log::warn!("[DraftStore] Failed to read {:?}: {}", self.path, e);
                return Map::new();
            }
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                log::warn!("[DraftStore] {:?} is not a JSON object, ignoring", self.path);
                Map::new()
            }
            Err(e) => {
                log::warn!("[DraftStore] Corrupt state in {:?}: {}", self.path, e);
                Map::new()
            }
        }
    }

    fn write_all(&self, map: &Map<String, Value>) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(map)?;
        let temp_path = self.path.with_extension("tmp");
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(&temp_path, content).map_err(write_err)?;
        fs::rename(&temp_path, &self.path).map_err(write_err)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.read_all().remove(key)
    }

    /// Typed read; a value of the wrong shape reads as absent
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                log::warn!("[DraftStore] Ignoring malformed '{}': {}", key, e);
                None
            }
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let mut map = self.read_all();
        map.insert(key.to_string(), serde_json::to_value(value)?);
        self.write_all(&map)
    }

    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut map = self.read_all();
        if map.remove(key).is_some() {
            self.write_all(&map)?;
        }
        Ok(())
    }

    pub fn current_project(&self) -> Option<ProjectDraft> {
        self.get_as(CURRENT_PROJECT_KEY)
    }

    pub fn save_current_project(&self, draft: &ProjectDraft) -> Result<(), StoreError> {
        self.set(CURRENT_PROJECT_KEY, draft)
    }

    /// Forget everything
    pub fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store() -> (TempDir, DraftStore) {
        let dir = TempDir::new().unwrap();
        let store = DraftStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let (_dir, store) = store();
        assert!(store.get("anything").is_none());
        assert!(store.current_project().is_none());
    }

    #[test]
    fn test_draft_roundtrip() {
        let (_dir, store) = store();
        let mut answers = Answers::new();
        answers.set("project_name", "Shop");
        let draft = ProjectDraft::new(answers, ServiceSelection::new(), 2);

        store.save_current_project(&draft).unwrap();
        assert_eq!(store.current_project(), Some(draft));

        let raw: Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert!(raw.get(CURRENT_PROJECT_KEY).is_some());
    }

    #[test]
    fn test_corrupt_json_reads_as_absent() {
        let (_dir, store) = store();
        fs::write(store.path(), "{not json").unwrap();
        assert!(store.current_project().is_none());

        // A write replaces the corrupt file
        store.set("theme", &json!("dark")).unwrap();
        assert_eq!(store.get("theme"), Some(json!("dark")));
    }

    #[test]
    fn test_wrong_shape_reads_as_absent() {
        let (_dir, store) = store();
        store.set(CURRENT_PROJECT_KEY, &json!({"step": "two"})).unwrap();
        assert!(store.current_project().is_none());
    }

    #[test]
    fn test_remove_and_clear() {
        let (_dir, store) = store();
        store.set("a", &1).unwrap();
        store.set("b", &2).unwrap();
        store.remove("a").unwrap();
        assert!(store.get("a").is_none());
        assert_eq!(store.get("b"), Some(json!(2)));

        store.clear().unwrap();
        assert!(store.get("b").is_none());
        store.clear().unwrap();
    }
}
