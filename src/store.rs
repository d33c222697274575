//! Durable session storage: one JSON blob under a fixed session key.
//!
//! The tracker loads the blob once at construction and overwrites it after
//! every completed challenge. Missing or corrupt data is recovered by the
//! caller (empty session); this module only reports what happened.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::tracker::SessionData;

/// Fixed key naming the persisted session blob.
pub const SESSION_KEY: &str = "careerquest_session";

pub trait SessionStore: Send + Sync {
  /// `Ok(None)` when no blob exists yet; `Err` on unreadable or corrupt data.
  fn load(&self) -> Result<Option<SessionData>, String>;
  fn save(&self, session: &SessionData) -> Result<(), String>;
  fn clear(&self) -> Result<(), String>;
}

/// File-backed store: `<dir>/careerquest_session.json`.
pub struct FileSessionStore {
  path: PathBuf,
}

impl FileSessionStore {
  pub fn new(dir: &Path) -> Self {
    Self { path: dir.join(format!("{SESSION_KEY}.json")) }
  }

  /// Resolve the storage directory from `SESSION_DATA_DIR`, falling back to
  /// the platform data dir, then the working directory.
  #[instrument(level = "info")]
  pub fn from_env() -> Self {
    let dir = std::env::var("SESSION_DATA_DIR")
      .map(PathBuf::from)
      .ok()
      .or_else(|| dirs::data_dir().map(|d| d.join("careerquest")))
      .unwrap_or_else(|| PathBuf::from("."));
    let store = Self::new(&dir);
    info!(target: "careerquest_backend", path = %store.path.display(), "Session store location");
    store
  }
}

impl SessionStore for FileSessionStore {
  fn load(&self) -> Result<Option<SessionData>, String> {
    if !self.path.exists() {
      return Ok(None);
    }
    let raw = std::fs::read_to_string(&self.path)
      .map_err(|e| format!("failed to read {}: {e}", self.path.display()))?;
    let session = serde_json::from_str::<SessionData>(&raw)
      .map_err(|e| format!("failed to parse {}: {e}", self.path.display()))?;
    Ok(Some(session))
  }

  fn save(&self, session: &SessionData) -> Result<(), String> {
    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| format!("failed to create {}: {e}", parent.display()))?;
    }
    let raw = serde_json::to_string(session).map_err(|e| e.to_string())?;
    std::fs::write(&self.path, raw)
      .map_err(|e| format!("failed to write {}: {e}", self.path.display()))
  }

  fn clear(&self) -> Result<(), String> {
    match std::fs::remove_file(&self.path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(format!("failed to delete {}: {e}", self.path.display())),
    }
  }
}

/// In-memory store for tests; clones share the same blob.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct MemorySessionStore {
  blob: std::sync::Arc<std::sync::Mutex<Option<String>>>,
}

#[cfg(test)]
impl SessionStore for MemorySessionStore {
  fn load(&self) -> Result<Option<SessionData>, String> {
    match self.blob.lock().unwrap().as_deref() {
      Some(raw) => serde_json::from_str(raw).map(Some).map_err(|e| e.to_string()),
      None => Ok(None),
    }
  }

  fn save(&self, session: &SessionData) -> Result<(), String> {
    let raw = serde_json::to_string(session).map_err(|e| e.to_string())?;
    *self.blob.lock().unwrap() = Some(raw);
    Ok(())
  }

  fn clear(&self) -> Result<(), String> {
    *self.blob.lock().unwrap() = None;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_blob_loads_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSessionStore::new(dir.path());
    assert!(store.load().unwrap().is_none());
  }

  #[test]
  fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSessionStore::new(dir.path());
    let mut session = SessionData::default();
    session.total_time = 1234;
    store.save(&session).unwrap();
    let loaded = store.load().unwrap().unwrap();
    assert_eq!(loaded.total_time, 1234);
    assert!(loaded.challenges.is_empty());
  }

  #[test]
  fn corrupt_blob_is_an_error_not_a_panic() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSessionStore::new(dir.path());
    std::fs::write(dir.path().join(format!("{SESSION_KEY}.json")), "{not json").unwrap();
    assert!(store.load().is_err());
  }

  #[test]
  fn clear_removes_the_blob_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSessionStore::new(dir.path());
    store.save(&SessionData::default()).unwrap();
    store.clear().unwrap();
    assert!(store.load().unwrap().is_none());
    store.clear().unwrap();
  }
}
