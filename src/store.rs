//! Local persistence of the session record.
//!
//! Only the identity and the cooldown deadline survive a restart. The record
//! is overwritten on every session mutation and read once at startup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::session::Identity;

/// Layout version written into every record.
pub const STORAGE_VERSION: u32 = 1;

/// The persisted subset of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub version: u32,
    pub identity: Option<Identity>,
    /// Epoch milliseconds
    pub next_allowed_action_at: i64,
}

impl PersistedSession {
    pub fn new(identity: Option<Identity>, next_allowed_action_at: i64) -> Self {
        Self {
            version: STORAGE_VERSION,
            identity,
            next_allowed_action_at,
        }
    }
}

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("stored session is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("stored session has version {found}, expected {}", STORAGE_VERSION)]
    UnsupportedVersion { found: u32 },
}

/// Where the session record lives.
pub trait SessionStore: Send + Sync {
    /// The last saved record, or `None` if nothing was ever saved.
    fn load(&self) -> Result<Option<PersistedSession>, StoreError>;

    fn save(&self, session: &PersistedSession) -> Result<(), StoreError>;
}

fn decode(raw: &str) -> Result<PersistedSession, StoreError> {
    let session: PersistedSession = serde_json::from_str(raw)?;
    if session.version != STORAGE_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: session.version,
        });
    }
    Ok(session)
}

/// JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileStore {
    fn load(&self) -> Result<Option<PersistedSession>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => decode(&raw).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, session: &PersistedSession) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(session)?;
        // Write-then-rename so a crash never leaves a half-written record
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-process store. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored JSON, if any.
    pub fn raw(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Overwrite the slot with arbitrary text.
    pub fn put_raw(&self, raw: impl Into<String>) {
        *self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(raw.into());
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Result<Option<PersistedSession>, StoreError> {
        self.raw().as_deref().map(decode).transpose()
    }

    fn save(&self, session: &PersistedSession) -> Result<(), StoreError> {
        self.put_raw(serde_json::to_string(session)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn sample() -> PersistedSession {
        PersistedSession::new(
            Some(Identity {
                id: Some("u1".to_string()),
                username: "alice".to_string(),
                email: "alice@nuclick.one".to_string(),
                last_action_at: chrono::Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
                auth_token: "tok".to_string(),
            }),
            1_748_779_260_000,
        )
    }

    #[test]
    fn test_file_store_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("session.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_file_store_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        FileStore::new(&path).save(&sample()).unwrap();
        let loaded = FileStore::new(&path).load().unwrap();

        assert_eq!(loaded, Some(sample()));
    }

    #[test]
    fn test_file_store_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("session.json"));

        store.save(&sample()).unwrap();
        store.save(&PersistedSession::new(None, 0)).unwrap();

        assert_eq!(store.load().unwrap(), Some(PersistedSession::new(None, 0)));
    }

    #[test]
    fn test_corrupt_record() {
        let store = MemoryStore::new();
        store.put_raw("{not json");
        assert!(matches!(store.load(), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_unknown_version() {
        let store = MemoryStore::new();
        store.put_raw(r#"{"version": 99, "identity": null, "nextAllowedActionAt": 0}"#);
        assert!(matches!(
            store.load(),
            Err(StoreError::UnsupportedVersion { found: 99 })
        ));
    }

    #[test]
    fn test_record_wire_shape() {
        let store = MemoryStore::new();
        store.save(&PersistedSession::new(None, 5_000)).unwrap();

        let json: serde_json::Value = serde_json::from_str(&store.raw().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"version": 1, "identity": null, "nextAllowedActionAt": 5000})
        );
    }
}
