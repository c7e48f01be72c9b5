// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session-scoped key/value store.
//!
//! Holds the persisted identity and key material (`userData`, `privateKey`,
//! `publicKey`) as JSON-structured records backed by a single file. The
//! store survives process restarts within a session; `clear()` wipes it on
//! logout.
//!
//! Missing keys read as `None` and mean "not yet registered" - never an
//! error.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Well-known store keys.
pub mod keys {
    /// The persisted [`Identity`](crate::models::Identity) record.
    pub const USER_DATA: &str = "userData";
    /// PEM-wrapped PKCS#8 private key string.
    pub const PRIVATE_KEY: &str = "privateKey";
    /// PEM public key string.
    pub const PUBLIC_KEY: &str = "publicKey";
}

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// File-backed JSON key/value store for one session.
///
/// Writes go through a temporary file and an atomic rename, so a crash
/// mid-write never corrupts the persisted identity/keypair record.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    entries: Mutex<Map<String, Value>>,
}

impl SessionStore {
    /// Open the store at `path`, loading existing entries if present.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let entries = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lock the entry map, recovering from poisoning.
    ///
    /// A panicking writer cannot leave the map malformed (inserts and
    /// clears are atomic on the map itself), so the poison flag carries no
    /// information worth propagating.
    fn lock_entries(&self) -> MutexGuard<'_, Map<String, Value>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch a raw value. `None` means the key was never set.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock_entries().get(key).cloned()
    }

    /// Fetch and deserialize a value.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        match self.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Set a single value and persist.
    pub fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        self.set_all([(key.to_string(), value)])
    }

    /// Set several values in one write.
    ///
    /// The identity and keypair records are persisted together through this
    /// method so they are never partially present.
    pub fn set_all(&self, values: impl IntoIterator<Item = (String, Value)>) -> StoreResult<()> {
        let mut entries = self.lock_entries();
        for (key, value) in values {
            entries.insert(key, value);
        }
        self.flush(&entries)
    }

    /// Remove every entry and the backing file (logout).
    pub fn clear(&self) -> StoreResult<()> {
        let mut entries = self.lock_entries();
        entries.clear();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn flush(&self, entries: &Map<String, Value>) -> StoreResult<()> {
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    use crate::models::Identity;

    fn open_store(dir: &TempDir) -> SessionStore {
        SessionStore::open(dir.path().join("session.json")).unwrap()
    }

    #[test]
    fn missing_key_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        assert!(store.get(keys::USER_DATA).is_none());
        assert!(store
            .get_json::<Identity>(keys::USER_DATA)
            .unwrap()
            .is_none());
    }

    #[test]
    fn registration_round_trips_through_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");

        {
            let store = SessionStore::open(&path).unwrap();
            store
                .set(
                    keys::USER_DATA,
                    json!({"_id": "u1", "publicKey": "PUB", "name": "Alice"}),
                )
                .unwrap();
        }

        let reloaded = SessionStore::open(&path).unwrap();
        let user_data = reloaded.get(keys::USER_DATA).unwrap();
        assert_eq!(user_data["_id"], "u1");
        assert_eq!(user_data["publicKey"], "PUB");

        let identity: Identity = reloaded.get_json(keys::USER_DATA).unwrap().unwrap();
        assert_eq!(identity.id, "u1");
    }

    #[test]
    fn set_all_persists_every_entry_in_one_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");

        let store = SessionStore::open(&path).unwrap();
        store
            .set_all([
                (keys::USER_DATA.to_string(), json!({"_id": "u1"})),
                (keys::PRIVATE_KEY.to_string(), json!("PRIV")),
                (keys::PUBLIC_KEY.to_string(), json!("PUB")),
            ])
            .unwrap();

        let reloaded = SessionStore::open(&path).unwrap();
        assert!(reloaded.get(keys::USER_DATA).is_some());
        assert_eq!(reloaded.get(keys::PRIVATE_KEY).unwrap(), json!("PRIV"));
        assert_eq!(reloaded.get(keys::PUBLIC_KEY).unwrap(), json!("PUB"));
    }

    #[test]
    fn clear_removes_entries_and_backing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");

        let store = SessionStore::open(&path).unwrap();
        store.set(keys::PRIVATE_KEY, json!("PRIV")).unwrap();
        assert!(path.exists());

        store.clear().unwrap();
        assert!(store.get(keys::PRIVATE_KEY).is_none());
        assert!(!path.exists());

        // clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn store_survives_a_panic_while_the_lock_is_held() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.set(keys::PUBLIC_KEY, json!("PUB")).unwrap();

        // the iterator panics inside set_all, poisoning the entry lock
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            store.set_all(std::iter::once(()).map(|_| -> (String, Value) {
                panic!("writer died mid-update")
            }))
        }));
        assert!(result.is_err());

        // reads and writes keep working afterwards
        assert_eq!(store.get(keys::PUBLIC_KEY).unwrap(), json!("PUB"));
        store.set(keys::PRIVATE_KEY, json!("PRIV")).unwrap();
        assert_eq!(store.get(keys::PRIVATE_KEY).unwrap(), json!("PRIV"));
    }
}
