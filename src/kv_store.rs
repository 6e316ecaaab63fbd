//! Key-value backends holding JSON strings by key.
//!
//! [`LmdbStore`] is the persistent backend used on devices. [`MemoryStore`]
//! keeps everything in a map and is used for previews and tests.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, RwLock};

use lmdb::{Database, Environment, Error as LmdbError, Transaction, WriteFlags};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::app_response::AppResponse;
use crate::config::StoreConfig;

/// Raw string storage addressed by key.
///
/// Backends are shared between the stores through an `Arc`, so every method
/// takes `&self`.
pub trait KeyValueStore: Send + Sync {
    fn get_raw(&self, key: &str) -> Result<Option<String>, AppResponse>;

    fn set_raw(&self, key: &str, value: &str) -> Result<(), AppResponse>;

    /// Returns `true` when the key existed.
    fn remove(&self, key: &str) -> Result<bool, AppResponse>;

    /// Releases the underlying resources. Later calls fail with
    /// `DatabaseError`.
    fn close(&self) -> Result<(), AppResponse> {
        Ok(())
    }
}

/// JSON helpers available on every backend.
pub trait KeyValueStoreExt: KeyValueStore {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppResponse> {
        match self.get_raw(key)? {
            Some(raw) if !raw.trim().is_empty() => Ok(Some(serde_json::from_str(&raw)?)),
            _ => Ok(None),
        }
    }

    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), AppResponse> {
        let json = serde_json::to_string(value)?;
        self.set_raw(key, &json)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {}

pub struct LmdbStore {
    env: RwLock<Option<Environment>>,
    db: Database,
    path: PathBuf,
}

impl LmdbStore {
    /// Opens (creating if needed) the environment directory `<name>.lmdb`.
    pub fn open(config: &StoreConfig) -> Result<Self, AppResponse> {
        let path = PathBuf::from(config.lmdb_dir());
        Self::open_at(&path, config.map_size)
    }

    pub fn open_at(path: &Path, map_size: usize) -> Result<Self, AppResponse> {
        if !path.exists() {
            info!("Creating new storage at: {}", path.display());
            fs::create_dir_all(path)?;
        }

        let env = Environment::new().set_map_size(map_size).open(path)?;
        let db = env.open_db(None)?;

        info!("Storage opened at: {}", path.display());
        Ok(Self {
            env: RwLock::new(Some(env)),
            db,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_env<T>(
        &self,
        f: impl FnOnce(&Environment) -> Result<T, AppResponse>,
    ) -> Result<T, AppResponse> {
        let guard = self
            .env
            .read()
            .map_err(|_| AppResponse::DatabaseError("Storage lock poisoned".to_string()))?;
        let env = guard
            .as_ref()
            .ok_or_else(|| AppResponse::DatabaseError("Storage is closed".to_string()))?;
        f(env)
    }
}

impl KeyValueStore for LmdbStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, AppResponse> {
        let value = self.with_env(|env| {
            let txn = env.begin_ro_txn()?;
            let found = match txn.get(self.db, &key) {
                Ok(bytes) => Some(bytes.to_vec()),
                Err(LmdbError::NotFound) => None,
                Err(e) => return Err(e.into()),
            };
            txn.abort();

            found
                .map(|bytes| {
                    String::from_utf8(bytes).map_err(|e| {
                        AppResponse::SerializationError(format!(
                            "Invalid UTF-8 stored under '{key}': {e}"
                        ))
                    })
                })
                .transpose()
        })?;

        debug!("get '{}': {}", key, if value.is_some() { "hit" } else { "miss" });
        Ok(value)
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<(), AppResponse> {
        if key.is_empty() {
            return Err(AppResponse::BadRequest("Storage key cannot be empty".to_string()));
        }

        self.with_env(|env| {
            let mut txn = env.begin_rw_txn()?;
            txn.put(self.db, &key, &value, WriteFlags::empty())?;
            txn.commit()?;
            Ok(())
        })?;

        debug!("set '{}' ({} bytes)", key, value.len());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, AppResponse> {
        self.with_env(|env| {
            let mut txn = env.begin_rw_txn()?;
            let existed = match txn.del(self.db, &key, None) {
                Ok(()) => true,
                Err(LmdbError::NotFound) => false,
                Err(e) => return Err(e.into()),
            };
            txn.commit()?;
            Ok(existed)
        })
    }

    fn close(&self) -> Result<(), AppResponse> {
        let mut guard = self
            .env
            .write()
            .map_err(|_| AppResponse::DatabaseError("Storage lock poisoned".to_string()))?;

        if let Some(env) = guard.take() {
            if let Err(e) = env.sync(true) {
                warn!("Failed to sync storage before closing: {e}");
            }
            info!("Storage at {} closed", self.path.display());
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, String>>, AppResponse> {
        self.entries
            .lock()
            .map_err(|_| AppResponse::DatabaseError("Memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, AppResponse> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<(), AppResponse> {
        if key.is_empty() {
            return Err(AppResponse::BadRequest("Storage key cannot be empty".to_string()));
        }
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, AppResponse> {
        Ok(self.lock()?.remove(key).is_some())
    }
}
