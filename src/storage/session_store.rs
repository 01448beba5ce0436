// src/storage/session_store.rs
//! Persistent key/value storage for session data.
//!
//! Holds the bearer token (under [`TOKEN_KEY`]) and the email of the logged-in
//! account (under [`EMAIL_KEY`]) between runs of the client.
//!
//! # Security Considerations
//! - The token is stored in clear text; the file should be readable by the
//!   current user only
//! - Nothing here validates the token, the API does

use crate::error::PortalResult;
use crate::utils::serialization::{deserialize, serialize_pretty};
use log::debug;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Key the bearer token is stored under.
pub const TOKEN_KEY: &str = "jwt_token";
/// Key the logged-in account's email is stored under.
pub const EMAIL_KEY: &str = "email";

/// Key/value storage that outlives a single session.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> PortalResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> PortalResult<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> PortalResult<()>;
}

/// Session store backed by a small JSON file.
///
/// The whole file is rewritten on every change; it only ever holds a couple
/// of entries.
pub struct FileSessionStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles on the file
    lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSessionStore {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> PortalResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(deserialize(&contents)?)
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> PortalResult<()> {
        if entries.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path)?;
                debug!("Removed empty session file {}", self.path.display());
            }
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serialize_pretty(entries)?)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> PortalResult<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortalResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)
    }

    fn remove(&self, key: &str) -> PortalResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_entries()?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

/// Session store that forgets everything when dropped.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> PortalResult<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortalResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PortalResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}
