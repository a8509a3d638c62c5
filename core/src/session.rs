//! Durable session storage.
//!
//! `Storage` is a small key/value interface standing in for client-local
//! storage. `SessionStore` keeps the bearer token under a fixed key and the
//! display username in memory only, so a restarted process knows it is
//! authenticated but not as whom.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::StorageError;

/// Key the bearer token is persisted under.
pub const TOKEN_KEY: &str = "token";

pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// A JSON object in a single file, rewritten on every change.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// In-process storage; nothing survives a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Authenticated(Session),
    Anonymous,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            SessionState::Anonymous => None,
        }
    }
}

#[derive(Debug)]
pub struct SessionStore<S> {
    storage: S,
    state: SessionState,
}

impl<S: Storage> SessionStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            state: SessionState::Anonymous,
        }
    }

    /// Read the persisted token. The token is not validated; only later
    /// server responses decide whether it is still good.
    pub fn load(&mut self) -> Result<&SessionState, StorageError> {
        self.state = match self.storage.get(TOKEN_KEY)? {
            Some(token) if !token.is_empty() => {
                debug!("restored persisted session");
                SessionState::Authenticated(Session { token, username: None })
            }
            _ => SessionState::Anonymous,
        };
        Ok(&self.state)
    }

    pub fn save(&mut self, token: &str, username: &str) -> Result<&SessionState, StorageError> {
        self.storage.set(TOKEN_KEY, token)?;
        info!(username, "session started");
        self.state = SessionState::Authenticated(Session {
            token: token.to_string(),
            username: Some(username.to_string()),
        });
        Ok(&self.state)
    }

    pub fn clear(&mut self) -> Result<&SessionState, StorageError> {
        self.storage.remove(TOKEN_KEY)?;
        if self.state.is_authenticated() {
            info!("session cleared");
        }
        self.state = SessionState::Anonymous;
        Ok(&self.state)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}
