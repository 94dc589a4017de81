//! Persisted session: who is signed in, their service token and the
//! theme override.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use antisoup_shared::{ThemeMode, User};
use tracing::warn;

use crate::error::SessionError;

pub const USER_KEY: &str = "as_user";
pub const THEME_KEY: &str = "as_theme";
pub const TOKEN_KEY: &str = "as_token";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), SessionError>;
    fn remove(&mut self, key: &str) -> Result<(), SessionError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SessionError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SessionError> {
        self.values.remove(key);
        Ok(())
    }
}

/// All keys in one JSON object on disk, rewritten on every change.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, SessionError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(values)?)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SessionError> {
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)
    }

    fn remove(&mut self, key: &str) -> Result<(), SessionError> {
        let mut values = self.read_all()?;
        if values.remove(key).is_some() {
            self.write_all(&values)?;
        }
        Ok(())
    }
}

/// Typed access over a [`KeyValueStore`]. Unreadable entries count as absent.
pub struct Session<K> {
    store: K,
}

impl<K: KeyValueStore> Session<K> {
    pub fn new(store: K) -> Self {
        Self { store }
    }

    pub fn user(&self) -> Option<User> {
        let raw = match self.store.get(USER_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("cannot read saved session: {e}");
                return None;
            }
        };
        serde_json::from_str(&raw)
            .map_err(|e| warn!("discarding unreadable saved user: {e}"))
            .ok()
    }

    pub fn save_user(&mut self, user: &User) -> Result<(), SessionError> {
        let raw = serde_json::to_string(user)?;
        self.store.set(USER_KEY, &raw)
    }

    pub fn clear_user(&mut self) -> Result<(), SessionError> {
        self.store.remove(USER_KEY)
    }

    /// Bearer token issued by the service, if the user signed in through it.
    pub fn token(&self) -> Option<String> {
        self.store
            .get(TOKEN_KEY)
            .map_err(|e| warn!("cannot read saved token: {e}"))
            .ok()
            .flatten()
            .filter(|t| !t.is_empty())
    }

    pub fn save_token(&mut self, token: &str) -> Result<(), SessionError> {
        self.store.set(TOKEN_KEY, token)
    }

    pub fn clear_token(&mut self) -> Result<(), SessionError> {
        self.store.remove(TOKEN_KEY)
    }

    pub fn theme(&self) -> Option<ThemeMode> {
        match self.store.get(THEME_KEY) {
            Ok(raw) => raw.as_deref().and_then(ThemeMode::parse),
            Err(e) => {
                warn!("cannot read saved theme: {e}");
                None
            }
        }
    }

    pub fn save_theme(&mut self, theme: ThemeMode) -> Result<(), SessionError> {
        self.store.set(THEME_KEY, theme.as_str())
    }
}
