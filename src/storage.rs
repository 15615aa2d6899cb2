//! Versioned JSON persistence boundary.
//!
//! Two flat documents, each behind a version-tagged file name: the live
//! conversation (`state.v2.json`) and the saved-session list
//! (`sessions.v1.json`). Schema evolution is handled by defaulting absent
//! fields on read; a missing or unreadable document reads as the default so
//! a bad disk state never takes the app down.
//!
//! Core logic never touches files directly — it goes through [`StateStore`].

use crate::chat::{ChatConfig, Message};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

pub const STATE_FILE: &str = "state.v2.json";
pub const SESSIONS_FILE: &str = "sessions.v1.json";

/// The live conversation document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub config: ChatConfig,
}

/// One saved chat session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedSession {
    pub id: u64,
    pub title: String,
    /// Unix timestamp, seconds.
    #[serde(default)]
    pub saved_at: u64,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl SavedSession {
    pub fn new(id: u64, title: impl Into<String>, messages: Vec<Message>) -> Self {
        let saved_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self { id, title: title.into(), saved_at, messages }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

pub trait StateStore: Send + Sync {
    fn load_state(&self) -> PersistedState;
    fn save_state(&self, state: &PersistedState) -> Result<(), StoreError>;
    fn load_sessions(&self) -> Vec<SavedSession>;
    fn save_sessions(&self, sessions: &[SavedSession]) -> Result<(), StoreError>;
}

/// Flat-JSON store rooted at a directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Platform config directory, e.g. `~/.config/glass-chat` on Linux.
    pub fn default_location() -> Self {
        let root = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("glass-chat");
        Self { root }
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read_or_default<T: Default + for<'de> Deserialize<'de>>(&self, file: &str) -> T {
        let path = self.root.join(file);
        if !path.exists() {
            return T::default();
        }
        match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("[STORE] {} unreadable ({}) — starting fresh", file, e);
                T::default()
            }),
            Err(e) => {
                log::warn!("[STORE] Failed to read {}: {}", file, e);
                T::default()
            }
        }
    }

    fn write<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.root)?;
        let raw = serde_json::to_string_pretty(value)?;
        std::fs::write(self.root.join(file), raw)?;
        Ok(())
    }
}

impl StateStore for FileStore {
    fn load_state(&self) -> PersistedState {
        self.read_or_default(STATE_FILE)
    }

    fn save_state(&self, state: &PersistedState) -> Result<(), StoreError> {
        self.write(STATE_FILE, state)
    }

    fn load_sessions(&self) -> Vec<SavedSession> {
        self.read_or_default(SESSIONS_FILE)
    }

    fn save_sessions(&self, sessions: &[SavedSession]) -> Result<(), StoreError> {
        self.write(SESSIONS_FILE, sessions)
    }
}
