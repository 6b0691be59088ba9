//! Persistence for runtime state.
//!
//! [`State`] is plain data, so stores only move JSON around. Anything loaded
//! back is re-validated by [`Engine::resume`] before a session continues.

use crate::engine::Engine;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use waymark_core::control::ControlModel;
use waymark_core::error::StateError;
use waymark_core::hooks::Registry;
use waymark_core::options::EngineOptions;
use waymark_core::state::State;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("state store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored state is not valid JSON: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("invalid state key '{0}'")]
    InvalidKey(String),
    #[error(transparent)]
    State(#[from] StateError),
}

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<State>, StoreError>;

    async fn save(&self, key: &str, state: &State) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Resume the session stored under `key`, or start a new one when none exists.
pub async fn open_engine(
    store: &dyn StateStore,
    key: &str,
    model: Arc<ControlModel>,
    registry: Registry,
    options: EngineOptions,
) -> Result<Engine, StoreError> {
    match store.load(key).await? {
        Some(state) => {
            tracing::debug!(key, "Resuming stored wizard state");
            Ok(Engine::resume(model, registry, options, state)?)
        }
        None => Ok(Engine::new(model, registry, options)),
    }
}

#[derive(Debug, Default)]
pub struct MemoryStateStore {
    states: RwLock<HashMap<String, State>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self, key: &str) -> Result<Option<State>, StoreError> {
        Ok(self.states.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, state: &State) -> Result<(), StoreError> {
        self.states
            .write()
            .await
            .insert(key.to_string(), state.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.states.write().await.remove(key);
        Ok(())
    }
}

/// One pretty-printed JSON file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Keys become file names, so only `[A-Za-z0-9_-]` is accepted.
    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let acceptable = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !acceptable {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self, key: &str) -> Result<Option<State>, StoreError> {
        let path = self.path_for(key)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn save(&self, key: &str, state: &State) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_vec_pretty(state)?;

        // Write then rename so readers never see a torn file.
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, json).await?;
        tokio::fs::rename(&staging, &path).await?;
        tracing::debug!(path = %path.display(), "Saved wizard state");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
