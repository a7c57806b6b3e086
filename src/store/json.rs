//! JSON snapshot backend for `StateStore`.
//!
//! The whole map is loaded once at startup and rewritten after every
//! mutation. Writes go to a sibling temp file that is renamed over the
//! snapshot, so a reader never sees a half-written file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::funnel::{ConversationState, Stage};
use crate::store::traits::StateStore;

type StateMap = BTreeMap<String, ConversationState>;

/// File-backed state store.
pub struct JsonFileStore {
    path: PathBuf,
    states: RwLock<StateMap>,
    /// Serializes snapshot writes so they land in mutation order.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open the snapshot at `path`.
    ///
    /// A missing or unreadable snapshot starts an empty store. Idle records
    /// are never kept.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let states = load_snapshot(&path).await;
        info!(path = %path.display(), conversations = states.len(), "State store opened");
        Self {
            path,
            states: RwLock::new(states),
            write_lock: Mutex::new(()),
        }
    }

    /// Apply `mutate` and persist the resulting snapshot.
    async fn mutate<F>(&self, mutate: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut StateMap),
    {
        let _write = self.write_lock.lock().await;
        let json = {
            let mut states = self.states.write().await;
            mutate(&mut states);
            serde_json::to_vec_pretty(&*states)?
        };
        write_atomically(&self.path, &json).await
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn get(&self, user_id: &str) -> Option<ConversationState> {
        self.states.read().await.get(user_id).cloned()
    }

    async fn put(&self, state: ConversationState) -> Result<(), StoreError> {
        if state.stage == Stage::Idle {
            return self.remove(&state.user_id).await;
        }
        debug!(user_id = %state.user_id, stage = %state.stage, "Persisting state");
        self.mutate(|states| {
            states.insert(state.user_id.clone(), state);
        })
        .await
    }

    async fn remove(&self, user_id: &str) -> Result<(), StoreError> {
        if !self.states.read().await.contains_key(user_id) {
            return Ok(());
        }
        debug!(user_id, "Removing state");
        self.mutate(|states| {
            states.remove(user_id);
        })
        .await
    }

    async fn len(&self) -> usize {
        self.states.read().await.len()
    }
}

async fn load_snapshot(path: &Path) -> StateMap {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return StateMap::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unreadable state snapshot, starting empty");
            return StateMap::new();
        }
    };

    match serde_json::from_slice::<StateMap>(&bytes) {
        Ok(mut states) => {
            states.retain(|_, state| state.stage != Stage::Idle);
            states
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Malformed state snapshot, starting empty");
            StateMap::new()
        }
    }
}

async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, bytes).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)
}
