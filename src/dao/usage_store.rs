use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
    time::SystemTime,
};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    dao::storage::{StorageError, StorageResult},
    dto::format_system_time,
    state::usage::UsageHistory,
};

/// Persistence for the question usage history shared by every room.
pub trait UsageStore: Send + Sync {
    /// Load the persisted history; a store that was never written yields an
    /// empty history.
    fn load(&self) -> BoxFuture<'static, StorageResult<UsageHistory>>;
    /// Replace the persisted history.
    fn save(&self, history: UsageHistory) -> BoxFuture<'static, StorageResult<()>>;
}

#[derive(Debug, Serialize, Deserialize)]
struct UsageDocument {
    used: UsageHistory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
}

/// Usage history kept in a JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileUsageStore {
    path: Arc<PathBuf>,
}

impl JsonFileUsageStore {
    /// Store backed by the file at `path`; the file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl UsageStore for JsonFileUsageStore {
    fn load(&self) -> BoxFuture<'static, StorageResult<UsageHistory>> {
        let path = self.path.clone();
        Box::pin(async move {
            let contents = match tokio::fs::read_to_string(path.as_path()).await {
                Ok(contents) => contents,
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    info!(path = %path.display(), "no usage history yet; starting fresh");
                    return Ok(UsageHistory::default());
                }
                Err(err) => {
                    return Err(StorageError::unavailable(
                        format!("reading {}", path.display()),
                        err,
                    ));
                }
            };

            let document: UsageDocument = serde_json::from_str(&contents)
                .map_err(|err| StorageError::malformed(path.as_path(), err))?;
            debug!(
                path = %path.display(),
                used = document.used.len(),
                updated_at = document.updated_at.as_deref().unwrap_or("unknown"),
                "loaded usage history"
            );
            Ok(document.used)
        })
    }

    fn save(&self, history: UsageHistory) -> BoxFuture<'static, StorageResult<()>> {
        let path = self.path.clone();
        Box::pin(async move {
            let document = UsageDocument {
                used: history,
                updated_at: Some(format_system_time(SystemTime::now())),
            };
            let payload = serde_json::to_vec_pretty(&document)
                .map_err(|err| StorageError::malformed(path.as_path(), err))?;

            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await.map_err(|err| {
                    StorageError::unavailable(format!("creating {}", parent.display()), err)
                })?;
            }

            let staging = path.with_extension("json.tmp");
            tokio::fs::write(&staging, payload).await.map_err(|err| {
                StorageError::unavailable(format!("writing {}", staging.display()), err)
            })?;
            tokio::fs::rename(&staging, path.as_path())
                .await
                .map_err(|err| {
                    StorageError::unavailable(format!("replacing {}", path.display()), err)
                })?;

            debug!(path = %path.display(), used = document.used.len(), "saved usage history");
            Ok(())
        })
    }
}

/// Usage history kept in memory; lost when the process exits.
#[derive(Debug, Clone, Default)]
pub struct MemoryUsageStore {
    history: Arc<Mutex<UsageHistory>>,
}

impl MemoryUsageStore {
    /// Store pre-seeded with `history`.
    pub fn with_history(history: UsageHistory) -> Self {
        Self {
            history: Arc::new(Mutex::new(history)),
        }
    }

    /// Last saved history.
    pub fn snapshot(&self) -> UsageHistory {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl UsageStore for MemoryUsageStore {
    fn load(&self) -> BoxFuture<'static, StorageResult<UsageHistory>> {
        let history = self.snapshot();
        Box::pin(async move { Ok(history) })
    }

    fn save(&self, history: UsageHistory) -> BoxFuture<'static, StorageResult<()>> {
        *self.history.lock().unwrap_or_else(PoisonError::into_inner) = history;
        Box::pin(async { Ok(()) })
    }
}
