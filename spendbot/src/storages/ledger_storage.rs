use std::{collections::HashMap, path::PathBuf, sync::Arc, time::Duration};

use tokio::sync::Mutex;

use super::bucket::{LedgerBucket, LedgerKey};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("ledger file {path:?} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("ledger file {path:?} can't be read: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write ledger file {path:?}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },
    #[error("writing ledger file {path:?} took longer than {timeout:?}")]
    WriteTimeout { path: PathBuf, timeout: Duration },
}

/// Trait for ledger storage operations
#[async_trait::async_trait]
pub trait LedgerStorageTrait: Send + Sync {
    /// Get the bucket for a key, or an empty one. Never creates the bucket.
    async fn get_bucket(&self, key: &LedgerKey) -> LedgerBucket;

    /// Replace the bucket for a key. Returns only once the change is durable.
    async fn commit(&self, key: LedgerKey, bucket: LedgerBucket) -> Result<(), StorageError>;
}

pub(super) type LedgerStorageData = HashMap<LedgerKey, LedgerBucket>;

/// In-memory ledger, lost on restart
#[derive(Clone, Default)]
pub struct LedgerStorage {
    data: Arc<Mutex<LedgerStorageData>>,
}

impl LedgerStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl LedgerStorageTrait for LedgerStorage {
    async fn get_bucket(&self, key: &LedgerKey) -> LedgerBucket {
        let storage_guard = self.data.lock().await;
        storage_guard.get(key).cloned().unwrap_or_default()
    }

    async fn commit(&self, key: LedgerKey, bucket: LedgerBucket) -> Result<(), StorageError> {
        let mut storage_guard = self.data.lock().await;
        storage_guard.insert(key, bucket);
        Ok(())
    }
}
