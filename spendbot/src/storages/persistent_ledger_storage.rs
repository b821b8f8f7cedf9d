use std::{
    collections::BTreeMap,
    ffi::OsString,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use serde::{Deserialize, Serialize};
use teloxide::types::ChatId;
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};

use super::{
    bucket::{LedgerBucket, LedgerKey, MonthKey},
    ledger_storage::{LedgerStorageData, LedgerStorageTrait, StorageError},
};
use crate::config::WRITE_TIMEOUT_SECONDS;

/// Serializable form of the whole ledger, saved/loaded as YAML.
/// Maps month (`YYYY-MM`) to chat id to bucket.
/// Anything else in the file makes it corrupt rather than silently empty.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LedgerData {
    pub months: BTreeMap<MonthKey, BTreeMap<i64, LedgerBucket>>,
}

impl LedgerData {
    fn from_storage(data: &LedgerStorageData) -> Self {
        let mut months: BTreeMap<MonthKey, BTreeMap<i64, LedgerBucket>> = BTreeMap::new();
        for (key, bucket) in data {
            months
                .entry(key.month)
                .or_default()
                .insert(key.chat_id.0, bucket.clone());
        }
        Self { months }
    }

    fn into_storage(self) -> LedgerStorageData {
        self.months
            .into_iter()
            .flat_map(|(month, chats)| {
                chats
                    .into_iter()
                    .map(move |(chat_id, bucket)| (LedgerKey::new(month, ChatId(chat_id)), bucket))
            })
            .collect()
    }
}

/// Ledger kept in a single YAML file, rewritten in full on every commit
#[derive(Clone)]
pub struct PersistentLedgerStorage {
    path: PathBuf,
    write_timeout: Duration,
    data: Arc<Mutex<LedgerStorageData>>,
}

impl PersistentLedgerStorage {
    /// Load the ledger file, reporting any problem with it.
    /// A missing or blank file is an empty ledger, not an error.
    pub async fn try_load(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(source) => return Err(StorageError::Unreadable { path, source }),
        };

        let ledger_data = if content.trim().is_empty() {
            LedgerData::default()
        } else {
            serde_yaml::from_str::<LedgerData>(&content).map_err(|source| {
                StorageError::Corrupt {
                    path: path.clone(),
                    source,
                }
            })?
        };

        let mut data = ledger_data.into_storage();
        for (key, bucket) in data.iter_mut() {
            if bucket.normalize() {
                log::warn!(
                    "Stored total for {} did not match its entries, recomputed as {}",
                    key,
                    bucket.total()
                );
            }
        }
        log::info!("Loaded {} ledger buckets from {:?}", data.len(), path);

        Ok(Self::with_data(path, data))
    }

    /// Load the ledger file, falling back to an empty ledger on any problem.
    /// A corrupt file is moved aside so the next commit doesn't overwrite it.
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        match Self::try_load(&path).await {
            Ok(storage) => storage,
            Err(e) => {
                log::warn!("{}; starting with an empty ledger", e);
                if let StorageError::Corrupt { .. } = e {
                    let backup = sibling_path(&path, ".corrupt");
                    match fs::rename(&path, &backup).await {
                        Ok(()) => log::warn!("Corrupt ledger file moved to {:?}", backup),
                        Err(e) => log::error!("Failed to move corrupt ledger file aside: {}", e),
                    }
                }
                Self::with_data(path, LedgerStorageData::new())
            }
        }
    }

    fn with_data(path: PathBuf, data: LedgerStorageData) -> Self {
        Self {
            path,
            write_timeout: Duration::from_secs(WRITE_TIMEOUT_SECONDS),
            data: Arc::new(Mutex::new(data)),
        }
    }

    /// Save the whole ledger. Either the new content fully replaces the file
    /// or the previous file stays as it was.
    ///
    /// Only writing the temp file is bounded by the timeout. An abandoned
    /// write keeps running on the blocking pool, so it must never be followed
    /// by a rename: the rename happens only after the write has finished.
    async fn save(&self, data: &LedgerStorageData) -> Result<(), StorageError> {
        let content = serde_yaml::to_string(&LedgerData::from_storage(data)).map_err(|e| {
            StorageError::WriteFailed {
                path: self.path.clone(),
                reason: format!("failed to serialize ledger to YAML: {}", e),
            }
        })?;

        let temp_path = temp_path(&self.path);
        let written =
            tokio::time::timeout(self.write_timeout, self.write_temp_file(&temp_path, content))
                .await;

        let result = match written {
            Ok(Ok(())) => fs::rename(&temp_path, &self.path).await.map_err(|e| {
                StorageError::WriteFailed {
                    path: self.path.clone(),
                    reason: e.to_string(),
                }
            }),
            Ok(Err(e)) => Err(StorageError::WriteFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            }),
            Err(_) => Err(StorageError::WriteTimeout {
                path: self.path.clone(),
                timeout: self.write_timeout,
            }),
        };
        if result.is_err() {
            let _ = fs::remove_file(&temp_path).await;
        }
        result
    }

    async fn write_temp_file(&self, temp_path: &Path, content: String) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await?;
        }
        let mut file = fs::File::create(temp_path).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await
    }
}

/// `ledger.yaml` + `.corrupt` -> `ledger.yaml.corrupt`
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Fresh temp file next to the ledger for every save, e.g. `ledger.yaml.3.tmp`,
/// so a timed-out write can't land in the file a later save renames.
fn temp_path(path: &Path) -> PathBuf {
    static SAVES: AtomicU64 = AtomicU64::new(0);
    let n = SAVES.fetch_add(1, Ordering::Relaxed);
    sibling_path(path, &format!(".{}.tmp", n))
}

#[async_trait::async_trait]
impl LedgerStorageTrait for PersistentLedgerStorage {
    async fn get_bucket(&self, key: &LedgerKey) -> LedgerBucket {
        let storage_guard = self.data.lock().await;
        storage_guard.get(key).cloned().unwrap_or_default()
    }

    async fn commit(&self, key: LedgerKey, bucket: LedgerBucket) -> Result<(), StorageError> {
        // Hold the lock through the write so commits land on disk in order
        let mut storage_guard = self.data.lock().await;
        let mut updated = storage_guard.clone();
        updated.insert(key, bucket);

        if let Err(e) = self.save(&updated).await {
            log::error!("Failed to commit bucket {}: {}", key, e);
            return Err(e);
        }
        *storage_guard = updated;
        Ok(())
    }
}
