use std::sync::Arc;

use chrono::{DateTime, TimeZone};
use teloxide::types::ChatId;
use tokio::sync::Mutex;

use crate::{
    parser::Amount,
    storages::{
        LedgerBucket, LedgerKey, LedgerStorageTrait, MonthKey, StorageError, TotalTooLarge,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error(transparent)]
    TotalTooLarge(#[from] TotalTooLarge),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, thiserror::Error)]
pub enum UndoError {
    #[error("nothing to undo")]
    NothingToUndo,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Bucket key for the chat in the calendar month of `now`.
///
/// Operations always target "this month": an entry recorded just before
/// midnight on the last day of a month can't be undone just after it.
pub fn current_month_key<Tz: TimeZone>(chat_id: ChatId, now: &DateTime<Tz>) -> LedgerKey {
    LedgerKey::new(MonthKey::from_datetime(now), chat_id)
}

/// Applies ledger operations on top of a storage.
///
/// Every operation re-reads the bucket, mutates it and commits it while
/// holding `lock`, so concurrent messages can't lose each other's entries.
pub struct LedgerEngine {
    storage: Arc<dyn LedgerStorageTrait>,
    lock: Mutex<()>,
}

impl LedgerEngine {
    pub fn new(storage: Arc<dyn LedgerStorageTrait>) -> Self {
        Self {
            storage,
            lock: Mutex::new(()),
        }
    }

    /// Append an amount and return the new total
    pub async fn record_amount(
        &self,
        key: &LedgerKey,
        amount: Amount,
    ) -> Result<Amount, RecordError> {
        let _guard = self.lock.lock().await;
        let mut bucket = self.storage.get_bucket(key).await;
        let total = bucket.push(amount)?;
        self.storage.commit(*key, bucket).await?;
        log::info!("Recorded {} in {}, total {}", amount, key, total);
        Ok(total)
    }

    /// Remove the last amount; returns it together with the new total
    pub async fn undo_last(&self, key: &LedgerKey) -> Result<(Amount, Amount), UndoError> {
        let _guard = self.lock.lock().await;
        let mut bucket = self.storage.get_bucket(key).await;
        let removed = bucket.pop().ok_or(UndoError::NothingToUndo)?;
        let total = bucket.total();
        self.storage.commit(*key, bucket).await?;
        log::info!("Removed {} from {}, total {}", removed, key, total);
        Ok((removed, total))
    }

    pub async fn bucket(&self, key: &LedgerKey) -> LedgerBucket {
        let _guard = self.lock.lock().await;
        self.storage.get_bucket(key).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Local, Utc};
    use tempfile::TempDir;

    use super::*;
    use crate::storages::{LedgerStorage, PersistentLedgerStorage};

    fn amount(s: &str) -> Amount {
        s.parse().unwrap()
    }

    fn march(chat: i64) -> LedgerKey {
        LedgerKey::new(MonthKey::new(2024, 3).unwrap(), ChatId(chat))
    }

    fn memory_engine() -> LedgerEngine {
        LedgerEngine::new(Arc::new(LedgerStorage::new()))
    }

    #[tokio::test]
    async fn test_record_accumulates_total() {
        let engine = memory_engine();
        assert_eq!(engine.record_amount(&march(1), amount("10")).await.unwrap(), amount("10"));
        assert_eq!(
            engine.record_amount(&march(1), amount("5,5")).await.unwrap(),
            amount("15.50")
        );
        assert_eq!(
            engine.bucket(&march(1)).await.entries(),
            &[amount("10"), amount("5.5")]
        );
    }

    #[tokio::test]
    async fn test_undo_inverts_record() {
        let engine = memory_engine();
        engine.record_amount(&march(1), amount("10")).await.unwrap();
        let before = engine.bucket(&march(1)).await;

        engine.record_amount(&march(1), amount("2.35")).await.unwrap();
        let (removed, total) = engine.undo_last(&march(1)).await.unwrap();

        assert_eq!(removed, amount("2.35"));
        assert_eq!(total, before.total());
        assert_eq!(engine.bucket(&march(1)).await, before);
    }

    #[tokio::test]
    async fn test_undo_on_empty_bucket() {
        let engine = memory_engine();
        assert!(matches!(
            engine.undo_last(&march(1)).await,
            Err(UndoError::NothingToUndo)
        ));

        engine.record_amount(&march(1), amount("1")).await.unwrap();
        engine.undo_last(&march(1)).await.unwrap();
        assert!(matches!(
            engine.undo_last(&march(1)).await,
            Err(UndoError::NothingToUndo)
        ));
    }

    #[tokio::test]
    async fn test_empty_undo_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("expenses.yaml");

        let storage = Arc::new(PersistentLedgerStorage::load(&path).await);
        let engine = LedgerEngine::new(storage);
        assert!(matches!(
            engine.undo_last(&march(1)).await,
            Err(UndoError::NothingToUndo)
        ));
        assert!(!path.exists());

        engine.record_amount(&march(2), amount("7")).await.unwrap();
        let bytes_before = std::fs::read(&path).unwrap();
        assert!(matches!(
            engine.undo_last(&march(1)).await,
            Err(UndoError::NothingToUndo)
        ));
        assert_eq!(std::fs::read(&path).unwrap(), bytes_before);
    }

    #[tokio::test]
    async fn test_months_are_isolated() {
        let engine = memory_engine();
        let end_of_march = Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap();
        let start_of_april = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 1).unwrap();
        let march_key = current_month_key(ChatId(1), &end_of_march);
        let april_key = current_month_key(ChatId(1), &start_of_april);
        assert_ne!(march_key, april_key);

        engine.record_amount(&march_key, amount("10")).await.unwrap();
        engine.record_amount(&april_key, amount("3")).await.unwrap();
        assert_eq!(engine.bucket(&march_key).await.total(), amount("10"));
        assert_eq!(engine.bucket(&april_key).await.total(), amount("3"));
    }

    #[tokio::test]
    async fn test_undo_does_not_reach_into_previous_month() {
        let engine = memory_engine();
        let end_of_march = Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap();
        let start_of_april = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 1).unwrap();

        engine
            .record_amount(&current_month_key(ChatId(1), &end_of_march), amount("10"))
            .await
            .unwrap();
        assert!(matches!(
            engine
                .undo_last(&current_month_key(ChatId(1), &start_of_april))
                .await,
            Err(UndoError::NothingToUndo)
        ));
        assert_eq!(
            engine
                .bucket(&current_month_key(ChatId(1), &end_of_march))
                .await
                .total(),
            amount("10")
        );
    }

    #[tokio::test]
    async fn test_chats_are_isolated() {
        let engine = memory_engine();
        engine.record_amount(&march(1), amount("10")).await.unwrap();
        engine.record_amount(&march(2), amount("20")).await.unwrap();
        let (removed, total) = engine.undo_last(&march(2)).await.unwrap();
        assert_eq!((removed, total), (amount("20"), Amount::ZERO));
        assert_eq!(engine.bucket(&march(1)).await.total(), amount("10"));
    }

    #[tokio::test]
    async fn test_record_past_max_total_is_refused() {
        let engine = memory_engine();
        engine
            .record_amount(&march(1), amount("9999999999999.99"))
            .await
            .unwrap();
        let before = engine.bucket(&march(1)).await;

        assert!(matches!(
            engine.record_amount(&march(1), amount("0.01")).await,
            Err(RecordError::TotalTooLarge(_))
        ));
        assert_eq!(engine.bucket(&march(1)).await, before);
        assert_eq!(before.total(), Amount::MAX);
    }

    #[tokio::test]
    async fn test_failed_commit_is_reported_and_state_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.yaml");
        let storage = Arc::new(PersistentLedgerStorage::load(&path).await);
        let engine = LedgerEngine::new(storage);
        engine.record_amount(&march(1), amount("10")).await.unwrap();

        // Make the rename fail: the target is now a non-empty directory
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "").unwrap();

        assert!(engine.record_amount(&march(1), amount("5")).await.is_err());
        assert!(matches!(
            engine.undo_last(&march(1)).await,
            Err(UndoError::Storage(_))
        ));
        assert_eq!(engine.bucket(&march(1)).await.entries(), &[amount("10")]);
    }

    #[tokio::test]
    async fn test_concurrent_records_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("expenses.yaml");
        let engine = Arc::new(LedgerEngine::new(Arc::new(
            PersistentLedgerStorage::load(&path).await,
        )));

        let mut tasks = Vec::new();
        for i in 0..20 {
            let engine = engine.clone();
            tasks.push(tokio::spawn(async move {
                engine
                    .record_amount(&march(i % 3), amount("1.25"))
                    .await
                    .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let reloaded = PersistentLedgerStorage::try_load(&path).await.unwrap();
        let entries = count_entries(&reloaded).await;
        assert_eq!(entries, 20);
    }

    async fn count_entries(storage: &PersistentLedgerStorage) -> usize {
        let mut count = 0;
        for chat in 0..3 {
            count += storage.get_bucket(&march(chat)).await.entries().len();
        }
        count
    }

    #[test]
    fn test_current_month_key_with_local_time() {
        let now = Local.with_ymd_and_hms(2024, 12, 15, 12, 0, 0).unwrap();
        assert_eq!(
            current_month_key(ChatId(9), &now),
            LedgerKey::new(MonthKey::new(2024, 12).unwrap(), ChatId(9))
        );
    }
}
