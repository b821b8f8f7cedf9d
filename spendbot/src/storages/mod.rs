mod bucket;
mod ledger_storage;
mod persistent_ledger_storage;

pub use bucket::{LedgerBucket, LedgerKey, MonthKey, TotalTooLarge};
pub use ledger_storage::{LedgerStorage, LedgerStorageTrait, StorageError};
pub use persistent_ledger_storage::PersistentLedgerStorage;
