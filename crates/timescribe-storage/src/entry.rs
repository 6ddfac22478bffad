//! Entry storage - embedded journal entry persistence.
//!
//! Entries are stored under `user_id:YYYY-MM-DD:seq` keys. ISO dates sort
//! lexicographically, so a key range scan between two days yields the
//! user's entries ordered by day and then by insertion sequence.
//!
//! # Tables
//!
//! - `journal_entries`: user_id:date:seq -> entry JSON

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use redb::{Database, ReadableDatabase, TableDefinition};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use timescribe_traits::{DateRange, EntryStore, MemoryEntry, StoreResult};

use crate::range_utils::day_range_bounds;

const ENTRY_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("journal_entries");

/// Embedded entry store backed by redb
#[derive(Debug, Clone)]
pub struct EntryStorage {
    db: Arc<Database>,
    sequence: Arc<AtomicU64>,
}

impl EntryStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(ENTRY_TABLE)?;
        write_txn.commit()?;

        // Seeded from the wall clock so sequences keep growing across restarts.
        let seed = Utc::now().timestamp_nanos_opt().unwrap_or(0).max(0) as u64;

        Ok(Self {
            db,
            sequence: Arc::new(AtomicU64::new(seed)),
        })
    }

    fn entry_key(&self, entry: &MemoryEntry) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        format!(
            "{}:{}:{:020}",
            entry.user_id,
            entry.timestamp.format("%Y-%m-%d"),
            seq
        )
    }

    /// Store one entry.
    pub fn put_entry(&self, entry: &MemoryEntry) -> Result<()> {
        let key = self.entry_key(entry);
        let data = serde_json::to_vec(entry)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ENTRY_TABLE)?;
            table.insert(key.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// List a user's entries inside `range`, ordered by day then insertion.
    pub fn list_entries_in_range(
        &self,
        user_id: &str,
        range: DateRange,
    ) -> Result<Vec<MemoryEntry>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }

        let (start, end) = day_range_bounds(
            user_id,
            &range.start.format("%Y-%m-%d").to_string(),
            &range.end.format("%Y-%m-%d").to_string(),
        );

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTRY_TABLE)?;

        let mut entries = Vec::new();
        for item in table.range(start.as_str()..end.as_str())? {
            let (_, value) = item?;
            let entry: MemoryEntry = serde_json::from_slice(value.value())?;
            // User ids may themselves contain ':'; only keep exact owners.
            if entry.user_id == user_id && range.contains(entry.timestamp) {
                entries.push(entry);
            }
        }

        Ok(entries)
    }
}

#[async_trait]
impl EntryStore for EntryStorage {
    async fn append(&self, entry: &MemoryEntry) -> StoreResult<()> {
        self.put_entry(entry)?;
        tracing::debug!(user_id = %entry.user_id, date = %entry.timestamp, "Entry stored");
        Ok(())
    }

    async fn query_range(&self, user_id: &str, range: DateRange) -> StoreResult<Vec<String>> {
        let entries = self.list_entries_in_range(user_id, range)?;
        Ok(entries.into_iter().map(|entry| entry.text).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_test_storage() -> (EntryStorage, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(Database::create(db_path).unwrap());
        (EntryStorage::new(db).unwrap(), temp_dir)
    }

    #[tokio::test]
    async fn test_append_then_query_same_day() {
        let (storage, _tmp) = create_test_storage();
        let entry = MemoryEntry::new("sid", "Went for a 5k run", date(2024, 3, 1));
        storage.append(&entry).await.unwrap();

        let texts = storage
            .query_range("sid", DateRange::day(date(2024, 3, 1)))
            .await
            .unwrap();
        assert_eq!(texts, vec!["Went for a 5k run".to_string()]);
    }

    #[tokio::test]
    async fn test_query_is_inclusive_and_ordered() {
        let (storage, _tmp) = create_test_storage();
        for (day, text) in [
            (date(2024, 2, 29), "before"),
            (date(2024, 3, 1), "first"),
            (date(2024, 3, 3), "second"),
            (date(2024, 3, 3), "third"),
            (date(2024, 3, 5), "last"),
            (date(2024, 3, 6), "after"),
        ] {
            storage
                .append(&MemoryEntry::new("sid", text, day))
                .await
                .unwrap();
        }

        let texts = storage
            .query_range("sid", DateRange::new(date(2024, 3, 1), date(2024, 3, 5)))
            .await
            .unwrap();
        assert_eq!(texts, vec!["first", "second", "third", "last"]);
    }

    #[tokio::test]
    async fn test_inverted_range_returns_empty() {
        let (storage, _tmp) = create_test_storage();
        storage
            .append(&MemoryEntry::new("sid", "entry", date(2024, 3, 3)))
            .await
            .unwrap();

        let texts = storage
            .query_range("sid", DateRange::new(date(2024, 3, 5), date(2024, 3, 1)))
            .await
            .unwrap();
        assert!(texts.is_empty());
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let (storage, _tmp) = create_test_storage();
        storage
            .append(&MemoryEntry::new("sid", "mine", date(2024, 3, 1)))
            .await
            .unwrap();
        storage
            .append(&MemoryEntry::new("sid:2024-03-01", "tricky", date(2024, 3, 1)))
            .await
            .unwrap();
        storage
            .append(&MemoryEntry::new("ana", "theirs", date(2024, 3, 1)))
            .await
            .unwrap();

        let texts = storage
            .query_range("sid", DateRange::day(date(2024, 3, 1)))
            .await
            .unwrap();
        assert_eq!(texts, vec!["mine"]);
    }

    #[tokio::test]
    async fn test_no_entries_is_not_an_error() {
        let (storage, _tmp) = create_test_storage();
        let texts = storage
            .query_range("nobody", DateRange::day(date(2024, 3, 1)))
            .await
            .unwrap();
        assert!(texts.is_empty());
    }
}
