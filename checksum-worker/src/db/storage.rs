//! redb-based storage layer for fixity metadata
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `bitstreams` | `bitstream_id` | `BitstreamInfo` | Ingest-time metadata |
//! | `most_recent_checksum` | `bitstream_id` | `MostRecentChecksum` | Current status (upsert) |
//! | `checksum_history` | `(bitstream_id, sequence)` | `ChecksumHistory` | Attempt log (append-only) |
//! | `dso_objects` | `TYPE.ID` | `DsoRecord` | Containment tree |
//! | `handles` | handle | `TYPE.ID` | Handle lookup |
//! | `sequence_counter` | `"history"` | `u64` | History sequence |
//!
//! # Durability
//!
//! redb commits with `Durability::Immediate`: a status or history write is
//! persistent as soon as its call returns.

use super::MetadataRepository;
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use shared::{
    BitstreamInfo, ChecksumHistory, ChecksumHistoryCreate, DsoRecord, DsoRef, MostRecentChecksum,
};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// key = bitstream_id, value = JSON-serialized BitstreamInfo
const BITSTREAMS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("bitstreams");

/// key = bitstream_id, value = JSON-serialized MostRecentChecksum
const MOST_RECENT_TABLE: TableDefinition<u64, &[u8]> =
    TableDefinition::new("most_recent_checksum");

/// key = (bitstream_id, sequence), value = JSON-serialized ChecksumHistory
const HISTORY_TABLE: TableDefinition<(u64, u64), &[u8]> =
    TableDefinition::new("checksum_history");

/// key = "TYPE.ID", value = JSON-serialized DsoRecord
const OBJECTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("dso_objects");

/// key = handle, value = "TYPE.ID"
const HANDLES_TABLE: TableDefinition<&str, &str> = TableDefinition::new("handles");

const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

const HISTORY_SEQUENCE_KEY: &str = "history";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Bitstream not found: {0}")]
    BitstreamNotFound(u64),

    #[error("Repository unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Fixity metadata storage backed by redb
#[derive(Clone)]
pub struct ChecksumStorage {
    db: Arc<Database>,
}

impl ChecksumStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init_tables(&db)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init_tables(&db)?;
        Ok(Self { db: Arc::new(db) })
    }

    fn init_tables(db: &Database) -> StorageResult<()> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(BITSTREAMS_TABLE)?;
            let _ = write_txn.open_table(MOST_RECENT_TABLE)?;
            let _ = write_txn.open_table(HISTORY_TABLE)?;
            let _ = write_txn.open_table(OBJECTS_TABLE)?;
            let _ = write_txn.open_table(HANDLES_TABLE)?;

            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            if seq_table.get(HISTORY_SEQUENCE_KEY)?.is_none() {
                seq_table.insert(HISTORY_SEQUENCE_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    // ========== Registration (ingest side) ==========

    /// Store or replace a bitstream's metadata and its place in the tree
    pub fn register_bitstream(
        &self,
        info: &BitstreamInfo,
        parent: Option<DsoRef>,
    ) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(BITSTREAMS_TABLE)?;
            let value = serde_json::to_vec(info)?;
            table.insert(info.bitstream_id, value.as_slice())?;
        }
        Self::put_object(
            &txn,
            &DsoRecord {
                object: DsoRef::bitstream(info.bitstream_id),
                handle: None,
                parent,
            },
        )?;
        txn.commit()?;
        Ok(())
    }

    /// Store or replace a container object (item, collection, community)
    pub fn register_object(&self, record: &DsoRecord) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        Self::put_object(&txn, record)?;
        txn.commit()?;
        Ok(())
    }

    fn put_object(txn: &WriteTransaction, record: &DsoRecord) -> StorageResult<()> {
        let key = record.object.key();
        {
            let mut table = txn.open_table(OBJECTS_TABLE)?;
            let value = serde_json::to_vec(record)?;
            table.insert(key.as_str(), value.as_slice())?;
        }
        if let Some(handle) = &record.handle {
            let mut handles = txn.open_table(HANDLES_TABLE)?;
            handles.insert(handle.as_str(), key.as_str())?;
        }
        Ok(())
    }

    // ========== Sequence Operations ==========

    /// Increment and return the history sequence (within transaction)
    fn next_history_sequence(txn: &WriteTransaction) -> StorageResult<u64> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        let current = table
            .get(HISTORY_SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0);
        let next = current + 1;
        table.insert(HISTORY_SEQUENCE_KEY, next)?;
        Ok(next)
    }

    // ========== Statistics ==========

    /// Get storage statistics
    pub fn get_stats(&self) -> StorageResult<StorageStats> {
        let read_txn = self.db.begin_read()?;

        let bitstreams = read_txn.open_table(BITSTREAMS_TABLE)?;
        let status = read_txn.open_table(MOST_RECENT_TABLE)?;
        let history = read_txn.open_table(HISTORY_TABLE)?;
        let objects = read_txn.open_table(OBJECTS_TABLE)?;
        let seq_table = read_txn.open_table(SEQUENCE_TABLE)?;

        Ok(StorageStats {
            bitstream_count: bitstreams.len()?,
            status_count: status.len()?,
            history_count: history.len()?,
            object_count: objects.len()?,
            current_sequence: seq_table
                .get(HISTORY_SEQUENCE_KEY)?
                .map(|guard| guard.value())
                .unwrap_or(0),
        })
    }
}

impl MetadataRepository for ChecksumStorage {
    fn load_bitstream(&self, bitstream_id: u64) -> StorageResult<Option<BitstreamInfo>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BITSTREAMS_TABLE)?;

        match table.get(bitstream_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn load_current_status(&self, bitstream_id: u64) -> StorageResult<Option<MostRecentChecksum>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MOST_RECENT_TABLE)?;

        match table.get(bitstream_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn upsert_current_status(&self, record: &MostRecentChecksum) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(MOST_RECENT_TABLE)?;
            let value = serde_json::to_vec(record)?;
            table.insert(record.bitstream_id, value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    fn append_history(&self, entry: ChecksumHistoryCreate) -> StorageResult<ChecksumHistory> {
        let txn = self.db.begin_write()?;
        let sequence = Self::next_history_sequence(&txn)?;
        let entry = entry.into_history(sequence);
        {
            let mut table = txn.open_table(HISTORY_TABLE)?;
            let value = serde_json::to_vec(&entry)?;
            table.insert((entry.bitstream_id, sequence), value.as_slice())?;
        }
        txn.commit()?;
        Ok(entry)
    }

    fn history_for(&self, bitstream_id: u64) -> StorageResult<Vec<ChecksumHistory>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(HISTORY_TABLE)?;

        let mut entries = Vec::new();
        for result in table.range((bitstream_id, 0u64)..=(bitstream_id, u64::MAX))? {
            let (_key, value) = result?;
            entries.push(serde_json::from_slice(value.value())?);
        }
        Ok(entries)
    }

    fn status_page_after(
        &self,
        after: Option<u64>,
        limit: usize,
    ) -> StorageResult<Vec<MostRecentChecksum>> {
        let start = match after {
            Some(id) => match id.checked_add(1) {
                Some(next) => next,
                None => return Ok(Vec::new()),
            },
            None => 0,
        };

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MOST_RECENT_TABLE)?;

        let mut page = Vec::new();
        for result in table.range(start..)?.take(limit) {
            let (_key, value) = result?;
            page.push(serde_json::from_slice(value.value())?);
        }
        Ok(page)
    }

    fn reconcile_missing(&self) -> StorageResult<usize> {
        let txn = self.db.begin_write()?;
        let created = {
            let bitstreams = txn.open_table(BITSTREAMS_TABLE)?;
            let mut status = txn.open_table(MOST_RECENT_TABLE)?;

            let mut missing = Vec::new();
            for result in bitstreams.iter()? {
                let (key, value) = result?;
                if status.get(key.value())?.is_none() {
                    let info: BitstreamInfo = serde_json::from_slice(value.value())?;
                    missing.push(MostRecentChecksum::unprocessed(&info));
                }
            }

            for record in &missing {
                let value = serde_json::to_vec(record)?;
                status.insert(record.bitstream_id, value.as_slice())?;
            }
            missing.len()
        };
        txn.commit()?;
        Ok(created)
    }

    fn find_object(&self, object: &DsoRef) -> StorageResult<Option<DsoRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(OBJECTS_TABLE)?;

        match table.get(object.key().as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn find_by_handle(&self, handle: &str) -> StorageResult<Option<DsoRecord>> {
        let read_txn = self.db.begin_read()?;
        let handles = read_txn.open_table(HANDLES_TABLE)?;
        let objects = read_txn.open_table(OBJECTS_TABLE)?;

        let key = match handles.get(handle)? {
            Some(guard) => guard.value().to_string(),
            None => return Ok(None),
        };
        match objects.get(key.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    pub bitstream_count: u64,
    pub status_count: u64,
    pub history_count: u64,
    pub object_count: u64,
    pub current_sequence: u64,
}
