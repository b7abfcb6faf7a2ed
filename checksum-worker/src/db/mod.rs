//! 元数据存储层
//!
//! [`MetadataRepository`] is the seam every checker component talks to;
//! [`ChecksumStorage`] is the redb-backed implementation.

pub mod storage;

pub use storage::{ChecksumStorage, StorageError, StorageResult, StorageStats};

use shared::{
    BitstreamInfo, ChecksumHistory, ChecksumHistoryCreate, DsoRecord, DsoRef, MostRecentChecksum,
};

/// 校验器所需的全部元数据操作
///
/// Each call is its own transaction. Callers must not assume two calls
/// observe a consistent snapshot.
pub trait MetadataRepository: Send + Sync {
    /// Ingest-time metadata for a bitstream
    fn load_bitstream(&self, bitstream_id: u64) -> StorageResult<Option<BitstreamInfo>>;

    fn load_current_status(&self, bitstream_id: u64) -> StorageResult<Option<MostRecentChecksum>>;

    /// Insert or replace the status record (last writer wins)
    fn upsert_current_status(&self, record: &MostRecentChecksum) -> StorageResult<()>;

    /// Append one immutable history row; the store assigns its sequence
    fn append_history(&self, entry: ChecksumHistoryCreate) -> StorageResult<ChecksumHistory>;

    /// History rows for one bitstream, oldest first
    fn history_for(&self, bitstream_id: u64) -> StorageResult<Vec<ChecksumHistory>>;

    /// Up to `limit` status records with id strictly greater than `after`, ascending
    fn status_page_after(
        &self,
        after: Option<u64>,
        limit: usize,
    ) -> StorageResult<Vec<MostRecentChecksum>>;

    /// Create unprocessed status records for bitstreams that have none.
    /// Returns how many were created.
    fn reconcile_missing(&self) -> StorageResult<usize>;

    fn find_object(&self, object: &DsoRef) -> StorageResult<Option<DsoRecord>>;

    fn find_by_handle(&self, handle: &str) -> StorageResult<Option<DsoRecord>>;
}
