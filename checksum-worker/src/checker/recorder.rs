//! 结果记录 - 持久化校验结果
//!
//! Two writes per attempt, in this order:
//!
//! 1. upsert the bitstream's current-status record (last writer wins)
//! 2. append one immutable history row
//!
//! The writes are separate transactions. A crash between them leaves the
//! status updated without its history row; the next run repairs the status
//! and the gap in history is tolerated.

use super::verifier::VerificationAttempt;
use crate::audit_log;
use crate::db::{MetadataRepository, StorageResult};
use crate::utils::{CheckerError, CheckerResult};
use shared::{ChecksumHistory, ChecksumHistoryCreate, MostRecentChecksum};
use std::sync::Arc;

/// 结果记录器
pub struct ResultRecorder {
    repo: Arc<dyn MetadataRepository>,
}

impl ResultRecorder {
    pub fn new(repo: Arc<dyn MetadataRepository>) -> Self {
        Self { repo }
    }

    /// Status first, then history. Either failure is fatal for the run.
    ///
    /// The two writes are separate transactions: a crash in between leaves
    /// history one entry behind the current status.
    pub fn record(
        &self,
        attempt: &VerificationAttempt,
    ) -> CheckerResult<(MostRecentChecksum, ChecksumHistory)> {
        let recording_error = |source| CheckerError::Recording {
            bitstream_id: attempt.bitstream_id,
            source,
        };

        let status = self.record_status(attempt).map_err(recording_error)?;
        let history = self.append_history(attempt).map_err(recording_error)?;
        Ok((status, history))
    }

    /// Merge the attempt into the existing status record (or a fresh one) and upsert it
    pub fn record_status(&self, attempt: &VerificationAttempt) -> StorageResult<MostRecentChecksum> {
        let mut record = self
            .repo
            .load_current_status(attempt.bitstream_id)?
            .unwrap_or_else(|| MostRecentChecksum {
                bitstream_id: attempt.bitstream_id,
                checksum_algorithm: String::new(),
                expected_checksum: String::new(),
                current_checksum: None,
                result: None,
                process_start_date: None,
                process_end_date: None,
                to_be_processed: true,
                marked_deleted: false,
            });

        // an attempt without metadata knows nothing about deletion; keep the stored flags
        if let Some(algorithm) = &attempt.checksum_algorithm {
            record.checksum_algorithm.clone_from(algorithm);
            record.to_be_processed = !attempt.deleted;
            record.marked_deleted = attempt.deleted;
        }
        if let Some(expected) = &attempt.expected_checksum {
            record.expected_checksum.clone_from(expected);
        }
        record.current_checksum.clone_from(&attempt.calculated_checksum);
        record.result = Some(attempt.result);
        record.process_start_date = Some(attempt.process_start_date);
        record.process_end_date = Some(attempt.process_end_date);

        self.repo.upsert_current_status(&record)?;
        Ok(record)
    }

    /// Append one history row for the attempt
    pub fn append_history(&self, attempt: &VerificationAttempt) -> StorageResult<ChecksumHistory> {
        let entry = self.repo.append_history(ChecksumHistoryCreate {
            bitstream_id: attempt.bitstream_id,
            checksum_algorithm: attempt.checksum_algorithm.clone().unwrap_or_default(),
            expected_checksum: attempt.expected_checksum.clone().unwrap_or_default(),
            current_checksum: attempt.calculated_checksum.clone(),
            result: attempt.result,
            process_start_date: attempt.process_start_date,
            process_end_date: attempt.process_end_date,
        })?;

        audit_log!(entry.bitstream_id, entry.result, entry.sequence);
        Ok(entry)
    }
}
