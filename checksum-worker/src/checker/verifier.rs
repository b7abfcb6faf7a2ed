//! 校验引擎 - 对单个 bitstream 执行一次校验
//!
//! Never fails: every problem becomes a [`ChecksumResult`] on the returned
//! [`VerificationAttempt`]. The byte stream is released before `verify`
//! returns, whatever the outcome.

use super::digest::{DigestError, checksums_match, digest_stream};
use crate::bitstore::{BitstreamStore, RetrieveError};
use crate::db::MetadataRepository;
use serde::Serialize;
use shared::util::{format_optional_millis, now_millis};
use shared::{BitstreamInfo, ChecksumResult};
use std::sync::Arc;

/// 一次校验的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationAttempt {
    pub bitstream_id: u64,
    pub result: ChecksumResult,
    /// `None` when metadata could not be loaded
    pub checksum_algorithm: Option<String>,
    pub expected_checksum: Option<String>,
    /// Only set when a digest was computed
    pub calculated_checksum: Option<String>,
    pub deleted: bool,
    /// Unix millis
    pub process_start_date: i64,
    /// Unix millis, never earlier than the start
    pub process_end_date: i64,
}

impl VerificationAttempt {
    fn info_not_found(bitstream_id: u64) -> Self {
        let now = now_millis();
        Self {
            bitstream_id,
            result: ChecksumResult::InfoNotFound,
            checksum_algorithm: None,
            expected_checksum: None,
            calculated_checksum: None,
            deleted: false,
            process_start_date: now,
            process_end_date: now,
        }
    }

    /// Single-line dump used by verbose reports and debug logs
    pub fn to_long_string(&self) -> String {
        format!(
            "VerificationAttempt bitstream_id={} result={} algorithm={} expected={} calculated={} deleted={} start={} end={}",
            self.bitstream_id,
            self.result,
            self.checksum_algorithm.as_deref().unwrap_or("-"),
            self.expected_checksum.as_deref().unwrap_or("-"),
            self.calculated_checksum.as_deref().unwrap_or("-"),
            self.deleted,
            format_optional_millis(Some(self.process_start_date)),
            format_optional_millis(Some(self.process_end_date)),
        )
    }
}

/// 校验引擎
pub struct VerificationEngine {
    repo: Arc<dyn MetadataRepository>,
    store: Arc<dyn BitstreamStore>,
}

impl VerificationEngine {
    pub fn new(repo: Arc<dyn MetadataRepository>, store: Arc<dyn BitstreamStore>) -> Self {
        Self { repo, store }
    }

    /// Verify one bitstream against its recorded checksum
    pub fn verify(&self, bitstream_id: u64) -> VerificationAttempt {
        let info = match self.repo.load_bitstream(bitstream_id) {
            Ok(Some(info)) => info,
            Ok(None) => return VerificationAttempt::info_not_found(bitstream_id),
            Err(e) => {
                tracing::warn!(bitstream_id, error = %e, "Failed to load bitstream metadata");
                return VerificationAttempt::info_not_found(bitstream_id);
            }
        };

        let process_start_date = now_millis();
        let (result, calculated_checksum) = if info.deleted {
            (ChecksumResult::MarkedDeleted, None)
        } else {
            self.check_stored_bytes(&info)
        };
        let process_end_date = now_millis().max(process_start_date);

        tracing::debug!(
            bitstream_id,
            result = %result,
            expected = %info.checksum,
            calculated = calculated_checksum.as_deref().unwrap_or("-"),
            "Bitstream verified"
        );

        VerificationAttempt {
            bitstream_id,
            result,
            checksum_algorithm: Some(info.checksum_algorithm),
            expected_checksum: Some(info.checksum),
            calculated_checksum,
            deleted: info.deleted,
            process_start_date,
            process_end_date,
        }
    }

    fn check_stored_bytes(&self, info: &BitstreamInfo) -> (ChecksumResult, Option<String>) {
        let bitstream_id = info.bitstream_id;

        let digest = match self.store.retrieve(bitstream_id) {
            Ok(mut stream) => digest_stream(&mut stream, &info.checksum_algorithm),
            Err(RetrieveError::Repository(e)) => {
                tracing::warn!(bitstream_id, error = %e, "Metadata error while opening bitstream");
                return (ChecksumResult::NotProcessed, None);
            }
            Err(e) => {
                tracing::warn!(bitstream_id, error = %e, "Bitstream unavailable");
                return (ChecksumResult::NotFound, None);
            }
        };

        match digest {
            Ok(calculated) => {
                let result = if checksums_match(&info.checksum, &calculated) {
                    ChecksumResult::Match
                } else {
                    ChecksumResult::NoMatch
                };
                (result, Some(calculated))
            }
            Err(DigestError::UnsupportedAlgorithm(name)) => {
                tracing::warn!(bitstream_id, algorithm = %name, "Unsupported checksum algorithm");
                (ChecksumResult::AlgorithmInvalid, None)
            }
            Err(DigestError::Io(e)) => {
                tracing::warn!(bitstream_id, error = %e, "Read failed while digesting");
                (ChecksumResult::NotFound, None)
            }
        }
    }
}
