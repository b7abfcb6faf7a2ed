//! Checksum Models
//!
//! 校验结果分类 + 当前状态记录 + 历史记录。

use super::ParseModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 校验结果（封闭集合）
///
/// Variants are mutually exclusive. The derived ordering only drives the
/// order of report output; no decision depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChecksumResult {
    /// Recorded and calculated checksums agree
    #[serde(rename = "CHECKSUM_MATCH")]
    Match,
    /// Recorded and calculated checksums differ
    #[serde(rename = "CHECKSUM_NO_MATCH")]
    NoMatch,
    /// Stored bytes are missing or unreadable
    #[serde(rename = "BITSTREAM_NOT_FOUND")]
    NotFound,
    /// Bitstream is tombstoned, not verified
    #[serde(rename = "BITSTREAM_MARKED_DELETED")]
    MarkedDeleted,
    /// Recorded digest algorithm is not supported
    #[serde(rename = "CHECKSUM_ALGORITHM_INVALID")]
    AlgorithmInvalid,
    /// No metadata record exists for the id
    #[serde(rename = "BITSTREAM_INFO_NOT_FOUND")]
    InfoNotFound,
    /// Attempt failed for reasons unrelated to the bitstream's integrity
    #[serde(rename = "BITSTREAM_NOT_PROCESSED")]
    NotProcessed,
}

impl ChecksumResult {
    /// Every result, in display order
    pub const ALL: [ChecksumResult; 7] = [
        ChecksumResult::Match,
        ChecksumResult::NoMatch,
        ChecksumResult::NotFound,
        ChecksumResult::MarkedDeleted,
        ChecksumResult::AlgorithmInvalid,
        ChecksumResult::InfoNotFound,
        ChecksumResult::NotProcessed,
    ];

    /// 默认排除集合：已知无法校验的 bitstream
    pub const DEFAULT_EXCLUDES: [ChecksumResult; 3] = [
        ChecksumResult::NotFound,
        ChecksumResult::MarkedDeleted,
        ChecksumResult::AlgorithmInvalid,
    ];

    /// Canonical stored name
    pub const fn code(&self) -> &'static str {
        match self {
            ChecksumResult::Match => "CHECKSUM_MATCH",
            ChecksumResult::NoMatch => "CHECKSUM_NO_MATCH",
            ChecksumResult::NotFound => "BITSTREAM_NOT_FOUND",
            ChecksumResult::MarkedDeleted => "BITSTREAM_MARKED_DELETED",
            ChecksumResult::AlgorithmInvalid => "CHECKSUM_ALGORITHM_INVALID",
            ChecksumResult::InfoNotFound => "BITSTREAM_INFO_NOT_FOUND",
            ChecksumResult::NotProcessed => "BITSTREAM_NOT_PROCESSED",
        }
    }

    /// Short alias accepted on the command line
    pub const fn short_name(&self) -> &'static str {
        match self {
            ChecksumResult::Match => "MATCH",
            ChecksumResult::NoMatch => "MISMATCH",
            ChecksumResult::NotFound => "NOT_FOUND",
            ChecksumResult::MarkedDeleted => "MARKED_DELETED",
            ChecksumResult::AlgorithmInvalid => "ALGORITHM_INVALID",
            ChecksumResult::InfoNotFound => "INFO_NOT_FOUND",
            ChecksumResult::NotProcessed => "NOT_PROCESSED",
        }
    }

    /// Membership test against [`Self::DEFAULT_EXCLUDES`]
    pub fn is_default_excluded(&self) -> bool {
        Self::DEFAULT_EXCLUDES.contains(self)
    }

    /// True for everything except a match or a tombstone
    pub fn is_failure(&self) -> bool {
        !matches!(self, ChecksumResult::Match | ChecksumResult::MarkedDeleted)
    }
}

impl fmt::Display for ChecksumResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ChecksumResult {
    type Err = ParseModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|r| {
                r.code().eq_ignore_ascii_case(wanted) || r.short_name().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| ParseModelError::UnknownResult(wanted.to_string()))
    }
}

/// Bitstream 元数据（入库时记录）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitstreamInfo {
    pub bitstream_id: u64,
    /// Storage key inside the assetstore
    pub internal_id: String,
    /// Checksum recorded at ingest (hex)
    pub checksum: String,
    pub checksum_algorithm: String,
    #[serde(default)]
    pub deleted: bool,
}

/// 当前状态（每个 bitstream 一条，upsert，后写覆盖）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MostRecentChecksum {
    pub bitstream_id: u64,
    pub checksum_algorithm: String,
    pub expected_checksum: String,
    /// Unset until the first digest is computed
    pub current_checksum: Option<String>,
    /// Unset until the first completed attempt
    pub result: Option<ChecksumResult>,
    /// Unix millis
    pub process_start_date: Option<i64>,
    /// Unix millis
    pub process_end_date: Option<i64>,
    pub to_be_processed: bool,
    pub marked_deleted: bool,
}

impl MostRecentChecksum {
    /// Fresh record for a bitstream that has never been checked
    pub fn unprocessed(info: &BitstreamInfo) -> Self {
        Self {
            bitstream_id: info.bitstream_id,
            checksum_algorithm: info.checksum_algorithm.clone(),
            expected_checksum: info.checksum.clone(),
            current_checksum: None,
            result: None,
            process_start_date: None,
            process_end_date: None,
            to_be_processed: !info.deleted,
            marked_deleted: info.deleted,
        }
    }

    pub fn is_processed(&self) -> bool {
        self.result.is_some()
    }
}

/// 历史记录（append-only，不可修改）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumHistory {
    /// Global append sequence, unique per row
    pub sequence: u64,
    pub bitstream_id: u64,
    pub checksum_algorithm: String,
    pub expected_checksum: String,
    pub current_checksum: Option<String>,
    pub result: ChecksumResult,
    pub process_start_date: i64,
    pub process_end_date: i64,
}

/// 新历史记录（序号由存储层分配）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumHistoryCreate {
    pub bitstream_id: u64,
    pub checksum_algorithm: String,
    pub expected_checksum: String,
    pub current_checksum: Option<String>,
    pub result: ChecksumResult,
    pub process_start_date: i64,
    pub process_end_date: i64,
}

impl ChecksumHistoryCreate {
    pub fn into_history(self, sequence: u64) -> ChecksumHistory {
        ChecksumHistory {
            sequence,
            bitstream_id: self.bitstream_id,
            checksum_algorithm: self.checksum_algorithm,
            expected_checksum: self.expected_checksum,
            current_checksum: self.current_checksum,
            result: self.result,
            process_start_date: self.process_start_date,
            process_end_date: self.process_end_date,
        }
    }
}
