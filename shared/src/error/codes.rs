//! Unified error codes
//!
//! Error codes are organized by category:
//! - 1xxx: Selection / configuration errors
//! - 2xxx: Storage errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so they stay stable in
/// logs and process output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 1xxx: Selection ====================
    /// Inclusion and exclusion criteria set together
    ConflictingCriteria = 1001,
    /// Result name is not part of the taxonomy
    UnknownResult = 1002,
    /// Action name is not one of check/print/history/delete
    UnknownAction = 1003,
    /// Scope root could not be resolved
    ScopeNotFound = 1004,
    /// Item limit must be positive
    InvalidItemLimit = 1005,
    /// Date bound could not be parsed
    InvalidDate = 1006,

    // ==================== 2xxx: Storage ====================
    /// Metadata store could not be opened or read
    StorageUnavailable = 2001,
    /// Stored record could not be decoded
    StorageCorrupted = 2002,
    /// Writing a verification result failed
    RecordingFailed = 2003,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
    /// Configuration error (environment)
    ConfigError = 9002,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // Selection
            1001 => Ok(ErrorCode::ConflictingCriteria),
            1002 => Ok(ErrorCode::UnknownResult),
            1003 => Ok(ErrorCode::UnknownAction),
            1004 => Ok(ErrorCode::ScopeNotFound),
            1005 => Ok(ErrorCode::InvalidItemLimit),
            1006 => Ok(ErrorCode::InvalidDate),

            // Storage
            2001 => Ok(ErrorCode::StorageUnavailable),
            2002 => Ok(ErrorCode::StorageCorrupted),
            2003 => Ok(ErrorCode::RecordingFailed),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}
