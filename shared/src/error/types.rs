//! Application error type

use super::codes::ErrorCode;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Application error with structured error code and details
///
/// - Standardized error codes via [`ErrorCode`]
/// - Human-readable messages
/// - Optional structured details for debugging
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (context for logs)
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Process exit status for this error (always non-zero)
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_with_detail() {
        let err = AppError::with_message(ErrorCode::ConflictingCriteria, "bad criteria")
            .with_detail("include", "CHECKSUM_MATCH")
            .with_detail("exclude", "BITSTREAM_NOT_FOUND");

        assert_eq!(err.code, ErrorCode::ConflictingCriteria);
        let details = err.details.unwrap();
        assert_eq!(details.get("include").unwrap(), "CHECKSUM_MATCH");
        assert_eq!(details.get("exclude").unwrap(), "BITSTREAM_NOT_FOUND");
    }

    #[test]
    fn test_app_error_exit_code() {
        let err = AppError::with_message(ErrorCode::StorageUnavailable, "locked");
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.code.category(), crate::error::ErrorCategory::Storage);
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::with_message(ErrorCode::UnknownAction, "Unknown do action purge");
        assert_eq!(format!("{}", err), "Unknown do action purge");
    }
}
