//! 统一错误处理
//!
//! | 类别 | 说明 | 处理方式 |
//! |------|------|----------|
//! | Configuration | 参数冲突、未知结果名/动作、无法解析的 root | 运行前失败，进程非零退出 |
//! | Storage | 元数据库打开或读取失败 | 致命，进程非零退出 |
//! | Recording | 校验完成后写入结果失败 | 致命，终止本次运行 |
//! | Output | 报告输出失败 | 致命 |
//!
//! Per-bitstream verification failures are NOT errors: they are ordinary
//! [`shared::ChecksumResult`] values recorded like any other outcome.

use crate::db::StorageError;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

/// 校验器错误
#[derive(Debug, Error)]
pub enum CheckerError {
    /// Invalid or conflicting caller input; the run never starts
    #[error("{message}")]
    Configuration { code: ErrorCode, message: String },

    #[error("Metadata store error: {0}")]
    Storage(#[from] StorageError),

    /// Writing a result failed after verification; results would be lost
    #[error("Failed to record result for bitstream {bitstream_id}: {source}")]
    Recording {
        bitstream_id: u64,
        #[source]
        source: StorageError,
    },

    #[error("Report output error: {0}")]
    Output(#[from] std::io::Error),
}

impl CheckerError {
    pub fn configuration(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Configuration {
            code,
            message: message.into(),
        }
    }

    pub fn conflicting_criteria(message: impl Into<String>) -> Self {
        Self::configuration(ErrorCode::ConflictingCriteria, message)
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Configuration { code, .. } => *code,
            Self::Storage(StorageError::Serialization(_)) => ErrorCode::StorageCorrupted,
            Self::Storage(_) => ErrorCode::StorageUnavailable,
            Self::Recording { .. } => ErrorCode::RecordingFailed,
            Self::Output(_) => ErrorCode::InternalError,
        }
    }
}

impl From<CheckerError> for AppError {
    fn from(err: CheckerError) -> Self {
        let code = err.error_code();
        let app = AppError::with_message(code, err.to_string());
        match err {
            CheckerError::Recording { bitstream_id, .. } => {
                app.with_detail("bitstream_id", bitstream_id)
            }
            _ => app,
        }
    }
}

pub type CheckerResult<T> = Result<T, CheckerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_keeps_code() {
        let err = CheckerError::conflicting_criteria("-x, -i, and -l options are mutually exclusive");
        assert!(err.is_configuration());
        assert_eq!(err.error_code(), ErrorCode::ConflictingCriteria);

        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::ConflictingCriteria);
        assert_eq!(app.message, "-x, -i, and -l options are mutually exclusive");
    }

    #[test]
    fn test_recording_error_maps_to_recording_failed() {
        let err = CheckerError::Recording {
            bitstream_id: 42,
            source: StorageError::Unavailable("disk full".to_string()),
        };
        assert!(!err.is_configuration());
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::RecordingFailed);
        assert_eq!(app.details.unwrap().get("bitstream_id").unwrap(), 42);
    }

    #[test]
    fn test_storage_error_code() {
        let err: CheckerError = StorageError::Unavailable("locked".to_string()).into();
        assert_eq!(err.error_code(), ErrorCode::StorageUnavailable);
    }
}
