//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// - 1xxx: Selection / configuration errors
/// - 2xxx: Storage errors
/// - 9xxx (and anything else): System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Selection / configuration errors (1xxx)
    Selection,
    /// Storage errors (2xxx)
    Storage,
    /// System errors (9xxx)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            1000..2000 => Self::Selection,
            2000..3000 => Self::Storage,
            _ => Self::System,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::Selection => "selection",
            Self::Storage => "storage",
            Self::System => "system",
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_code() {
        assert_eq!(ErrorCategory::from_code(0), ErrorCategory::System);
        assert_eq!(ErrorCategory::from_code(1001), ErrorCategory::Selection);
        assert_eq!(ErrorCategory::from_code(2003), ErrorCategory::Storage);
        assert_eq!(ErrorCategory::from_code(9001), ErrorCategory::System);
        assert_eq!(ErrorCategory::from_code(10000), ErrorCategory::System);
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(
            ErrorCode::ConflictingCriteria.category(),
            ErrorCategory::Selection
        );
        assert_eq!(
            ErrorCode::RecordingFailed.category(),
            ErrorCategory::Storage
        );
        assert_eq!(ErrorCode::ConfigError.category(), ErrorCategory::System);
        assert_eq!(ErrorCategory::Selection.name(), "selection");
    }
}
