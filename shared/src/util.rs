use chrono::{DateTime, Utc};

/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Unix 毫秒 → RFC 3339 (UTC)
///
/// Returns `None` for timestamps chrono cannot represent.
pub fn millis_to_rfc3339(millis: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| dt.to_rfc3339())
}

/// Optional timestamp rendering used by report rows, `-` when unset
pub fn format_optional_millis(millis: Option<i64>) -> String {
    millis
        .and_then(millis_to_rfc3339)
        .unwrap_or_else(|| "-".to_string())
}
