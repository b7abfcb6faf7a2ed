//! 工具模块 - 通用工具函数和类型
//!
//! # 内容
//!
//! - [`CheckerError`] - 校验器错误类型 (maps onto `shared::error::AppError`)
//! - 日志初始化与清理
//! - 日期参数解析

pub mod error;
pub mod logger;
pub mod time;

pub use error::{CheckerError, CheckerResult};
