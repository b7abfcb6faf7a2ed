//! Checksum Worker - 位流固定性校验
//!
//! # 架构概述
//!
//! Periodically verifies stored bitstreams against the checksum recorded at
//! ingest, keeps one current-status record per bitstream plus an append-only
//! history of every attempt.
//!
//! - **选择** (`checker::selection`): lazy, paged candidate cursor with result/date/scope filters
//! - **校验** (`checker::verifier`): one attempt per bitstream, failures become results
//! - **记录** (`checker::recorder`): status upsert then history append
//! - **编排** (`checker::worker`): reconcile, iterate, report, stop at the item limit
//! - **存储** (`db`): embedded redb metadata store
//! - **位流** (`bitstore`): byte streams from the assetstore
//!
//! # 模块结构
//!
//! ```text
//! checksum-worker/src/
//! ├── core/          # 配置
//! ├── db/            # redb 元数据存储
//! ├── bitstore/      # 位流读取
//! ├── checker/       # 选择、校验、记录、编排、报告
//! ├── scope.rs       # 包含关系解析
//! └── utils/         # 错误、日志、日期解析
//! ```

pub mod bitstore;
pub mod checker;
pub mod core;
pub mod db;
pub mod scope;
pub mod utils;

// Re-export 公共类型
pub use crate::bitstore::{
    BitstreamStore, FileBitstreamStore, MemoryBitstreamStore, RetrieveError,
};
pub use crate::checker::{
    Action, ChecksumWorker, RunSummary, SelectionCriteria, SelectionFlags, VerificationAttempt,
};
pub use crate::core::Config;
pub use crate::db::{ChecksumStorage, MetadataRepository, StorageError};
pub use crate::utils::{CheckerError, CheckerResult};

// Re-export logger functions
pub use crate::utils::logger::{cleanup_old_logs, init_logger_with_file};

/// 设置运行环境
///
/// 1. 加载 `.env`
/// 2. 读取配置
/// 3. 创建数据库所在目录
/// 4. 初始化日志
pub fn setup_environment() -> anyhow::Result<Config> {
    dotenv::dotenv().ok();
    let config = Config::from_env();

    if let Some(parent) = config.database_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    init_logger_with_file(&config.log_level, config.log_json, config.log_dir.as_deref())?;
    Ok(config)
}
