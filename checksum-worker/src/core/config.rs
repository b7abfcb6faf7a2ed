use std::path::PathBuf;

/// Default number of status records fetched per scan page
pub const DEFAULT_SCAN_PAGE_SIZE: usize = 100;

/// Upper bound for `SCAN_PAGE_SIZE`; larger values are clamped
pub const MAX_SCAN_PAGE_SIZE: usize = 10_000;

/// 校验器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量 (或 `.env` 文件) 覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/checksum-worker | 工作目录 |
/// | DATABASE_PATH | $WORK_DIR/checksum.redb | 元数据库文件 |
/// | ASSETSTORE_DIR | $WORK_DIR/assetstore | 位流存储根目录 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_JSON | false | JSON 格式日志 |
/// | LOG_DIR | (未设置) | 文件日志目录 |
/// | SCAN_PAGE_SIZE | 100 | 每页读取的状态记录数 (1..=10000) |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/checker LOG_DIR=/data/checker/logs checksum-worker -l -c 500
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// redb 数据库文件路径
    pub database_path: PathBuf,
    /// 位流文件存储根目录
    pub assetstore_dir: PathBuf,
    pub log_level: String,
    pub log_json: bool,
    /// 文件日志目录，未设置时只输出到控制台
    pub log_dir: Option<PathBuf>,
    pub scan_page_size: usize,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        let work_dir = PathBuf::from(
            std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/checksum-worker".into()),
        );

        Self {
            database_path: std::env::var("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| work_dir.join("checksum.redb")),
            assetstore_dir: std::env::var("ASSETSTORE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| work_dir.join("assetstore")),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_dir: std::env::var("LOG_DIR").ok().map(PathBuf::from),
            scan_page_size: parse_scan_page_size(std::env::var("SCAN_PAGE_SIZE").ok().as_deref()),
        }
    }

    /// 以指定工作目录构建配置，派生路径全部位于其下
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        Self {
            database_path: work_dir.join("checksum.redb"),
            assetstore_dir: work_dir.join("assetstore"),
            log_level: "info".into(),
            log_json: false,
            log_dir: None,
            scan_page_size: DEFAULT_SCAN_PAGE_SIZE,
        }
    }
}

/// 解析页大小：无效或为 0 时用默认值，过大时截断
fn parse_scan_page_size(raw: Option<&str>) -> usize {
    match raw.and_then(|v| v.trim().parse::<usize>().ok()) {
        Some(0) | None => DEFAULT_SCAN_PAGE_SIZE,
        Some(size) => size.min(MAX_SCAN_PAGE_SIZE),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
