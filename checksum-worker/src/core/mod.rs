//! 核心模块 - 进程配置

pub mod config;

pub use config::Config;
