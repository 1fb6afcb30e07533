//! confwatch - 运行时配置加载器
//!
//! 这是一个用Rust编写的运行时配置加载器，支持：
//! - INI / JSON / 代码提供者三种配置来源
//! - 数值转换与引号去除
//! - 按优先级同步到环境变量
//! - 基于修改时间轮询的配置热重载
//! - 结构化日志记录

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;

// 重新导出主要类型
pub use config::{ConfigLoader, ConfigValue, LoaderOptions};
pub use error::ConfigLoaderError;

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
