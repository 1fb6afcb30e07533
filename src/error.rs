//! 错误处理模块
//!
//! 定义配置加载器的统一错误类型

use std::path::PathBuf;
use thiserror::Error;

/// 配置加载器的主要错误类型
#[derive(Error, Debug)]
pub enum ConfigLoaderError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 解析相关错误
    #[error("解析错误: {0}")]
    Parse(#[from] ParseError),

    /// IO错误
    #[error("IO错误 {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// 不支持的文件类型
    #[error("unsupported file type: {path:?}, expected one of ini / json / js")]
    UnsupportedFileType { path: String },

    /// 轮询间隔无效
    #[error("watchIntervalMs must be a positive number, got {0}")]
    InvalidInterval(i64),
}

/// 解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// JSON解析失败
    #[error("JSON解析失败: {0}")]
    Json(String),

    /// 顶层不是对象
    #[error("配置内容不是键值对象")]
    NotAnObject,

    /// 模块文件不存在
    #[error("模块文件不存在: {path}")]
    ModuleNotFound { path: String },

    /// 模块没有注册提供者
    #[error("模块没有注册配置提供者: {path}")]
    NoProvider { path: String },

    /// 提供者返回错误
    #[error("配置提供者失败: {0}")]
    Provider(String),
}

impl ConfigLoaderError {
    /// 构造带路径的IO错误
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, ConfigLoaderError>;
