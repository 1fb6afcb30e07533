//! 配置管理模块
//!
//! 提供配置文件解析、值规范化、快照合并、环境变量同步和轮询热重载功能

pub mod env;
pub mod loader;
#[cfg(test)]
mod log_capture;
pub mod normalizer;
pub mod parser;
pub mod store;
pub mod types;
pub mod watcher;

// 重新导出主要类型
pub use env::{EnvSynchronizer, Environment, MemoryEnv, ProcessEnv, SyncReport};
pub use loader::{
    discover_config_file, discover_config_file_in, ConfigChangeEvent, ConfigLoader,
    ConfigLoaderBuilder, ReloadOutcome,
};
pub use parser::{ConfigFormat, ConfigProvider, ConfigSource, ParsedConfig};
pub use store::{ConfigDiff, ConfigStore};
pub use types::{ConfigMap, ConfigValue, LoaderOptions};
pub use watcher::{ConfigWatcher, ModificationTracker, WatchState};
