//! 命令行接口模块
//!
//! 提供启动参数预处理、CLI参数解析和命令处理功能

pub mod args;
pub mod commands;
pub mod preload;

// 重新导出主要类型
pub use args::Args;
pub use commands::{command_for, Command};
pub use preload::{scan_config_options, scan_os_args, ScannedArgs};
