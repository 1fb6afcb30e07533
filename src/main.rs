//! confwatch 主程序入口
//!
//! 预处理 `config_option_<key>=<value>` 参数后执行子命令

use anyhow::{Context, Result};
use clap::Parser;
use confwatch::cli::{command_for, scan_os_args, Args};
use confwatch::config::LoaderOptions;
use confwatch::logging::LoggingSystem;
use tracing::{debug, error};

#[tokio::main]
async fn main() -> Result<()> {
    // 先提取选项参数，其余交给clap解析
    let scanned = scan_os_args(std::env::args_os());
    let args = Args::parse_from(&scanned.remaining);
    let option_count = scanned.options.len();
    let options = args.apply_overrides(LoaderOptions::from_pairs(scanned.options));

    // 初始化日志系统
    LoggingSystem::setup_logging(args.log_config(&options)).context("初始化日志系统失败")?;
    debug!("从启动参数中提取到 {} 个加载器选项", option_count);

    // 执行命令
    let exit_code = match command_for(&args.command).execute(&args, &options).await {
        Ok(code) => code,
        Err(e) => {
            error!("命令执行失败: {:#}", e);
            1
        }
    };

    std::process::exit(exit_code);
}
