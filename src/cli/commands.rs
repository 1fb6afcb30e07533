//! 命令处理逻辑
//!
//! 实现各个CLI子命令

use crate::cli::args::{Args, Commands, OutputFormat};
use crate::config::{ConfigChangeEvent, ConfigDiff, ConfigLoader, ConfigMap, LoaderOptions};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    ///
    /// # 参数
    /// * `args` - 命令行参数
    /// * `options` - 合并后的加载器选项
    ///
    /// # 返回
    /// * `Result<i32>` - 进程退出码
    async fn execute(&self, args: &Args, options: &LoaderOptions) -> Result<i32>;
}

/// 根据子命令选择处理器
pub fn command_for(command: &Commands) -> Box<dyn Command> {
    match command {
        Commands::Run { .. } => Box::new(RunCommand),
        Commands::Print { .. } => Box::new(PrintCommand),
        Commands::Watch => Box::new(WatchCommand),
        Commands::Version => Box::new(VersionCommand),
    }
}

/// 运行命令：加载配置后启动子进程
pub struct RunCommand;

#[async_trait]
impl Command for RunCommand {
    async fn execute(&self, args: &Args, options: &LoaderOptions) -> Result<i32> {
        let Commands::Run { command } = &args.command else {
            anyhow::bail!("run 命令收到了不匹配的子命令: {:?}", args.command);
        };
        let (program, program_args) = command
            .split_first()
            .context("没有指定要运行的命令")?;

        // 加载失败不影响子进程启动
        let mut loader = ConfigLoader::new(options.clone());
        if let Some(e) = loader.error() {
            warn!("配置加载失败，子进程将使用当前环境运行: {}", e);
        }

        info!("启动子进程: {} {:?}", program, program_args);
        let status = tokio::process::Command::new(program)
            .args(program_args)
            .status()
            .await
            .with_context(|| format!("启动子进程失败: {}", program))?;

        loader.stop();

        match status.code() {
            Some(code) => Ok(code),
            None => {
                warn!("子进程被信号终止");
                Ok(1)
            }
        }
    }
}

/// 输出命令：加载配置并打印快照
pub struct PrintCommand;

impl PrintCommand {
    fn render(snapshot: &ConfigMap, format: &OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => {
                let object: serde_json::Map<String, serde_json::Value> = snapshot
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect();
                Ok(serde_json::to_string_pretty(&object)?)
            }
            OutputFormat::Env => Ok(snapshot
                .iter()
                .map(|(k, v)| format!("{}={}", k, v.to_env_string()))
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }
}

#[async_trait]
impl Command for PrintCommand {
    async fn execute(&self, args: &Args, options: &LoaderOptions) -> Result<i32> {
        let Commands::Print { format } = &args.command else {
            anyhow::bail!("print 命令收到了不匹配的子命令: {:?}", args.command);
        };

        let loader = ConfigLoader::builder()
            .options(options.clone())
            .watch(false)
            .try_build()
            .context("加载配置失败")?;

        println!("{}", Self::render(&loader.snapshot(), format)?);
        Ok(0)
    }
}

/// 监控命令：持续输出配置变化直到收到中断信号
pub struct WatchCommand;

impl WatchCommand {
    fn log_change(event: &ConfigChangeEvent) {
        info!(
            "配置变更: {} 版本 {} ({})",
            event.config_path.display(),
            event.version,
            event.timestamp.to_rfc3339()
        );
        for diff in &event.diffs {
            match diff {
                ConfigDiff::Added { key, value } => info!("  + {} = {}", key, value),
                ConfigDiff::Modified { key, old, new } => {
                    info!("  ~ {}: {} -> {}", key, old, new)
                }
            }
        }
    }
}

#[async_trait]
impl Command for WatchCommand {
    async fn execute(&self, _args: &Args, options: &LoaderOptions) -> Result<i32> {
        let mut loader = ConfigLoader::try_new(options.clone()).context("加载配置失败")?;
        let mut receiver = loader.subscribe();

        info!(
            "正在监控 {}，按 Ctrl+C 退出",
            loader
                .config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        );

        loop {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        error!("监听中断信号失败: {}", e);
                    }
                    info!("收到中断信号，停止监控");
                    break;
                }
                event = receiver.recv() => match event {
                    Ok(event) => Self::log_change(&event),
                    Err(RecvError::Lagged(skipped)) => warn!("跳过了 {} 个配置变更事件", skipped),
                    Err(RecvError::Closed) => break,
                },
            }
        }

        loader.stop();
        Ok(0)
    }
}

/// 版本命令
pub struct VersionCommand;

#[async_trait]
impl Command for VersionCommand {
    async fn execute(&self, _args: &Args, _options: &LoaderOptions) -> Result<i32> {
        println!("{} v{}", crate::APP_NAME, crate::VERSION);
        println!("{}", crate::APP_DESCRIPTION);
        Ok(0)
    }
}
