//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use crate::config::LoaderOptions;
use crate::logging::LogConfig;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// confwatch - 运行时配置加载器
#[derive(Parser, Debug, Clone)]
#[command(
    name = "confwatch",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置文件路径
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "配置文件路径（ini / json / js）",
        env = "CONFWATCH_CONFIG"
    )]
    pub config: Option<PathBuf>,

    /// 不同步环境变量
    #[arg(long, help = "不把配置写入环境变量")]
    pub no_env: bool,

    /// 覆盖已存在的环境变量
    #[arg(long, help = "覆盖已存在的环境变量")]
    pub overwrite_env: bool,

    /// 轮询间隔（毫秒）
    #[arg(
        long,
        value_name = "MS",
        allow_negative_numbers = true,
        help = "配置文件轮询间隔（毫秒）"
    )]
    pub interval_ms: Option<i64>,

    /// 输出加载器调试日志
    #[arg(long, help = "输出加载器调试日志")]
    pub debug: bool,

    /// 日志级别
    #[arg(
        short,
        long,
        value_enum,
        default_value = "info",
        help = "日志级别",
        env = "CONFWATCH_LOG_LEVEL"
    )]
    pub log_level: LogLevel,

    /// 使用JSON格式输出日志
    #[arg(long, help = "使用JSON格式输出日志")]
    pub json_logs: bool,

    /// 子命令
    #[command(subcommand)]
    pub command: Commands,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum LogLevel {
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

/// 输出格式
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum OutputFormat {
    /// JSON对象
    Json,
    /// `KEY=value` 逐行输出
    Env,
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 加载配置后运行子进程
    Run {
        /// 要运行的命令及其参数
        #[arg(
            required = true,
            trailing_var_arg = true,
            allow_hyphen_values = true,
            value_name = "COMMAND"
        )]
        command: Vec<String>,
    },

    /// 加载配置并输出快照
    Print {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// 加载配置并持续监控变化
    Watch,

    /// 显示版本信息
    Version,
}

impl Args {
    /// 用命令行显式参数覆盖预处理得到的选项
    pub fn apply_overrides(&self, mut options: LoaderOptions) -> LoaderOptions {
        if let Some(ref config) = self.config {
            options.filename = Some(config.clone());
        }
        if self.no_env {
            options.set_env = false;
        }
        if self.overwrite_env {
            options.overwrite_existing_env = true;
        }
        if let Some(interval_ms) = self.interval_ms {
            options.watch_interval_ms = interval_ms;
        }
        if self.debug {
            options.debug = true;
        }
        options
    }

    /// 根据参数和最终选项构建日志配置
    ///
    /// 加载器开启 `debug` 时，本crate的调试日志不受全局级别限制
    pub fn log_config(&self, options: &LoaderOptions) -> LogConfig {
        let mut config = LogConfig {
            level: self.log_level.clone().into(),
            json_format: self.json_logs,
            ..Default::default()
        };
        if options.debug && config.level < log::LevelFilter::Debug {
            config
                .module_levels
                .insert(env!("CARGO_CRATE_NAME").to_string(), log::LevelFilter::Debug);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_trailing_args() {
        let args = Args::parse_from(["confwatch", "--no-env", "run", "--", "node", "app.js", "-v"]);

        assert!(args.no_env);
        match args.command {
            Commands::Run { command } => assert_eq!(command, vec!["node", "app.js", "-v"]),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_overrides_take_precedence() {
        let args = Args::parse_from([
            "confwatch",
            "--config",
            "override.json",
            "--interval-ms",
            "250",
            "--overwrite-env",
            "print",
        ]);

        let scraped = LoaderOptions::from_pairs([("filename", "scraped.ini"), ("debug", "true")]);
        let options = args.apply_overrides(scraped);

        assert_eq!(options.filename, Some(PathBuf::from("override.json")));
        assert_eq!(options.watch_interval_ms, 250);
        assert!(options.overwrite_existing_env);
        assert!(options.debug);
        assert!(options.set_env);
    }

    #[test]
    fn test_debug_option_raises_crate_log_level() {
        let args = Args::parse_from(["confwatch", "print"]);
        let scraped = LoaderOptions::from_pairs([("debug", "true")]);
        let options = args.apply_overrides(scraped);

        let config = args.log_config(&options);
        assert_eq!(config.level, log::LevelFilter::Info);
        assert_eq!(
            config.module_levels.get("confwatch"),
            Some(&log::LevelFilter::Debug)
        );

        let quiet = args.log_config(&LoaderOptions::default());
        assert!(quiet.module_levels.is_empty());
    }

    #[test]
    fn test_debug_flag_with_explicit_log_level() {
        let args = Args::parse_from(["confwatch", "--debug", "--log-level", "debug", "print"]);
        let options = args.apply_overrides(LoaderOptions::default());

        let config = args.log_config(&options);
        assert_eq!(config.level, log::LevelFilter::Debug);
        assert!(config.module_levels.is_empty());
    }

    #[test]
    fn test_print_format_default() {
        let args = Args::parse_from(["confwatch", "print"]);
        assert!(matches!(
            args.command,
            Commands::Print {
                format: OutputFormat::Json
            }
        ));
    }
}
