//! 配置数据结构定义
//!
//! 定义配置值、配置快照以及加载器选项

use crate::error::{ConfigError, ParseError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// 默认轮询间隔（毫秒）
pub const DEFAULT_WATCH_INTERVAL_MS: i64 = 5000;

/// 单个配置值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// 布尔值（仅来自JSON或提供者）
    Bool(bool),
    /// 数值
    Number(f64),
    /// 字符串
    String(String),
    /// 空值
    Null,
    /// 原样透传的非标量JSON值
    Raw(serde_json::Value),
}

impl ConfigValue {
    /// 获取字符串内容
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// 获取数值内容
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// 获取布尔内容
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// 转换为JSON值
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ConfigValue::Bool(b) => serde_json::Value::Bool(*b),
            // 整数值保持整数形式，便于反序列化为整型字段
            ConfigValue::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => {
                serde_json::Value::from(*n as i64)
            }
            ConfigValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ConfigValue::String(s) => serde_json::Value::String(s.clone()),
            ConfigValue::Null => serde_json::Value::Null,
            ConfigValue::Raw(v) => v.clone(),
        }
    }

    /// 写入环境变量时使用的字符串形式
    pub fn to_env_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(b) => write!(f, "{b}"),
            ConfigValue::Number(n) => write!(f, "{n}"),
            ConfigValue::String(s) => f.write_str(s),
            ConfigValue::Null => f.write_str("null"),
            ConfigValue::Raw(v) => write!(f, "{v}"),
        }
    }
}

impl From<serde_json::Value> for ConfigValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Bool(b) => ConfigValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => ConfigValue::Number(f),
                None => ConfigValue::Raw(serde_json::Value::Number(n)),
            },
            serde_json::Value::String(s) => ConfigValue::String(s),
            serde_json::Value::Null => ConfigValue::Null,
            other => ConfigValue::Raw(other),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Number(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

/// 扁平的键值映射
pub type ConfigMap = BTreeMap<String, ConfigValue>;

/// 将JSON对象转换为扁平映射
///
/// 顶层不是对象时返回 [`ParseError::NotAnObject`]
pub fn config_map_from_json(value: serde_json::Value) -> Result<ConfigMap> {
    match value {
        serde_json::Value::Object(object) => Ok(object
            .into_iter()
            .map(|(k, v)| (k, ConfigValue::from(v)))
            .collect()),
        _ => Err(ParseError::NotAnObject.into()),
    }
}

/// 加载器选项，构造后不可变
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderOptions {
    /// 配置文件路径，为空时自动探测
    pub filename: Option<PathBuf>,
    /// 是否同步到环境变量
    pub set_env: bool,
    /// 是否覆盖已存在的环境变量
    pub overwrite_existing_env: bool,
    /// 是否输出调试日志
    pub debug: bool,
    /// 轮询间隔（毫秒）
    pub watch_interval_ms: i64,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            filename: None,
            set_env: true,
            overwrite_existing_env: false,
            debug: false,
            watch_interval_ms: DEFAULT_WATCH_INTERVAL_MS,
        }
    }
}

impl LoaderOptions {
    /// 从字符串键值对构建选项
    ///
    /// 用于命令行等只能提供字符串的场景，布尔与数值按以下规则转换：
    /// * `setEnv` 仅当值为 `"false"` 时关闭
    /// * `overwriteExistingEnv` / `debug` 仅当值为 `"true"` 时开启
    /// * `watchIntervalMs` 非数字时回退到默认值，小数向下取整
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut options = Self::default();
        for (key, value) in pairs {
            let key = key.as_ref();
            let value = value.as_ref();
            match key {
                "filename" => {
                    options.filename = if value.is_empty() {
                        None
                    } else {
                        Some(PathBuf::from(value))
                    };
                }
                "setEnv" | "set_env" => options.set_env = parse_set_env(value),
                "overwriteExistingEnv" | "overwrite_existing_env" => {
                    options.overwrite_existing_env = parse_enabled_flag(value)
                }
                "debug" => options.debug = parse_enabled_flag(value),
                "watchIntervalMs" | "watch_interval_ms" => {
                    options.watch_interval_ms = parse_interval_ms(value)
                }
                other => debug!("忽略未知的加载器选项: {}", other),
            }
        }
        options
    }

    /// 获取校验后的轮询间隔
    pub fn watch_interval(&self) -> Result<Duration> {
        if self.watch_interval_ms <= 0 {
            return Err(ConfigError::InvalidInterval(self.watch_interval_ms).into());
        }
        Ok(Duration::from_millis(self.watch_interval_ms as u64))
    }
}

/// `setEnv` 默认开启，只有字面量 `false` 关闭
pub fn parse_set_env(value: &str) -> bool {
    value != "false"
}

/// 默认关闭的开关，只有字面量 `true` 开启
pub fn parse_enabled_flag(value: &str) -> bool {
    value == "true"
}

/// 解析轮询间隔，非数字（含空串和非有限值）回退到默认值
pub fn parse_interval_ms(value: &str) -> i64 {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return DEFAULT_WATCH_INTERVAL_MS;
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => n.floor() as i64,
        _ => DEFAULT_WATCH_INTERVAL_MS,
    }
}
