//! 环境变量同步
//!
//! 按优先级规则把配置快照写入环境变量，不覆盖外部设置的变量，
//! 但允许刷新本加载器之前写入的变量

use crate::config::types::ConfigMap;
use crate::error::Result;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// 环境变量访问接口
pub trait Environment: Send + Sync {
    /// 读取环境变量，不存在时返回 `None`
    fn get(&self, key: &str) -> Option<String>;

    /// 写入环境变量
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// 环境变量是否存在
    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// 进程环境变量
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var_os(key).map(|v| v.to_string_lossy().into_owned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        // std::env::set_var 对这些输入会panic
        if key.is_empty() || key.contains('=') || key.contains('\0') {
            return Err(anyhow::anyhow!("无效的环境变量名: {:?}", key).into());
        }
        if value.contains('\0') {
            return Err(anyhow::anyhow!("环境变量 {} 的值包含NUL字符", key).into());
        }
        std::env::set_var(key, value);
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        std::env::var_os(key).is_some()
    }
}

/// 内存中的环境变量表
#[derive(Debug, Default)]
pub struct MemoryEnv {
    vars: Mutex<HashMap<String, String>>,
}

impl MemoryEnv {
    /// 创建空的环境变量表
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用初始变量创建
    pub fn with_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: Mutex::new(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// 当前所有变量的副本
    pub fn vars(&self) -> HashMap<String, String> {
        self.vars.lock().clone()
    }
}

impl Environment for MemoryEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.vars.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// 单次同步的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// 已写入的键
    pub written: Vec<String>,
    /// 因已存在且不属于本加载器而跳过的键
    pub skipped: Vec<String>,
    /// 写入失败的键
    pub failed: Vec<String>,
}

/// 环境变量同步器
#[derive(Debug)]
pub struct EnvSynchronizer {
    /// 是否覆盖已存在的环境变量
    overwrite_existing: bool,
    /// 是否输出调试日志
    debug: bool,
    /// 本加载器写入过的键，只增不减
    owned_keys: Mutex<HashSet<String>>,
}

impl EnvSynchronizer {
    /// 创建同步器
    pub fn new(overwrite_existing: bool, debug: bool) -> Self {
        Self {
            overwrite_existing,
            debug,
            owned_keys: Mutex::new(HashSet::new()),
        }
    }

    /// 将配置写入环境变量
    ///
    /// 写入规则：
    /// * 开启覆盖时总是写入
    /// * 变量不存在时写入
    /// * 变量存在但由本加载器写入时刷新
    /// * 其余情况跳过
    ///
    /// 每次写入都会把键记为本加载器所有
    pub fn sync(&self, values: &ConfigMap, env: &dyn Environment) -> SyncReport {
        let mut report = SyncReport::default();
        let mut owned = self.owned_keys.lock();

        for (key, value) in values {
            let writable =
                self.overwrite_existing || !env.contains(key) || owned.contains(key.as_str());

            if !writable {
                if self.debug {
                    debug!(
                        "\"{}\" 已存在于环境变量中，不会被覆盖",
                        key
                    );
                }
                report.skipped.push(key.clone());
                continue;
            }

            match env.set(key, &value.to_env_string()) {
                Ok(()) => {
                    owned.insert(key.clone());
                    report.written.push(key.clone());
                }
                Err(e) => {
                    warn!("写入环境变量失败 {}: {}", key, e);
                    report.failed.push(key.clone());
                }
            }
        }

        report
    }

    /// 是否为本加载器写入的键
    pub fn owns(&self, key: &str) -> bool {
        self.owned_keys.lock().contains(key)
    }

    /// 本加载器写入过的所有键
    pub fn owned_keys(&self) -> HashSet<String> {
        self.owned_keys.lock().clone()
    }
}
