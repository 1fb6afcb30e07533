//! 配置快照存储
//!
//! 持有当前生效的键值快照，重载时按键合并，旧键不会被删除

use crate::config::types::{ConfigMap, ConfigValue};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;

/// 配置差异类型
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigDiff {
    /// 新增键
    Added { key: String, value: ConfigValue },
    /// 修改键
    Modified {
        key: String,
        old: ConfigValue,
        new: ConfigValue,
    },
}

impl ConfigDiff {
    /// 差异对应的键
    pub fn key(&self) -> &str {
        match self {
            ConfigDiff::Added { key, .. } | ConfigDiff::Modified { key, .. } => key,
        }
    }
}

#[derive(Debug, Default)]
struct Snapshot {
    values: ConfigMap,
    version: u64,
}

/// 配置存储
#[derive(Debug, Default)]
pub struct ConfigStore {
    snapshot: RwLock<Snapshot>,
}

impl ConfigStore {
    /// 创建空的配置存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 合并新的键值
    ///
    /// 只覆盖新映射中出现的键，快照中已有但新映射缺失的键保留。
    /// 有实际变化时版本号加一。
    ///
    /// # 返回
    /// * `Vec<ConfigDiff>` - 本次合并产生的差异
    pub fn merge(&self, values: &ConfigMap) -> Vec<ConfigDiff> {
        let mut snapshot = self.snapshot.write();
        let mut diffs = Vec::new();

        for (key, value) in values {
            match snapshot.values.insert(key.clone(), value.clone()) {
                None => diffs.push(ConfigDiff::Added {
                    key: key.clone(),
                    value: value.clone(),
                }),
                Some(old) if old != *value => diffs.push(ConfigDiff::Modified {
                    key: key.clone(),
                    old,
                    new: value.clone(),
                }),
                Some(_) => {}
            }
        }

        if !diffs.is_empty() {
            snapshot.version += 1;
        }

        diffs
    }

    /// 获取单个配置值
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        self.snapshot.read().values.get(key).cloned()
    }

    /// 是否包含指定键
    pub fn contains_key(&self, key: &str) -> bool {
        self.snapshot.read().values.contains_key(key)
    }

    /// 所有键
    pub fn keys(&self) -> Vec<String> {
        self.snapshot.read().values.keys().cloned().collect()
    }

    /// 当前快照的副本
    pub fn snapshot(&self) -> ConfigMap {
        self.snapshot.read().values.clone()
    }

    /// 当前快照版本，初始为0
    pub fn version(&self) -> u64 {
        self.snapshot.read().version
    }

    /// 快照是否为空
    pub fn is_empty(&self) -> bool {
        self.snapshot.read().values.is_empty()
    }

    /// 将快照反序列化为类型化结构
    pub fn extract<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        let object: serde_json::Map<String, serde_json::Value> = self
            .snapshot
            .read()
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        serde_json::from_value(serde_json::Value::Object(object))
    }
}
