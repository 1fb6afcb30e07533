//! 配置加载器实现
//!
//! 串联解析、规范化、合并和环境变量同步，并在构造成功后启动文件监控

use crate::config::env::{EnvSynchronizer, Environment, ProcessEnv, SyncReport};
use crate::config::normalizer::normalize;
use crate::config::parser::{ConfigProvider, ConfigSource};
use crate::config::store::{ConfigDiff, ConfigStore};
use crate::config::types::{ConfigMap, ConfigValue, LoaderOptions};
use crate::config::watcher::{ConfigWatcher, ModificationTracker, WatchState};
use crate::error::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// 默认探测的配置文件名，按顺序尝试
pub const DEFAULT_CONFIG_FILES: [&str; 3] = ["config.ini", "config.json", "config.js"];

/// 配置变更事件
#[derive(Debug, Clone)]
pub struct ConfigChangeEvent {
    /// 配置文件路径
    pub config_path: PathBuf,
    /// 本次变更的差异
    pub diffs: Vec<ConfigDiff>,
    /// 变更时间
    pub timestamp: DateTime<Utc>,
    /// 快照版本号
    pub version: u64,
}

/// 单次重载的结果
#[derive(Debug, Clone, PartialEq)]
pub struct ReloadOutcome {
    /// 重载后的快照版本号
    pub version: u64,
    /// 快照差异
    pub diffs: Vec<ConfigDiff>,
    /// 环境变量同步结果，未开启同步时为 `None`
    pub env_report: Option<SyncReport>,
}

/// 在当前目录探测默认配置文件
pub fn discover_config_file() -> PathBuf {
    discover_config_file_in(Path::new(""))
}

/// 在指定目录探测默认配置文件
///
/// 依次尝试 `config.ini`、`config.json`、`config.js`，都不存在时返回空路径，
/// 空路径会在后续格式识别时失败
pub fn discover_config_file_in(dir: &Path) -> PathBuf {
    DEFAULT_CONFIG_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.exists())
        .unwrap_or_default()
}

/// 加载器共享状态，监控任务持有其引用
struct LoaderState {
    options: LoaderOptions,
    store: ConfigStore,
    env_sync: EnvSynchronizer,
    env: Arc<dyn Environment>,
    event_sender: broadcast::Sender<ConfigChangeEvent>,
}

impl LoaderState {
    fn log(&self, message: &str) {
        if self.options.debug {
            debug!("[confwatch][DEBUG] {}", message);
        }
    }
}

/// 重载流水线：解析 → 规范化 → 合并 → 同步
struct ReloadPipeline {
    state: Arc<LoaderState>,
    source: ConfigSource,
    tracker: Mutex<ModificationTracker>,
    reload_lock: Mutex<()>,
}

impl ReloadPipeline {
    fn new(state: Arc<LoaderState>, source: ConfigSource) -> Self {
        let tracker = Mutex::new(ModificationTracker::new(source.path()));
        Self {
            state,
            source,
            tracker,
            reload_lock: Mutex::new(()),
        }
    }

    /// 执行一次完整重载，失败时快照保持不变
    fn reload(&self) -> Result<ReloadOutcome> {
        let _guard = self.reload_lock.lock();
        let state = &self.state;

        let parsed = self.source.load()?;
        let values = normalize(parsed);

        let diffs = state.store.merge(&values);
        let version = state.store.version();

        let env_report = if state.options.set_env {
            Some(state.env_sync.sync(&values, state.env.as_ref()))
        } else {
            None
        };

        if !diffs.is_empty() {
            state.log(&format!(
                "配置已更新，版本 {}，变更键: {:?}",
                version,
                diffs.iter().map(ConfigDiff::key).collect::<Vec<_>>()
            ));
            let event = ConfigChangeEvent {
                config_path: self.source.path().to_path_buf(),
                diffs: diffs.clone(),
                timestamp: Utc::now(),
                version,
            };
            // 没有订阅者时发送失败是正常情况
            let _ = state.event_sender.send(event);
        }

        Ok(ReloadOutcome {
            version,
            diffs,
            env_report,
        })
    }

    /// 检查一次修改时间，有变化时重载
    fn poll(&self) -> Option<Result<ReloadOutcome>> {
        let mut tracker = self.tracker.lock();
        if !tracker.check() {
            return None;
        }
        Some(self.reload())
    }

    /// 监控任务中的轮询，失败只记录日志
    fn poll_and_log(&self) {
        match self.poll() {
            Some(Ok(outcome)) => {
                if !outcome.diffs.is_empty() {
                    info!(
                        "配置重载成功: {}，版本: {}",
                        self.source.path().display(),
                        outcome.version
                    );
                }
            }
            Some(Err(e)) => {
                warn!(
                    "配置重载失败，保留上一次的配置: {}: {}",
                    self.source.path().display(),
                    e
                );
                self.state.log(&format!("重载失败: {e}"));
            }
            None => {}
        }
    }
}

/// 配置加载器构建器
pub struct ConfigLoaderBuilder {
    options: LoaderOptions,
    env: Arc<dyn Environment>,
    provider: Option<Arc<dyn ConfigProvider>>,
    base_dir: PathBuf,
    watch: bool,
}

impl Default for ConfigLoaderBuilder {
    fn default() -> Self {
        Self {
            options: LoaderOptions::default(),
            env: Arc::new(ProcessEnv),
            provider: None,
            base_dir: PathBuf::new(),
            watch: true,
        }
    }
}

impl ConfigLoaderBuilder {
    /// 设置加载器选项
    pub fn options(mut self, options: LoaderOptions) -> Self {
        self.options = options;
        self
    }

    /// 设置环境变量实现，默认为进程环境变量
    pub fn environment(mut self, env: Arc<dyn Environment>) -> Self {
        self.env = env;
        self
    }

    /// 注册 `.js` 模块配置的提供者
    pub fn provider(mut self, provider: Arc<dyn ConfigProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// 设置探测默认配置文件的目录，默认为当前目录
    pub fn base_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.base_dir = dir.as_ref().to_path_buf();
        self
    }

    /// 是否启动文件监控，默认启动
    pub fn watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    /// 构建加载器，失败时返回错误
    pub fn try_build(self) -> Result<ConfigLoader> {
        let (mut loader, provider, base_dir, watch) = self.prepare();
        loader.initialize(provider, &base_dir, watch)?;
        Ok(loader)
    }

    /// 构建加载器，不会失败
    ///
    /// 构造错误记录在 [`ConfigLoader::error`] 中，此时快照为空且没有启动监控
    pub fn build(self) -> ConfigLoader {
        let (mut loader, provider, base_dir, watch) = self.prepare();
        if let Err(e) = loader.initialize(provider, &base_dir, watch) {
            warn!("配置加载器初始化失败: {}", e);
            loader.error = Some(e.to_string());
        }
        loader
    }

    fn prepare(self) -> (ConfigLoader, Option<Arc<dyn ConfigProvider>>, PathBuf, bool) {
        let (event_sender, _) = broadcast::channel(32);
        let env_sync = EnvSynchronizer::new(
            self.options.overwrite_existing_env,
            self.options.debug,
        );
        let state = LoaderState {
            options: self.options,
            store: ConfigStore::new(),
            env_sync,
            env: self.env,
            event_sender,
        };
        let loader = ConfigLoader {
            state: Arc::new(state),
            pipeline: None,
            watcher: None,
            error: None,
        };
        (loader, self.provider, self.base_dir, self.watch)
    }
}

/// 配置加载器
pub struct ConfigLoader {
    state: Arc<LoaderState>,
    pipeline: Option<Arc<ReloadPipeline>>,
    watcher: Option<ConfigWatcher>,
    error: Option<String>,
}

impl ConfigLoader {
    /// 创建构建器
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder::default()
    }

    /// 使用选项创建加载器，不会失败
    ///
    /// # 参数
    /// * `options` - 加载器选项
    ///
    /// # 返回
    /// * `Self` - 加载器实例，构造错误通过 [`ConfigLoader::error`] 获取
    pub fn new(options: LoaderOptions) -> Self {
        Self::builder().options(options).build()
    }

    /// 使用选项创建加载器，失败时返回错误
    pub fn try_new(options: LoaderOptions) -> Result<Self> {
        Self::builder().options(options).try_build()
    }

    /// 初始化：校验间隔 → 确定文件 → 首次加载 → 启动监控
    fn initialize(
        &mut self,
        provider: Option<Arc<dyn ConfigProvider>>,
        base_dir: &Path,
        watch: bool,
    ) -> Result<()> {
        let interval = self.state.options.watch_interval()?;

        let path = match &self.state.options.filename {
            Some(filename) => filename.clone(),
            None => {
                let discovered = discover_config_file_in(base_dir);
                self.log(&format!("未指定配置文件，探测结果: {:?}", discovered));
                discovered
            }
        };

        let source = ConfigSource::resolve(&path, provider)?;
        let pipeline = Arc::new(ReloadPipeline::new(Arc::clone(&self.state), source));
        pipeline.reload()?;
        info!("成功加载配置文件: {}", path.display());

        if watch {
            let mut watcher = ConfigWatcher::new(&path, interval);
            let poller = Arc::clone(&pipeline);
            if let Err(e) = watcher.start(move || poller.poll_and_log()) {
                warn!("{}，配置将不会自动重载", e);
            }
            self.watcher = Some(watcher);
        }

        self.pipeline = Some(pipeline);
        Ok(())
    }

    /// 构造时的错误信息
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// 输出调试日志，仅在开启 `debug` 时生效
    pub fn log(&self, message: &str) {
        self.state.log(message);
    }

    /// 加载器选项
    pub fn options(&self) -> &LoaderOptions {
        &self.state.options
    }

    /// 实际使用的配置文件路径，构造失败时为 `None`
    pub fn config_path(&self) -> Option<&Path> {
        self.pipeline.as_ref().map(|p| p.source.path())
    }

    /// 获取配置值
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        self.state.store.get(key)
    }

    /// 获取字符串配置值
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(str::to_string))
    }

    /// 获取数值配置值
    pub fn get_number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.as_f64())
    }

    /// 获取布尔配置值
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    /// 是否包含指定键
    pub fn contains_key(&self, key: &str) -> bool {
        self.state.store.contains_key(key)
    }

    /// 所有键
    pub fn keys(&self) -> Vec<String> {
        self.state.store.keys()
    }

    /// 当前快照
    pub fn snapshot(&self) -> ConfigMap {
        self.state.store.snapshot()
    }

    /// 当前快照版本
    pub fn version(&self) -> u64 {
        self.state.store.version()
    }

    /// 将快照反序列化为类型化结构
    pub fn extract<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        self.state.store.extract()
    }

    /// 本加载器写入过的环境变量
    pub fn owned_env_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.state.env_sync.owned_keys().into_iter().collect();
        keys.sort();
        keys
    }

    /// 订阅配置变更事件
    pub fn subscribe(&self) -> broadcast::Receiver<ConfigChangeEvent> {
        self.state.event_sender.subscribe()
    }

    /// 立即重载配置，不检查修改时间
    pub fn reload(&self) -> Result<ReloadOutcome> {
        match &self.pipeline {
            Some(pipeline) => pipeline.reload(),
            None => Err(anyhow::anyhow!(
                "加载器未成功初始化: {}",
                self.error.as_deref().unwrap_or("未知错误")
            )
            .into()),
        }
    }

    /// 手动执行一次轮询
    ///
    /// # 返回
    /// * `None` - 修改时间未变化或加载器未初始化
    /// * `Some(Result<ReloadOutcome>)` - 检测到变化后的重载结果
    pub fn poll_once(&self) -> Option<Result<ReloadOutcome>> {
        self.pipeline.as_ref().and_then(|p| p.poll())
    }

    /// 监控状态
    pub fn watch_state(&self) -> WatchState {
        self.watcher
            .as_ref()
            .map_or(WatchState::Idle, ConfigWatcher::state)
    }

    /// 停止文件监控
    pub fn stop(&mut self) {
        if let Some(watcher) = self.watcher.as_mut() {
            watcher.stop();
        }
    }
}

impl std::fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("options", &self.state.options)
            .field("config_path", &self.config_path())
            .field("version", &self.version())
            .field("watch_state", &self.watch_state())
            .field("error", &self.error)
            .finish()
    }
}
