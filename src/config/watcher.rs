//! 配置文件监控模块
//!
//! 按固定间隔轮询配置文件的修改时间，发现变化时触发重载

use crate::error::Result;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// 文件修改时间跟踪器
#[derive(Debug, Clone)]
pub struct ModificationTracker {
    /// 配置文件路径
    path: PathBuf,
    /// 上次观察到的修改时间，文件不存在时为 `None`
    last_seen: Option<SystemTime>,
}

impl ModificationTracker {
    /// 创建跟踪器并记录当前修改时间
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let last_seen = Self::modified(&path);
        Self { path, last_seen }
    }

    /// 读取文件修改时间
    fn modified(path: &Path) -> Option<SystemTime> {
        std::fs::metadata(path).and_then(|m| m.modified()).ok()
    }

    /// 检查修改时间是否变化
    ///
    /// 出现、消失或时间戳不同都视为变化，并更新记录的时间戳
    pub fn check(&mut self) -> bool {
        let current = Self::modified(&self.path);
        if current == self.last_seen {
            return false;
        }
        debug!(
            "检测到配置文件修改时间变化: {} ({:?} -> {:?})",
            self.path.display(),
            self.last_seen,
            current
        );
        self.last_seen = current;
        true
    }

    /// 上次观察到的修改时间
    pub fn last_seen(&self) -> Option<SystemTime> {
        self.last_seen
    }

    /// 被跟踪的路径
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// 监控器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// 未启动
    Idle,
    /// 定时轮询中
    Watching,
    /// 已停止
    Stopped,
}

/// 配置文件监控器
#[derive(Debug)]
pub struct ConfigWatcher {
    /// 配置文件路径
    config_path: PathBuf,
    /// 轮询间隔
    interval: Duration,
    /// 轮询任务句柄
    task: Option<JoinHandle<()>>,
    /// 当前状态
    state: WatchState,
}

impl ConfigWatcher {
    /// 创建未启动的监控器
    ///
    /// # 参数
    /// * `config_path` - 配置文件路径
    /// * `interval` - 轮询间隔
    pub fn new<P: AsRef<Path>>(config_path: P, interval: Duration) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            interval,
            task: None,
            state: WatchState::Idle,
        }
    }

    /// 在当前tokio运行时中启动轮询
    ///
    /// # 参数
    /// * `poll` - 每次定时触发时调用，由调用方判断文件是否变化并执行重载
    ///
    /// # 返回
    /// * `Result<()>` - 没有可用的tokio运行时时返回错误，监控器保持未启动
    pub fn start<F>(&mut self, poll: F) -> Result<()>
    where
        F: FnMut() + Send + 'static,
    {
        let handle = Handle::try_current()
            .map_err(|e| anyhow::anyhow!("没有可用的tokio运行时，无法启动配置监控: {}", e))?;
        self.start_on(&handle, poll);
        Ok(())
    }

    /// 在指定运行时中启动轮询
    pub fn start_on<F>(&mut self, handle: &Handle, mut poll: F)
    where
        F: FnMut() + Send + 'static,
    {
        if self.state != WatchState::Idle {
            debug!("配置监控已启动或已停止，忽略重复启动");
            return;
        }

        let interval = self.interval;
        let task = handle.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // 第一次tick立即返回，跳过它，构造时已经加载过一次
            ticker.tick().await;

            loop {
                ticker.tick().await;
                poll();
            }
        });

        self.task = Some(task);
        self.state = WatchState::Watching;
        info!(
            "启动配置文件监控: {} (间隔 {:?})",
            self.config_path.display(),
            self.interval
        );
    }

    /// 停止监控并释放定时任务
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("配置文件监控已停止: {}", self.config_path.display());
        }
        if self.state == WatchState::Watching {
            self.state = WatchState::Stopped;
        }
    }

    /// 当前状态
    pub fn state(&self) -> WatchState {
        self.state
    }

    /// 轮询间隔
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn bump_mtime(path: &Path, secs: u64) {
        let file = fs::OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    #[test]
    fn test_tracker_detects_changes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.ini");
        fs::write(&path, "A=1").unwrap();

        let mut tracker = ModificationTracker::new(&path);
        assert!(tracker.last_seen().is_some());
        assert!(!tracker.check());

        bump_mtime(&path, 1_000_000);
        assert!(tracker.check());
        assert!(!tracker.check());
    }

    #[test]
    fn test_tracker_detects_removal_and_recreation() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.ini");
        fs::write(&path, "A=1").unwrap();

        let mut tracker = ModificationTracker::new(&path);
        fs::remove_file(&path).unwrap();
        assert!(tracker.check());
        assert!(tracker.last_seen().is_none());
        assert!(!tracker.check());

        fs::write(&path, "A=2").unwrap();
        assert!(tracker.check());
    }

    #[test]
    fn test_start_without_runtime_fails() {
        let mut watcher = ConfigWatcher::new("config.ini", Duration::from_millis(10));
        assert!(watcher.start(|| {}).is_err());
        assert_eq!(watcher.state(), WatchState::Idle);
    }

    #[tokio::test]
    async fn test_watcher_ticks_until_stopped() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut watcher = ConfigWatcher::new("config.ini", Duration::from_millis(10));
        watcher
            .start(move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(watcher.state(), WatchState::Watching);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(counter.load(Ordering::SeqCst) > 0);

        watcher.stop();
        assert_eq!(watcher.state(), WatchState::Stopped);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let after_stop = counter.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(counter.load(Ordering::SeqCst), after_stop);
    }
}
