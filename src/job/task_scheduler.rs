use std::collections::HashMap;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::debug;

use crate::app_config::settings::MIN_INTERVAL_MS;
use crate::error::{AppError, AppResult};

/// 周期任务调度器：所有任务共享一个关闭信号，shutdown 时一起取消
pub struct TaskScheduler {
    periodic_tasks: HashMap<String, JoinHandle<()>>,
    shutdown_sender: broadcast::Sender<()>,
}

impl TaskScheduler {
    pub fn new() -> Self {
        let (shutdown_sender, _) = broadcast::channel(16);
        Self {
            periodic_tasks: HashMap::new(),
            shutdown_sender,
        }
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskScheduler {
    /// 注册周期任务，首次 tick 立即触发；同名任务会先被取消
    pub fn add_periodic_task<F, Fut>(
        &mut self,
        name: &str,
        every: Duration,
        task_fn: F,
    ) -> AppResult<()>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        if every < Duration::from_millis(MIN_INTERVAL_MS) {
            return Err(AppError::Config(format!(
                "minimum interval is {}ms, task {} asked for {:?}",
                MIN_INTERVAL_MS, name, every
            )));
        }

        if let Some(previous) = self.periodic_tasks.remove(name) {
            previous.abort();
        }

        let mut interval_timer = interval(every);
        interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut shutdown_receiver = self.shutdown_sender.subscribe();
        let task_name = name.to_string();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        task_fn().await;
                    }
                    _ = shutdown_receiver.recv() => {
                        debug!("周期任务 {} 已停止", task_name);
                        break;
                    }
                }
            }
        });
        self.periodic_tasks.insert(name.to_string(), handle);
        Ok(())
    }

    pub fn task_count(&self) -> usize {
        self.periodic_tasks.len()
    }

    pub async fn shutdown(mut self) {
        // 发送关闭信号
        let _ = self.shutdown_sender.send(());

        // 等待所有任务退出
        for handle in std::mem::take(&mut self.periodic_tasks).into_values() {
            let _ = handle.await;
        }
    }
}

/// 未调用 shutdown 就被丢弃时，直接取消剩余任务，不留下定时器
impl Drop for TaskScheduler {
    fn drop(&mut self) {
        for handle in self.periodic_tasks.values() {
            handle.abort();
        }
    }
}
