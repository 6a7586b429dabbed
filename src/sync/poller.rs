//! 实时状态与决策日志的轮询
//!
//! 两个循环共用一个调度器，start/stop 一起生效。每次 tick 都从 ViewStore 领取该循环的递增序号，
//! 请求在独立任务里发出，响应是否生效由 ViewStore 按序号判断，不看完成顺序。
//! stop 之后仍在路上的响应会被直接丢弃。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::api::EngineApi;
use crate::app_config::ClientSettings;
use crate::error::AppResult;
use crate::job::TaskScheduler;
use crate::sync::store::{PollLoop, SourceUpdate, ViewStore};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollSettings {
    pub state_interval: Duration,
    pub log_interval: Duration,
    pub log_limit: usize,
}

impl From<&ClientSettings> for PollSettings {
    fn from(settings: &ClientSettings) -> Self {
        Self {
            state_interval: settings.state_poll_interval,
            log_interval: settings.log_poll_interval,
            log_limit: settings.decision_log_limit,
        }
    }
}

struct PollRun {
    scheduler: TaskScheduler,
    /// 本轮是否仍在观察，stop 后置为 false
    attached: Arc<AtomicBool>,
}

pub struct Poller {
    api: Arc<dyn EngineApi>,
    store: ViewStore,
    settings: PollSettings,
    run: Option<PollRun>,
}

impl Poller {
    pub fn new(api: Arc<dyn EngineApi>, store: ViewStore, settings: PollSettings) -> Self {
        Self {
            api,
            store,
            settings,
            run: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// 启动两个轮询循环；已在运行时不重复注册
    pub fn start(&mut self) -> AppResult<()> {
        if self.run.is_some() {
            debug!("轮询已在运行，忽略重复启动");
            return Ok(());
        }

        let attached = Arc::new(AtomicBool::new(true));
        let mut scheduler = TaskScheduler::new();

        {
            let api = Arc::clone(&self.api);
            let store = self.store.clone();
            let attached = Arc::clone(&attached);
            scheduler.add_periodic_task(
                PollLoop::LiveState.name(),
                self.settings.state_interval,
                move || {
                    let tick = store.issue_seq(PollLoop::LiveState);
                    let api = Arc::clone(&api);
                    let store = store.clone();
                    let attached = Arc::clone(&attached);
                    async move {
                        tokio::spawn(async move {
                            let update = match api.get_state().await {
                                Ok(state) => SourceUpdate::LiveState { seq: tick, state },
                                Err(e) => {
                                    warn!("轮询实时状态失败 #{}: {}", tick, e);
                                    SourceUpdate::PollFailed {
                                        poll: PollLoop::LiveState,
                                        seq: tick,
                                        error: e.user_message(),
                                    }
                                }
                            };
                            apply_if_attached(&store, &attached, update);
                        });
                    }
                },
            )?;
        }

        {
            let api = Arc::clone(&self.api);
            let store = self.store.clone();
            let attached = Arc::clone(&attached);
            let limit = self.settings.log_limit;
            scheduler.add_periodic_task(
                PollLoop::DecisionLog.name(),
                self.settings.log_interval,
                move || {
                    let tick = store.issue_seq(PollLoop::DecisionLog);
                    let api = Arc::clone(&api);
                    let store = store.clone();
                    let attached = Arc::clone(&attached);
                    async move {
                        tokio::spawn(async move {
                            let update = match api.get_engine_log(limit).await {
                                Ok(resp) => SourceUpdate::DecisionLog {
                                    seq: tick,
                                    entries: resp.newest_first(limit),
                                },
                                Err(e) => {
                                    warn!("轮询决策日志失败 #{}: {}", tick, e);
                                    SourceUpdate::PollFailed {
                                        poll: PollLoop::DecisionLog,
                                        seq: tick,
                                        error: e.user_message(),
                                    }
                                }
                            };
                            apply_if_attached(&store, &attached, update);
                        });
                    }
                },
            )?;
        }

        info!(
            "轮询已启动: {} 个循环, state={:?} log={:?} limit={}",
            scheduler.task_count(),
            self.settings.state_interval,
            self.settings.log_interval,
            self.settings.log_limit
        );
        self.run = Some(PollRun { scheduler, attached });
        Ok(())
    }

    /// 同时取消两个循环的定时器，之后到达的响应不再生效
    pub async fn stop(&mut self) {
        if let Some(run) = self.run.take() {
            run.attached.store(false, Ordering::SeqCst);
            run.scheduler.shutdown().await;
            info!("轮询已停止");
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(run) = &self.run {
            run.attached.store(false, Ordering::SeqCst);
        }
    }
}

fn apply_if_attached(store: &ViewStore, attached: &AtomicBool, update: SourceUpdate) {
    if !attached.load(Ordering::SeqCst) {
        debug!("观察者已分离，丢弃响应");
        return;
    }
    store.publish(update);
}
