use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::model::{
    BacktestResult, DecisionLogEntry, EngineStatus, LiveState, MetricMap, RiskLevel,
    StressResult, ViewModel,
};
use crate::sync::reconciler::{reconcile, Sources};

/// 轮询循环
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollLoop {
    LiveState,
    DecisionLog,
}

impl PollLoop {
    pub fn name(&self) -> &'static str {
        match self {
            PollLoop::LiveState => "live_state",
            PollLoop::DecisionLog => "decision_log",
        }
    }
}

/// 各生产者发布的不可变更新
#[derive(Debug, Clone, PartialEq)]
pub enum SourceUpdate {
    LiveState { seq: u64, state: LiveState },
    DecisionLog { seq: u64, entries: Vec<DecisionLogEntry> },
    PollFailed { poll: PollLoop, seq: u64, error: String },
    PortfolioMetrics(MetricMap),
    Backtest(BacktestResult),
    Stress(StressResult),
    EngineStatus(EngineStatus),
    SelectedRiskLevel(RiskLevel),
    FundsDelta(f64),
}

#[derive(Debug, Default)]
struct StoreInner {
    sources: Sources,
    /// 每个轮询循环已见过的最大序号
    state_seq: u64,
    log_seq: u64,
    /// 每个轮询循环已发出的最大序号
    state_issued: u64,
    log_issued: u64,
    /// 资金变动确认时已发出的实时状态序号，之后发出的快照才包含该变动
    funds_mark: u64,
    /// start/stop 确认时已发出的实时状态序号
    engine_status_mark: u64,
    version: u64,
}

impl StoreInner {
    fn seen_seq(&mut self, poll: PollLoop) -> &mut u64 {
        match poll {
            PollLoop::LiveState => &mut self.state_seq,
            PollLoop::DecisionLog => &mut self.log_seq,
        }
    }

    fn issue_seq(&mut self, poll: PollLoop) -> u64 {
        let issued = match poll {
            PollLoop::LiveState => &mut self.state_issued,
            PollLoop::DecisionLog => &mut self.log_issued,
        };
        *issued += 1;
        *issued
    }

    /// 只接受比已见序号更大的响应，不依赖完成顺序
    fn accept_seq(&mut self, poll: PollLoop, seq: u64) -> bool {
        let seen = self.seen_seq(poll);
        if seq <= *seen {
            return false;
        }
        *seen = seq;
        true
    }

    fn apply(&mut self, update: SourceUpdate) -> bool {
        match update {
            SourceUpdate::LiveState { seq, state } => {
                if !self.accept_seq(PollLoop::LiveState, seq) {
                    return false;
                }
                if seq > self.funds_mark {
                    self.sources.funds_delta = 0.0;
                }
                // 确认之后发出的轮询与本地标签一致时，交还给实时快照
                if seq > self.engine_status_mark
                    && self.sources.engine_status == Some(EngineStatus::from_running(state.running))
                {
                    self.sources.engine_status = None;
                }
                self.sources.live = Some(state);
                self.sources.state_error = None;
            }
            SourceUpdate::DecisionLog { seq, entries } => {
                if !self.accept_seq(PollLoop::DecisionLog, seq) {
                    return false;
                }
                self.sources.decision_log = entries;
                self.sources.log_error = None;
            }
            SourceUpdate::PollFailed { poll, seq, error } => {
                if !self.accept_seq(poll, seq) {
                    return false;
                }
                match poll {
                    PollLoop::LiveState => self.sources.state_error = Some(error),
                    PollLoop::DecisionLog => self.sources.log_error = Some(error),
                }
            }
            SourceUpdate::PortfolioMetrics(metrics) => {
                self.sources
                    .backtest
                    .get_or_insert_with(BacktestResult::default)
                    .metrics_with_risk = Some(metrics);
            }
            SourceUpdate::Backtest(result) => self.sources.backtest = Some(result),
            SourceUpdate::Stress(result) => self.sources.stress = Some(result),
            SourceUpdate::EngineStatus(status) => {
                self.sources.engine_status = Some(status);
                self.engine_status_mark = self.state_issued;
            }
            SourceUpdate::SelectedRiskLevel(level) => self.sources.selected_risk_level = level,
            SourceUpdate::FundsDelta(delta) => {
                self.sources.funds_delta += delta;
                self.funds_mark = self.state_issued;
            }
        }
        true
    }
}

/// 事件驱动的视图存储：串行应用更新，每次都整体替换发布的 ViewModel
#[derive(Clone)]
pub struct ViewStore {
    inner: Arc<Mutex<StoreInner>>,
    sender: Arc<watch::Sender<Arc<ViewModel>>>,
}

impl Default for ViewStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewStore {
    pub fn new() -> Self {
        let inner = StoreInner::default();
        let initial = Arc::new(reconcile(&inner.sources, inner.version));
        let (sender, _) = watch::channel(initial);
        Self {
            inner: Arc::new(Mutex::new(inner)),
            sender: Arc::new(sender),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 应用一条更新；过期的轮询响应被丢弃并返回 false
    pub fn publish(&self, update: SourceUpdate) -> bool {
        let mut inner = self.lock();
        let label = update_label(&update);
        if !inner.apply(update) {
            warn!("丢弃过期的轮询响应: {}", label);
            return false;
        }
        inner.version += 1;
        let view = Arc::new(reconcile(&inner.sources, inner.version));
        // 在锁内发送，保证版本号与发布顺序一致
        self.sender.send_replace(view);
        debug!("视图已更新: version={} source={}", inner.version, label);
        true
    }

    /// 为轮询循环的一次 tick 领取序号
    pub fn issue_seq(&self, poll: PollLoop) -> u64 {
        self.lock().issue_seq(poll)
    }

    /// 当前视图的只读快照
    pub fn snapshot(&self) -> Arc<ViewModel> {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ViewModel>> {
        self.sender.subscribe()
    }

    pub fn selected_risk_level(&self) -> RiskLevel {
        self.lock().sources.selected_risk_level
    }
}

fn update_label(update: &SourceUpdate) -> String {
    match update {
        SourceUpdate::LiveState { seq, .. } => format!("live_state#{}", seq),
        SourceUpdate::DecisionLog { seq, .. } => format!("decision_log#{}", seq),
        SourceUpdate::PollFailed { poll, seq, .. } => format!("{}#{} (failed)", poll.name(), seq),
        SourceUpdate::PortfolioMetrics(_) => "portfolio_metrics".to_string(),
        SourceUpdate::Backtest(_) => "backtest".to_string(),
        SourceUpdate::Stress(_) => "stress".to_string(),
        SourceUpdate::EngineStatus(s) => format!("engine_status={}", s),
        SourceUpdate::SelectedRiskLevel(l) => format!("selected_risk_level={}", l),
        SourceUpdate::FundsDelta(d) => format!("funds_delta={}", d),
    }
}
