use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::api::EngineApi;
use crate::dispatcher::command::{CommandBoard, CommandKind, CommandLane, CommandStatus};
use crate::dispatcher::policy::{permits, UpdateTiming};
use crate::error::{AppError, AppResult};
use crate::model::{
    AddFundsRequest, BacktestAck, BacktestRequest, CardDetails, ControlAck, EngineStatus,
    FundsAck, RiskLevel, RiskLevelRequest, StressResult, StressTestRequest, WithdrawRequest,
};
use crate::sync::{refresh_backtest, SourceUpdate, ViewStore};

/// 资金金额的本地校验：必须是正的有限数
pub fn validate_amount(amount: f64) -> AppResult<f64> {
    if amount.is_finite() && amount > 0.0 {
        Ok(amount)
    } else {
        Err(AppError::Validation(format!(
            "amount must be a positive number, got {}",
            amount
        )))
    }
}

#[derive(Debug, Default)]
struct BoardState {
    board: CommandBoard,
    next_ticket: u64,
    /// 每个通道最近一次调用的票号
    latest: HashMap<CommandLane, u64>,
}

impl BoardState {
    fn begin(&mut self, kind: CommandKind) -> u64 {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let lane = kind.lane();
        self.latest.insert(lane, ticket);
        for member in lane.members() {
            self.board.set(member, CommandStatus::Idle);
        }
        self.board.set(kind, CommandStatus::Pending);
        ticket
    }

    /// 返回是否更新了面板
    fn finish(&mut self, kind: CommandKind, ticket: u64, outcome: CommandStatus) -> bool {
        let lane = kind.lane();
        let is_latest = self.latest.get(&lane).copied() == Some(ticket);
        // 被新调用取代的结果：新调用还在进行中就不动面板，否则以最后确认者为准
        if !is_latest && self.board.lane_has_pending(lane) {
            return false;
        }
        for member in lane.members() {
            self.board.set(member, CommandStatus::Idle);
        }
        self.board.set(kind, outcome);
        true
    }
}

/// 命令分发：每类命令独立的状态，互不阻塞；失败只返回给发起者，不自动重试
#[derive(Clone)]
pub struct CommandDispatcher {
    api: Arc<dyn EngineApi>,
    store: ViewStore,
    state: Arc<Mutex<BoardState>>,
    sender: Arc<watch::Sender<Arc<CommandBoard>>>,
}

impl CommandDispatcher {
    pub fn new(api: Arc<dyn EngineApi>, store: ViewStore) -> Self {
        let (sender, _) = watch::channel(Arc::new(CommandBoard::default()));
        Self {
            api,
            store,
            state: Arc::new(Mutex::new(BoardState::default())),
            sender: Arc::new(sender),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn board(&self) -> Arc<CommandBoard> {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<CommandBoard>> {
        self.sender.subscribe()
    }

    pub fn store(&self) -> &ViewStore {
        &self.store
    }

    fn begin(&self, kind: CommandKind) -> u64 {
        let mut state = self.lock();
        let ticket = state.begin(kind);
        self.sender.send_replace(Arc::new(state.board.clone()));
        ticket
    }

    fn finish(&self, kind: CommandKind, ticket: u64, outcome: CommandStatus) {
        let mut state = self.lock();
        if state.finish(kind, ticket, outcome) {
            self.sender.send_replace(Arc::new(state.board.clone()));
        } else {
            debug!("{} #{} 已被新的调用取代，不更新状态", kind, ticket);
        }
    }

    fn apply_optimistic(&self, kind: CommandKind, timing: UpdateTiming, update: &Option<SourceUpdate>) {
        if let Some(update) = update {
            if permits(kind, timing, update) {
                self.store.publish(update.clone());
            }
        }
    }

    /// 所有命令的统一流程：idle -> pending -> succeeded | failed
    async fn execute<T, Fut>(
        &self,
        kind: CommandKind,
        optimistic: Option<SourceUpdate>,
        request: Fut,
    ) -> AppResult<T>
    where
        Fut: Future<Output = AppResult<T>>,
    {
        let ticket = self.begin(kind);
        self.apply_optimistic(kind, UpdateTiming::BeforeAck, &optimistic);

        match request.await {
            Ok(ack) => {
                self.apply_optimistic(kind, UpdateTiming::AfterAck, &optimistic);
                self.finish(kind, ticket, CommandStatus::Succeeded);
                info!("命令 {} #{} 已确认", kind, ticket);
                Ok(ack)
            }
            Err(e) => {
                error!("命令 {} #{} 失败: {}", kind, ticket, e);
                self.finish(kind, ticket, CommandStatus::Failed(e.user_message()));
                Err(e)
            }
        }
    }

    pub async fn start(&self) -> AppResult<ControlAck> {
        let api = Arc::clone(&self.api);
        self.execute(
            CommandKind::Start,
            Some(SourceUpdate::EngineStatus(EngineStatus::Running)),
            async move { api.start().await },
        )
        .await
    }

    pub async fn stop(&self) -> AppResult<ControlAck> {
        let api = Arc::clone(&self.api);
        self.execute(
            CommandKind::Stop,
            Some(SourceUpdate::EngineStatus(EngineStatus::Stopped)),
            async move { api.stop().await },
        )
        .await
    }

    pub async fn rebalance(&self) -> AppResult<ControlAck> {
        let api = Arc::clone(&self.api);
        self.execute(CommandKind::Rebalance, None, async move { api.rebalance().await })
            .await
    }

    /// 运行回测；未指定参数时使用默认区间与当前选中的风险等级
    pub async fn run_backtest(&self, request: Option<BacktestRequest>) -> AppResult<BacktestAck> {
        let request = request
            .unwrap_or_else(|| BacktestRequest::with_risk_level(self.store.selected_risk_level()));
        if request.start_date >= request.end_date {
            return Err(AppError::Validation(format!(
                "start_date {} must be before end_date {}",
                request.start_date, request.end_date
            )));
        }
        if request.tickers.is_empty() {
            return Err(AppError::Validation("tickers must not be empty".to_string()));
        }

        let api = Arc::clone(&self.api);
        let ack = self
            .execute(CommandKind::Backtest, None, async move {
                api.run_backtest(&request).await
            })
            .await?;

        if let Err(e) = refresh_backtest(self.api.as_ref(), &self.store).await {
            warn!("回测完成但刷新结果失败: {}", e);
        }
        Ok(ack)
    }

    pub async fn run_stress_test(&self, request: StressTestRequest) -> AppResult<StressResult> {
        let api = Arc::clone(&self.api);
        let result = self
            .execute(CommandKind::StressTest, None, async move {
                api.run_stress_test(&request).await
            })
            .await?;
        self.store.publish(SourceUpdate::Stress(result.clone()));
        Ok(result)
    }

    pub async fn set_risk_level(&self, level: RiskLevel) -> AppResult<ControlAck> {
        let api = Arc::clone(&self.api);
        self.execute(
            CommandKind::RiskLevel,
            Some(SourceUpdate::SelectedRiskLevel(level)),
            async move { api.set_risk_level(&RiskLevelRequest { level }).await },
        )
        .await
    }

    pub async fn add_funds(&self, amount: f64, card: CardDetails) -> AppResult<FundsAck> {
        let amount = validate_amount(amount)?;
        let api = Arc::clone(&self.api);
        self.execute(
            CommandKind::AddFunds,
            Some(SourceUpdate::FundsDelta(amount)),
            async move { api.add_funds(&AddFundsRequest { amount, card }).await },
        )
        .await
    }

    pub async fn withdraw(&self, amount: f64) -> AppResult<FundsAck> {
        let amount = validate_amount(amount)?;
        let api = Arc::clone(&self.api);
        self.execute(
            CommandKind::Withdraw,
            Some(SourceUpdate::FundsDelta(-amount)),
            async move { api.withdraw(&WithdrawRequest { amount }).await },
        )
        .await
    }
}
