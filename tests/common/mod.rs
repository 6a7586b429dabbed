//! 脚本化的假引擎：按调用顺序返回预设响应，可设置延迟与失败

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use rust_quant_monitor::api::EngineApi;
use rust_quant_monitor::error::{AppError, AppResult};
use rust_quant_monitor::model::{
    AddFundsRequest, BacktestAck, BacktestRequest, BacktestResult, ControlAck,
    DecisionLogEntry, DecisionLogResponse, EquityPoint, FundsAck, LiveState, PortfolioSummary,
    Regime, RegimeStatus, RiskLevel, RiskLevelRequest, RiskStatus, StressResult,
    StressTestRequest, WithdrawRequest,
};

pub struct Reply<T> {
    pub delay: Duration,
    pub result: AppResult<T>,
}

impl<T> Reply<T> {
    pub fn ok(value: T) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(value),
        }
    }

    pub fn err(error: AppError) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(error),
        }
    }

    pub fn after(mut self, millis: u64) -> Self {
        self.delay = Duration::from_millis(millis);
        self
    }
}

/// 一个接口的响应脚本：队列用完后重复 fallback
pub struct Script<T: Clone> {
    queue: Mutex<VecDeque<Reply<T>>>,
    fallback: Mutex<AppResult<T>>,
    delay: Mutex<Duration>,
}

impl<T: Clone> Script<T> {
    fn new(fallback: T) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Ok(fallback)),
            delay: Mutex::new(Duration::ZERO),
        }
    }

    pub fn push(&self, reply: Reply<T>) {
        self.queue.lock().unwrap().push_back(reply);
    }

    pub fn set_fallback(&self, result: AppResult<T>) {
        *self.fallback.lock().unwrap() = result;
    }

    pub fn set_delay(&self, millis: u64) {
        *self.delay.lock().unwrap() = Duration::from_millis(millis);
    }

    async fn next(&self) -> AppResult<T> {
        let reply = self.queue.lock().unwrap().pop_front();
        let (delay, result) = match reply {
            Some(r) => (r.delay, r.result),
            None => (
                *self.delay.lock().unwrap(),
                self.fallback.lock().unwrap().clone(),
            ),
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

pub struct FakeEngine {
    pub state: Script<LiveState>,
    pub portfolio: Script<PortfolioSummary>,
    pub backtest_results: Script<BacktestResult>,
    pub engine_log: Script<DecisionLogResponse>,
    pub regime: Script<RegimeStatus>,
    pub risk: Script<RiskStatus>,
    pub start: Script<ControlAck>,
    pub stop: Script<ControlAck>,
    pub rebalance: Script<ControlAck>,
    pub run_backtest: Script<BacktestAck>,
    pub stress_test: Script<StressResult>,
    pub add_funds: Script<FundsAck>,
    pub withdraw: Script<FundsAck>,
    pub risk_level: Script<ControlAck>,
    calls: Mutex<HashMap<&'static str, usize>>,
    /// 收到的请求体
    pub received: Mutex<Vec<serde_json::Value>>,
}

fn ack(status: &str) -> ControlAck {
    ControlAck {
        status: status.to_string(),
        message: None,
    }
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self {
            state: Script::new(LiveState::default()),
            portfolio: Script::new(PortfolioSummary::default()),
            backtest_results: Script::new(BacktestResult::default()),
            engine_log: Script::new(DecisionLogResponse::default()),
            regime: Script::new(RegimeStatus::default()),
            risk: Script::new(RiskStatus::default()),
            start: Script::new(ack("started")),
            stop: Script::new(ack("stopped")),
            rebalance: Script::new(ack("rebalance triggered")),
            run_backtest: Script::new(BacktestAck {
                message: "Backtest completed".to_string(),
                ..Default::default()
            }),
            stress_test: Script::new(StressResult::default()),
            add_funds: Script::new(FundsAck {
                status: "success".to_string(),
                ..Default::default()
            }),
            withdraw: Script::new(FundsAck {
                status: "success".to_string(),
                ..Default::default()
            }),
            risk_level: Script::new(ack("ok")),
            calls: Mutex::new(HashMap::new()),
            received: Mutex::new(Vec::new()),
        }
    }
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    fn hit(&self, name: &'static str) {
        *self.calls.lock().unwrap().entry(name).or_insert(0) += 1;
    }

    fn record<B: serde::Serialize>(&self, body: &B) {
        if let Ok(v) = serde_json::to_value(body) {
            self.received.lock().unwrap().push(v);
        }
    }
}

#[async_trait]
impl EngineApi for FakeEngine {
    async fn get_state(&self) -> AppResult<LiveState> {
        self.hit("state");
        self.state.next().await
    }

    async fn get_portfolio(&self) -> AppResult<PortfolioSummary> {
        self.hit("portfolio");
        self.portfolio.next().await
    }

    async fn get_backtest_results(&self) -> AppResult<BacktestResult> {
        self.hit("backtest_results");
        self.backtest_results.next().await
    }

    async fn get_engine_log(&self, _limit: usize) -> AppResult<DecisionLogResponse> {
        self.hit("engine_log");
        self.engine_log.next().await
    }

    async fn get_regime(&self) -> AppResult<RegimeStatus> {
        self.hit("regime");
        self.regime.next().await
    }

    async fn get_risk(&self) -> AppResult<RiskStatus> {
        self.hit("risk");
        self.risk.next().await
    }

    async fn start(&self) -> AppResult<ControlAck> {
        self.hit("start");
        self.start.next().await
    }

    async fn stop(&self) -> AppResult<ControlAck> {
        self.hit("stop");
        self.stop.next().await
    }

    async fn rebalance(&self) -> AppResult<ControlAck> {
        self.hit("rebalance");
        self.rebalance.next().await
    }

    async fn run_backtest(&self, request: &BacktestRequest) -> AppResult<BacktestAck> {
        self.hit("run_backtest");
        self.record(request);
        self.run_backtest.next().await
    }

    async fn run_stress_test(&self, request: &StressTestRequest) -> AppResult<StressResult> {
        self.hit("stress_test");
        self.record(request);
        self.stress_test.next().await
    }

    async fn add_funds(&self, request: &AddFundsRequest) -> AppResult<FundsAck> {
        self.hit("add_funds");
        self.record(request);
        self.add_funds.next().await
    }

    async fn withdraw(&self, request: &WithdrawRequest) -> AppResult<FundsAck> {
        self.hit("withdraw");
        self.record(request);
        self.withdraw.next().await
    }

    async fn set_risk_level(&self, request: &RiskLevelRequest) -> AppResult<ControlAck> {
        self.hit("risk_level");
        self.record(request);
        self.risk_level.next().await
    }
}

pub fn live_state(value: f64, history: Vec<f64>) -> LiveState {
    LiveState {
        value,
        regime: Regime::Bull,
        allocations: BTreeMap::from([("SPY".to_string(), 0.6), ("TLT".to_string(), 0.4)]),
        history,
        logs: Vec::new(),
        risk_level: RiskLevel::Medium,
        running: true,
    }
}

pub fn decision(date: &str, what: &str) -> DecisionLogEntry {
    DecisionLogEntry {
        date: date.to_string(),
        regime: Regime::Bull,
        what_we_did: what.to_string(),
        ..Default::default()
    }
}

pub fn backtest_with_equity(values: &[f64]) -> BacktestResult {
    BacktestResult {
        equity_with_risk: values
            .iter()
            .enumerate()
            .map(|(i, v)| EquityPoint::new(format!("2024-01-{:02}", i + 1), *v))
            .collect(),
        metrics_with_risk: Some(BTreeMap::from([("CAGR".to_string(), 0.07)])),
        ..Default::default()
    }
}

pub fn server_error(status: u16, detail: &str) -> AppError {
    AppError::Server {
        status,
        detail: detail.to_string(),
    }
}
