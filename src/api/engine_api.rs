//! 引擎服务接口抽象
//!
//! 核心层只依赖该 trait，传输层（reqwest）实现它，测试里用脚本化的假引擎替换

use async_trait::async_trait;

use crate::error::AppResult;
use crate::model::{
    AddFundsRequest, BacktestAck, BacktestRequest, BacktestResult, ControlAck,
    DecisionLogResponse, FundsAck, LiveState, PortfolioSummary, RegimeStatus, RiskLevelRequest,
    RiskStatus, StressResult, StressTestRequest, WithdrawRequest,
};

pub const PATH_STATE: &str = "/state";
pub const PATH_PORTFOLIO: &str = "/portfolio";
pub const PATH_BACKTEST_RESULTS: &str = "/backtest/results";
pub const PATH_ENGINE_LOG: &str = "/engine/log";
pub const PATH_REGIME: &str = "/regime";
pub const PATH_RISK: &str = "/risk";
pub const PATH_START: &str = "/start";
pub const PATH_STOP: &str = "/stop";
pub const PATH_REBALANCE: &str = "/rebalance";
pub const PATH_RUN_BACKTEST: &str = "/run_backtest";
pub const PATH_STRESS_TEST: &str = "/stress_test";
pub const PATH_ADD_FUNDS: &str = "/add-funds";
pub const PATH_WITHDRAW: &str = "/withdraw";
pub const PATH_RISK_LEVEL: &str = "/risk-level";

/// 引擎服务的固定请求面
#[async_trait]
pub trait EngineApi: Send + Sync {
    /// GET /state
    async fn get_state(&self) -> AppResult<LiveState>;

    /// GET /portfolio
    async fn get_portfolio(&self) -> AppResult<PortfolioSummary>;

    /// GET /backtest/results
    async fn get_backtest_results(&self) -> AppResult<BacktestResult>;

    /// GET /engine/log?limit=N
    async fn get_engine_log(&self, limit: usize) -> AppResult<DecisionLogResponse>;

    /// GET /regime
    async fn get_regime(&self) -> AppResult<RegimeStatus>;

    /// GET /risk
    async fn get_risk(&self) -> AppResult<RiskStatus>;

    /// POST /start
    async fn start(&self) -> AppResult<ControlAck>;

    /// POST /stop
    async fn stop(&self) -> AppResult<ControlAck>;

    /// POST /rebalance
    async fn rebalance(&self) -> AppResult<ControlAck>;

    /// POST /run_backtest
    async fn run_backtest(&self, request: &BacktestRequest) -> AppResult<BacktestAck>;

    /// POST /stress_test
    async fn run_stress_test(&self, request: &StressTestRequest) -> AppResult<StressResult>;

    /// POST /add-funds
    async fn add_funds(&self, request: &AddFundsRequest) -> AppResult<FundsAck>;

    /// POST /withdraw
    async fn withdraw(&self, request: &WithdrawRequest) -> AppResult<FundsAck>;

    /// POST /risk-level
    async fn set_risk_level(&self, request: &RiskLevelRequest) -> AppResult<ControlAck>;
}
