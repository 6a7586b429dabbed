pub mod backtest;
pub mod decision_log;
pub mod enums;
pub mod funds;
pub mod live_state;
pub mod stress;
pub mod view_model;

pub use backtest::{
    BacktestAck, BacktestRequest, BacktestResult, CorrelationMatrix, EquityPoint, MetricMap,
    PortfolioSummary,
};
pub use decision_log::{DecisionLogEntry, DecisionLogResponse};
pub use enums::{EngineStatus, Regime, RiskLevel};
pub use funds::{
    AddFundsRequest, CardDetails, ControlAck, FundsAck, RiskLevelRequest, WithdrawRequest,
};
pub use live_state::{ActivityEntry, LiveState, RegimeStatus, RiskStatus};
pub use stress::{StressResult, StressTestRequest};
pub use view_model::ViewModel;
