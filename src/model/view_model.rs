use std::collections::BTreeMap;

use serde::Serialize;

use crate::analytics::DrawdownPoint;
use crate::model::backtest::{CorrelationMatrix, EquityPoint, MetricMap};
use crate::model::decision_log::DecisionLogEntry;
use crate::model::enums::{EngineStatus, Regime, RiskLevel};
use crate::model::live_state::ActivityEntry;
use crate::model::stress::StressResult;

/// 提供给展示层的唯一视图，每次对账整体重建
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ViewModel {
    /// 单调递增的版本号
    pub version: u64,
    pub portfolio_value: f64,
    pub equity: Vec<EquityPoint>,
    pub equity_without_risk: Vec<EquityPoint>,
    pub drawdown: Vec<DrawdownPoint>,
    pub max_drawdown: f64,
    pub current_drawdown: f64,
    pub allocations: BTreeMap<String, f64>,
    pub regime: Regime,
    /// 引擎上报的风险等级
    pub risk_level: RiskLevel,
    /// 本地控件选中的风险等级
    pub selected_risk_level: RiskLevel,
    pub engine_status: EngineStatus,
    pub metrics_with_risk: Option<MetricMap>,
    pub metrics_without_risk: Option<MetricMap>,
    pub correlation: CorrelationMatrix,
    pub stress: Option<StressResult>,
    /// 最新在前
    pub decision_log: Vec<DecisionLogEntry>,
    pub activity: Vec<ActivityEntry>,
    pub state_poll_error: Option<String>,
    pub log_poll_error: Option<String>,
}

impl ViewModel {
    pub fn has_backtest_metrics(&self) -> bool {
        self.metrics_with_risk.is_some() || self.metrics_without_risk.is_some()
    }
}
